//! Fixed-size tile maps and the entities they own.

use glam::Vec2;
use tilescape_core::{
    BoundingBox, CreatureId, GridId, MapCoord, MapGeometry, MapRef, ObstacleId, PieceId,
    ResourceId, TileCoord, TileKind,
};

use crate::{
    entities::{Creature, LooseResource, Obstacle, StructurePiece},
    markers::TransitionMarker,
    WorldBuildError,
};

/// Rectangular grid of tiles anchored to one region of world space, plus the
/// dynamic entities living on it.
///
/// A tile map belongs to exactly one grid for its whole lifetime; the
/// association is recorded as an index back-reference ([`GridId`] and
/// [`MapCoord`]) rather than a pointer to the parent.
#[derive(Clone, Debug)]
pub struct TileMap {
    grid: GridId,
    coord: MapCoord,
    geometry: MapGeometry,
    tiles: Vec<TileKind>,
    obstacles: Vec<Obstacle>,
    resources: Vec<LooseResource>,
    creatures: Vec<Creature>,
    pieces: Vec<StructurePiece>,
    markers: Vec<TransitionMarker>,
}

impl TileMap {
    /// Creates a tile map from row-major tiles.
    pub fn new(
        grid: GridId,
        coord: MapCoord,
        geometry: MapGeometry,
        tiles: Vec<TileKind>,
    ) -> Result<Self, WorldBuildError> {
        let expected = geometry.tile_count();
        if tiles.len() != expected {
            return Err(WorldBuildError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }

        Ok(Self {
            grid,
            coord,
            geometry,
            tiles,
            obstacles: Vec::new(),
            resources: Vec::new(),
            creatures: Vec::new(),
            pieces: Vec::new(),
            markers: Vec::new(),
        })
    }

    /// Creates a tile map covered entirely by `kind`.
    #[must_use]
    pub fn filled(grid: GridId, coord: MapCoord, geometry: MapGeometry, kind: TileKind) -> Self {
        Self {
            grid,
            coord,
            geometry,
            tiles: vec![kind; geometry.tile_count()],
            obstacles: Vec::new(),
            resources: Vec::new(),
            creatures: Vec::new(),
            pieces: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Grid that owns the map.
    #[must_use]
    pub const fn grid(&self) -> GridId {
        self.grid
    }

    /// Slot of the map inside its grid.
    #[must_use]
    pub const fn coord(&self) -> MapCoord {
        self.coord
    }

    /// Fully qualified reference to the map.
    #[must_use]
    pub const fn map_ref(&self) -> MapRef {
        MapRef::new(self.grid, self.coord)
    }

    /// Tile layout of the map.
    #[must_use]
    pub const fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    /// Upper-left corner of the map in world space.
    #[must_use]
    pub fn origin(&self) -> Vec2 {
        Vec2::new(
            self.coord.column() as f32 * self.geometry.width(),
            self.coord.row() as f32 * self.geometry.height(),
        )
    }

    /// World-space region covered by the map.
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_origin_and_size(self.origin(), self.geometry.size())
    }

    /// Center of the map in world space; cameras rest here.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.bounds().center()
    }

    /// Tile stored at `tile`, if it lies inside the map.
    #[must_use]
    pub fn tile(&self, tile: TileCoord) -> Option<TileKind> {
        self.index(tile).and_then(|index| self.tiles.get(index).copied())
    }

    /// Tile beneath a world-space point.
    #[must_use]
    pub fn tile_at(&self, point: Vec2) -> Option<TileKind> {
        self.tile_coord_at(point).and_then(|tile| self.tile(tile))
    }

    /// Tile coordinate beneath a world-space point.
    #[must_use]
    pub fn tile_coord_at(&self, point: Vec2) -> Option<TileCoord> {
        if !self.bounds().contains_point(point) {
            return None;
        }
        let local = (point - self.origin()) / self.geometry.tile_length();
        let column = (local.x.floor() as u32).min(self.geometry.columns().saturating_sub(1));
        let row = (local.y.floor() as u32).min(self.geometry.rows().saturating_sub(1));
        Some(TileCoord::new(column, row))
    }

    /// World-space region covered by a single tile.
    #[must_use]
    pub fn tile_bounds(&self, tile: TileCoord) -> BoundingBox {
        let length = self.geometry.tile_length();
        let origin = self.origin()
            + Vec2::new(tile.column() as f32 * length, tile.row() as f32 * length);
        BoundingBox::from_origin_and_size(origin, Vec2::splat(length))
    }

    /// World-space center of a single tile.
    #[must_use]
    pub fn tile_center(&self, tile: TileCoord) -> Vec2 {
        self.tile_bounds(tile).center()
    }

    /// Iterates every tile in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = (TileCoord, TileKind)> + '_ {
        let columns = self.geometry.columns().max(1);
        self.tiles.iter().enumerate().map(move |(index, kind)| {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            (TileCoord::new(index % columns, index / columns), *kind)
        })
    }

    /// Replaces a tile, returning the previous kind. Returns `None` and leaves
    /// the map untouched when `tile` lies outside the map.
    pub fn set_tile(&mut self, tile: TileCoord, kind: TileKind) -> Option<TileKind> {
        let index = self.index(tile)?;
        let slot = self.tiles.get_mut(index)?;
        Some(std::mem::replace(slot, kind))
    }

    /// Harvestable obstacles on the map.
    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Loose resources on the map.
    #[must_use]
    pub fn resources(&self) -> &[LooseResource] {
        &self.resources
    }

    /// Creatures living on the map.
    #[must_use]
    pub fn creatures(&self) -> &[Creature] {
        &self.creatures
    }

    /// Structure pieces on the map.
    #[must_use]
    pub fn pieces(&self) -> &[StructurePiece] {
        &self.pieces
    }

    /// Transition markers owned by the map.
    #[must_use]
    pub fn markers(&self) -> &[TransitionMarker] {
        &self.markers
    }

    /// Marker whose trigger region contains `point`.
    #[must_use]
    pub fn marker_containing(&self, point: Vec2) -> Option<&TransitionMarker> {
        self.markers
            .iter()
            .find(|marker| marker.region().contains_point(point))
    }

    /// Solid obstacles whose footprint overlaps `area`.
    pub fn solid_obstacles_intersecting(
        &self,
        area: BoundingBox,
    ) -> impl Iterator<Item = &Obstacle> + '_ {
        self.obstacles
            .iter()
            .filter(move |obstacle| obstacle.is_solid() && obstacle.bounds().intersects(&area))
    }

    /// Adds an obstacle to the map.
    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    /// Adds a loose resource to the map.
    pub fn add_resource(&mut self, resource: LooseResource) {
        self.resources.push(resource);
    }

    /// Adds a creature to the map.
    pub fn add_creature(&mut self, creature: Creature) {
        self.creatures.push(creature);
    }

    /// Adds a structure piece to the map.
    pub fn add_piece(&mut self, piece: StructurePiece) {
        self.pieces.push(piece);
    }

    pub(crate) fn obstacles_mut(&mut self) -> &mut [Obstacle] {
        &mut self.obstacles
    }

    pub(crate) fn obstacle_mut(&mut self, id: ObstacleId) -> Option<&mut Obstacle> {
        self.obstacles.iter_mut().find(|obstacle| obstacle.id() == id)
    }

    pub(crate) fn take_resource(&mut self, id: ResourceId) -> Option<LooseResource> {
        let index = self.resources.iter().position(|resource| resource.id() == id)?;
        Some(self.resources.remove(index))
    }

    pub(crate) fn take_creature(&mut self, id: CreatureId) -> Option<Creature> {
        let index = self.creatures.iter().position(|creature| creature.id() == id)?;
        Some(self.creatures.remove(index))
    }

    pub(crate) fn creature_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.creatures.iter_mut().find(|creature| creature.id() == id)
    }

    pub(crate) fn piece_mut(&mut self, id: PieceId) -> Option<&mut StructurePiece> {
        self.pieces.iter_mut().find(|piece| piece.id() == id)
    }

    pub(crate) fn clear_markers(&mut self) {
        self.markers.clear();
    }

    pub(crate) fn add_marker(&mut self, marker: TransitionMarker) {
        self.markers.push(marker);
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        if tile.column() < self.geometry.columns() && tile.row() < self.geometry.rows() {
            let row = usize::try_from(tile.row()).ok()?;
            let column = usize::try_from(tile.column()).ok()?;
            let width = usize::try_from(self.geometry.columns()).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
