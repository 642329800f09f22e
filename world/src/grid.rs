//! Grids of tile maps and the vertical stack of interior floors.

use glam::Vec2;
use tilescape_core::{BoundingBox, Direction, GridId, MapCoord, MapGeometry, TileKind};

use crate::{entities::Obstacle, tile_map::TileMap};

/// Fixed 2-D array of tile-map slots forming one continuous region of world
/// space. Slots never move once the grid is built.
#[derive(Clone, Debug)]
pub struct TileMapGrid {
    id: GridId,
    rows: u32,
    columns: u32,
    geometry: MapGeometry,
    slots: Vec<Option<TileMap>>,
}

impl TileMapGrid {
    /// Creates a grid with every slot empty.
    #[must_use]
    pub fn new(id: GridId, rows: u32, columns: u32, geometry: MapGeometry) -> Self {
        let capacity = usize::try_from(u64::from(rows) * u64::from(columns)).unwrap_or(0);
        Self {
            id,
            rows,
            columns,
            geometry,
            slots: vec![None; capacity],
        }
    }

    /// Identifier of the grid.
    #[must_use]
    pub const fn id(&self) -> GridId {
        self.id
    }

    /// Number of slot rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of slot columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Tile layout shared by every map in the grid.
    #[must_use]
    pub const fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    /// Places `map` into the slot it names, returning the map it displaced.
    pub fn insert(&mut self, map: TileMap) -> Option<TileMap> {
        debug_assert_eq!(map.grid(), self.id, "tile map inserted into a foreign grid");
        let Some(index) = self.slot_index(map.coord()) else {
            debug_assert!(false, "tile map slot {:?} lies outside the grid", map.coord());
            return None;
        };
        self.slots.get_mut(index).and_then(|slot| slot.replace(map))
    }

    /// Map stored in `coord`, if the slot exists and is populated.
    #[must_use]
    pub fn tile_map(&self, coord: MapCoord) -> Option<&TileMap> {
        self.slot_index(coord)
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
    }

    /// Mutable access to the map stored in `coord`.
    pub fn tile_map_mut(&mut self, coord: MapCoord) -> Option<&mut TileMap> {
        self.slot_index(coord)
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::as_mut)
    }

    /// Slot covering a world-space point, whether populated or not.
    #[must_use]
    pub fn map_coord_at(&self, point: Vec2) -> Option<MapCoord> {
        if !point.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let column = (point.x / self.geometry.width()).floor();
        let row = (point.y / self.geometry.height()).floor();
        if column >= self.columns as f32 || row >= self.rows as f32 {
            return None;
        }
        Some(MapCoord::new(row as u32, column as u32))
    }

    /// Map covering a world-space point.
    #[must_use]
    pub fn tile_map_at(&self, point: Vec2) -> Option<&TileMap> {
        self.map_coord_at(point).and_then(|coord| self.tile_map(coord))
    }

    /// Tile beneath a world-space point.
    #[must_use]
    pub fn tile_at(&self, point: Vec2) -> Option<TileKind> {
        self.tile_map_at(point).and_then(|map| map.tile_at(point))
    }

    /// Populated map adjacent to `coord` in `direction`.
    #[must_use]
    pub fn adjacent(&self, coord: MapCoord, direction: Direction) -> Option<&TileMap> {
        coord
            .neighbor(direction)
            .and_then(|neighbor| self.tile_map(neighbor))
    }

    /// Every populated map in row-major slot order.
    pub fn maps(&self) -> impl Iterator<Item = &TileMap> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub(crate) fn maps_mut(&mut self) -> impl Iterator<Item = &mut TileMap> + '_ {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Populated maps whose area overlaps `area`.
    pub fn maps_overlapping(&self, area: BoundingBox) -> impl Iterator<Item = &TileMap> + '_ {
        let columns = self.span(area.left(), area.right(), self.geometry.width(), self.columns);
        let rows = self.span(area.top(), area.bottom(), self.geometry.height(), self.rows);
        rows.flat_map(move |row| {
            columns
                .clone()
                .filter_map(move |column| self.tile_map(MapCoord::new(row, column)))
        })
    }

    /// First solid obstacle of any overlapping map whose footprint intersects `area`.
    #[must_use]
    pub fn solid_obstacle_intersecting(&self, area: BoundingBox) -> Option<&Obstacle> {
        self.maps_overlapping(area)
            .find_map(|map| map.solid_obstacles_intersecting(area).next())
    }

    /// Index range of slots touched by `[start, end)` along one axis.
    fn span(&self, start: f32, end: f32, length: f32, count: u32) -> std::ops::Range<u32> {
        if count == 0 || !start.is_finite() || !end.is_finite() || end <= 0.0 || end <= start {
            return 0..0;
        }
        let first = (start / length).floor().max(0.0);
        let last = ((end / length).ceil() - 1.0).max(0.0);
        let first = (first as u32).min(count);
        let last = (last as u32).min(count - 1);
        if first > last {
            0..0
        } else {
            first..last + 1
        }
    }

    fn slot_index(&self, coord: MapCoord) -> Option<usize> {
        if coord.row() >= self.rows || coord.column() >= self.columns {
            return None;
        }
        let row = usize::try_from(coord.row()).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }
}

/// Ordered floors of a building, bottom to top, plus the exterior grid the
/// ground floor opens onto.
///
/// Stairs only ever connect floor `i` to `i ± 1`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayeredGridStack {
    exterior: Option<GridId>,
    floors: Vec<GridId>,
}

impl LayeredGridStack {
    /// Creates a stack from its exterior grid and floors listed bottom to top.
    #[must_use]
    pub const fn new(exterior: Option<GridId>, floors: Vec<GridId>) -> Self {
        Self { exterior, floors }
    }

    /// Grid the ground floor's exits open onto.
    #[must_use]
    pub const fn exterior(&self) -> Option<GridId> {
        self.exterior
    }

    /// Ground floor of the building.
    #[must_use]
    pub fn ground(&self) -> Option<GridId> {
        self.floors.first().copied()
    }

    /// Reports whether `grid` is one of the floors.
    #[must_use]
    pub fn contains(&self, grid: GridId) -> bool {
        self.floors.contains(&grid)
    }

    /// Position of `grid` in the stack, counted from the ground floor.
    #[must_use]
    pub fn floor_index(&self, grid: GridId) -> Option<usize> {
        self.floors.iter().position(|floor| *floor == grid)
    }

    /// Floor directly above `grid`.
    #[must_use]
    pub fn above(&self, grid: GridId) -> Option<GridId> {
        let index = self.floor_index(grid)?;
        self.floors.get(index + 1).copied()
    }

    /// Floor directly below `grid`.
    #[must_use]
    pub fn below(&self, grid: GridId) -> Option<GridId> {
        let index = self.floor_index(grid)?;
        index
            .checked_sub(1)
            .and_then(|below| self.floors.get(below).copied())
    }

    /// Number of floors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.floors.len()
    }

    /// Reports whether the stack has no floors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TileMapGrid {
        let geometry = MapGeometry::default();
        let mut grid = TileMapGrid::new(GridId::new(0), 2, 2, geometry);
        for coord in [MapCoord::new(0, 0), MapCoord::new(0, 1), MapCoord::new(1, 1)] {
            let _ = grid.insert(TileMap::filled(GridId::new(0), coord, geometry, TileKind::Grass));
        }
        grid
    }

    #[test]
    fn tile_map_at_divides_by_map_size() {
        let grid = grid();
        let map = grid.tile_map_at(Vec2::new(600.0, 10.0)).expect("map");
        assert_eq!(map.coord(), MapCoord::new(0, 1));
        assert!(grid.tile_map_at(Vec2::new(10.0, 400.0)).is_none(), "empty slot");
    }

    #[test]
    fn points_outside_the_grid_resolve_to_nothing() {
        let grid = grid();
        assert!(grid.tile_map_at(Vec2::new(-1.0, 10.0)).is_none());
        assert!(grid.tile_map_at(Vec2::new(1024.0, 10.0)).is_none());
        assert!(grid.tile_map_at(Vec2::new(f32::NAN, 10.0)).is_none());
        assert!(grid.tile_map(MapCoord::new(5, 0)).is_none());
    }

    #[test]
    fn adjacency_skips_empty_slots() {
        let grid = grid();
        let origin = MapCoord::new(0, 0);
        assert!(grid.adjacent(origin, Direction::Right).is_some());
        assert!(grid.adjacent(origin, Direction::Down).is_none());
        assert!(grid.adjacent(origin, Direction::Up).is_none());
    }

    #[test]
    fn overlapping_maps_follow_the_area() {
        let grid = grid();
        let straddling = BoundingBox::new(500.0, 370.0, 520.0, 390.0);
        let coords: Vec<_> = grid.maps_overlapping(straddling).map(TileMap::coord).collect();
        assert_eq!(coords, vec![MapCoord::new(0, 0), MapCoord::new(0, 1), MapCoord::new(1, 1)]);

        let flush = BoundingBox::new(496.0, 0.0, 512.0, 16.0);
        assert_eq!(grid.maps_overlapping(flush).count(), 1);
    }

    #[test]
    fn stack_links_neighbouring_floors_only() {
        let stack = LayeredGridStack::new(
            Some(GridId::new(0)),
            vec![GridId::new(1), GridId::new(2), GridId::new(3)],
        );
        assert_eq!(stack.ground(), Some(GridId::new(1)));
        assert_eq!(stack.above(GridId::new(1)), Some(GridId::new(2)));
        assert_eq!(stack.below(GridId::new(1)), None);
        assert_eq!(stack.above(GridId::new(3)), None);
        assert_eq!(stack.below(GridId::new(3)), Some(GridId::new(2)));
        assert!(!stack.contains(GridId::new(0)));
    }
}
