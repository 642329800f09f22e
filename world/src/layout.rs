//! Declarative world layouts loaded from TOML and the validation that turns
//! them into tile-map grids.

use std::{collections::BTreeSet, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tilescape_core::{
    BoundingBox, CreatureId, GridId, Locomotion, MapCoord, MapGeometry, ObstacleId, PieceId,
    ResourceId, TileAttributeTable, TileCoord, TileKind, TraversalAttributes,
};

use crate::{
    entities::{Creature, LooseResource, Obstacle, Player, StructurePiece},
    grid::{LayeredGridStack, TileMapGrid},
    tile_map::TileMap,
};

const DEFAULT_SHAKE_MS: u64 = 600;
/// Creature bounding-box side length as a fraction of the tile length.
pub const CREATURE_SCALE: f32 = 0.75;
pub(crate) const RESOURCE_SCALE: f32 = 0.5;

/// Errors raised while building a world from its layout.
#[derive(Debug, Error)]
pub enum WorldBuildError {
    /// The layout text is not valid TOML or does not match the schema.
    #[error("failed to parse world layout: {0}")]
    Parse(#[from] toml::de::Error),
    /// The map geometry has a zero dimension or a non-positive tile length.
    #[error("map geometry must have positive dimensions and tile length")]
    InvalidGeometry,
    /// Two grids share a name.
    #[error("grid `{name}` is declared more than once")]
    DuplicateGrid {
        /// Offending grid name.
        name: String,
    },
    /// A grid name is referenced but never declared.
    #[error("grid `{name}` is not declared")]
    UnknownGrid {
        /// Missing grid name.
        name: String,
    },
    /// A map slot lies outside its grid's dimensions.
    #[error("map slot ({row}, {column}) lies outside grid `{grid}`")]
    SlotOutOfGrid {
        /// Grid the map was declared in.
        grid: String,
        /// Slot row.
        row: u32,
        /// Slot column.
        column: u32,
    },
    /// A map slot is declared more than once.
    #[error("map slot ({row}, {column}) of grid `{grid}` is declared more than once")]
    DuplicateMap {
        /// Grid the map was declared in.
        grid: String,
        /// Slot row.
        row: u32,
        /// Slot column.
        column: u32,
    },
    /// A layout character does not name a tile kind.
    #[error("unknown tile symbol '{symbol}'")]
    UnknownTileSymbol {
        /// Offending character.
        symbol: char,
    },
    /// A map's tile rows do not cover the geometry exactly.
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch {
        /// Tiles required by the geometry.
        expected: usize,
        /// Tiles supplied by the layout.
        actual: usize,
    },
    /// A tile row does not span the map's width.
    #[error("tile row {row} has {actual} tiles, expected {expected}")]
    RaggedTileRow {
        /// Zero-based row index within the map layout.
        row: usize,
        /// Columns required by the geometry.
        expected: u32,
        /// Tiles supplied on the row.
        actual: usize,
    },
    /// An entity or patch lies outside its map.
    #[error("{entity} at tile ({column}, {row}) lies outside its map")]
    PlacementOutOfMap {
        /// Kind of placement that failed.
        entity: &'static str,
        /// Tile column of the placement.
        column: u32,
        /// Tile row of the placement.
        row: u32,
    },
    /// A structure-only tile appears outside the interior floors.
    #[error("structure-only tile '{symbol}' at ({column}, {row}) in exterior grid {grid}")]
    StructureTileOutsideStructure {
        /// Grid containing the tile.
        grid: u32,
        /// Tile column.
        column: u32,
        /// Tile row.
        row: u32,
        /// Layout symbol of the tile.
        symbol: char,
    },
    /// A connector tile has no counterpart to pair with.
    #[error("unpaired connector '{connector}' at ({column}, {row}) in grid {grid}")]
    UnmatchedConnector {
        /// Grid containing the connector.
        grid: u32,
        /// Map slot row.
        map_row: u32,
        /// Map slot column.
        map_column: u32,
        /// Tile column of the connector.
        column: u32,
        /// Tile row of the connector.
        row: u32,
        /// Layout symbol of the connector.
        connector: char,
    },
    /// A connector has two equally near counterparts to pair with.
    #[error("ambiguous connector '{connector}' at ({column}, {row}) in grid {grid}")]
    AmbiguousConnector {
        /// Grid containing the connector.
        grid: u32,
        /// Map slot row.
        map_row: u32,
        /// Map slot column.
        map_column: u32,
        /// Tile column of the connector.
        column: u32,
        /// Tile row of the connector.
        row: u32,
        /// Layout symbol of the connector.
        connector: char,
    },
    /// The player spawn does not land on a populated map.
    #[error("player spawn does not lie on a map of grid `{grid}`")]
    PlayerOutsideWorld {
        /// Grid named by the spawn.
        grid: String,
    },
}

/// Complete description of a world, typically read from a TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldLayout {
    /// Tile layout shared by every map.
    #[serde(default)]
    pub geometry: MapGeometry,
    /// Where the player starts.
    pub player: PlayerLayout,
    /// Grids in declaration order; the position doubles as the [`GridId`].
    #[serde(default)]
    pub grids: Vec<GridLayout>,
    /// Optional building interior.
    #[serde(default)]
    pub interior: Option<InteriorLayout>,
    /// Time a struck obstacle shakes before yielding, in milliseconds.
    #[serde(default = "default_shake_ms")]
    pub obstacle_shake_ms: u64,
}

/// Player spawn description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerLayout {
    /// Grid the player starts in.
    pub grid: String,
    /// Slot row of the starting map.
    pub map_row: u32,
    /// Slot column of the starting map.
    pub map_column: u32,
    /// Tile column the player is centered on.
    pub column: u32,
    /// Tile row the player is centered on.
    pub row: u32,
    /// Bounding box size in pixels.
    #[serde(default = "default_player_size")]
    pub size: [f32; 2],
}

/// One grid of tile maps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Unique grid name.
    pub name: String,
    /// Number of slot rows.
    pub rows: u32,
    /// Number of slot columns.
    pub columns: u32,
    /// Populated slots.
    #[serde(default)]
    pub maps: Vec<MapLayout>,
}

/// Floors of the building interior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteriorLayout {
    /// Grid the ground floor's exits open onto.
    pub exterior: Option<String>,
    /// Floor grids from bottom to top.
    pub floors: Vec<String>,
}

/// One tile map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapLayout {
    /// Slot row.
    pub row: u32,
    /// Slot column.
    pub column: u32,
    /// Symbol filling the map when `tiles` is empty.
    #[serde(default = "default_fill")]
    pub fill: char,
    /// Optional full tile rows, one string per row.
    #[serde(default)]
    pub tiles: Vec<String>,
    /// Rectangles painted over the base tiles.
    #[serde(default)]
    pub patches: Vec<PatchLayout>,
    /// Harvestable obstacles.
    #[serde(default)]
    pub obstacles: Vec<ObstacleLayout>,
    /// Loose resources.
    #[serde(default)]
    pub resources: Vec<ResourceLayout>,
    /// Structure pieces.
    #[serde(default)]
    pub pieces: Vec<PieceLayout>,
    /// Creatures.
    #[serde(default)]
    pub creatures: Vec<CreatureLayout>,
}

/// Rectangle of identical tiles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchLayout {
    /// Left tile column.
    pub column: u32,
    /// Top tile row.
    pub row: u32,
    /// Width in tiles.
    #[serde(default = "one")]
    pub width: u32,
    /// Height in tiles.
    #[serde(default = "one")]
    pub height: u32,
    /// Symbol painted into the rectangle.
    pub tile: char,
}

/// Obstacle occupying a single tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleLayout {
    /// Tile column.
    pub column: u32,
    /// Tile row.
    pub row: u32,
    /// Wood dropped once harvested.
    #[serde(default = "one")]
    pub yield_amount: u32,
}

/// Loose resource centered on a tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceLayout {
    /// Tile column.
    pub column: u32,
    /// Tile row.
    pub row: u32,
    /// Wood granted on pickup.
    #[serde(default = "one")]
    pub amount: u32,
}

/// Structure piece covering a rectangle of tiles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PieceLayout {
    /// Left tile column.
    pub column: u32,
    /// Top tile row.
    pub row: u32,
    /// Width in tiles.
    #[serde(default = "one")]
    pub width: u32,
    /// Height in tiles.
    #[serde(default = "one")]
    pub height: u32,
    /// Wood required to build.
    pub cost: u32,
}

/// Creature centered on a tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatureLayout {
    /// Tile column.
    pub column: u32,
    /// Tile row.
    pub row: u32,
    /// Movement rules.
    pub locomotion: Locomotion,
}

fn default_shake_ms() -> u64 {
    DEFAULT_SHAKE_MS
}

fn default_player_size() -> [f32; 2] {
    [12.0, 12.0]
}

fn default_fill() -> char {
    TileKind::Grass.symbol()
}

fn one() -> u32 {
    1
}

impl WorldLayout {
    /// Parses a layout from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, WorldBuildError> {
        Ok(toml::from_str(text)?)
    }

    /// Shake duration applied to every obstacle.
    #[must_use]
    pub fn shake_duration(&self) -> Duration {
        Duration::from_millis(self.obstacle_shake_ms)
    }
}

/// Monotonic identifier allocation for entities created at build time and at
/// runtime.
#[derive(Clone, Debug, Default)]
pub(crate) struct IdAllocator {
    obstacles: u32,
    resources: u32,
    creatures: u32,
    pieces: u32,
}

impl IdAllocator {
    pub(crate) fn obstacle(&mut self) -> ObstacleId {
        let id = ObstacleId::new(self.obstacles);
        self.obstacles = self.obstacles.saturating_add(1);
        id
    }

    pub(crate) fn resource(&mut self) -> ResourceId {
        let id = ResourceId::new(self.resources);
        self.resources = self.resources.saturating_add(1);
        id
    }

    pub(crate) fn creature(&mut self) -> CreatureId {
        let id = CreatureId::new(self.creatures);
        self.creatures = self.creatures.saturating_add(1);
        id
    }

    pub(crate) fn piece(&mut self) -> PieceId {
        let id = PieceId::new(self.pieces);
        self.pieces = self.pieces.saturating_add(1);
        id
    }
}

/// Grids, stack and player produced from a validated layout.
#[derive(Debug)]
pub(crate) struct BuiltLayout {
    pub(crate) grids: Vec<TileMapGrid>,
    pub(crate) stack: LayeredGridStack,
    pub(crate) player: Player,
    pub(crate) ids: IdAllocator,
}

pub(crate) fn build(
    layout: &WorldLayout,
    attributes: &TileAttributeTable,
) -> Result<BuiltLayout, WorldBuildError> {
    let geometry = layout.geometry;
    if !geometry.is_valid() {
        return Err(WorldBuildError::InvalidGeometry);
    }

    let mut names = BTreeSet::new();
    for grid in &layout.grids {
        if !names.insert(grid.name.as_str()) {
            return Err(WorldBuildError::DuplicateGrid {
                name: grid.name.clone(),
            });
        }
    }

    let stack = match &layout.interior {
        Some(interior) => {
            let exterior = interior
                .exterior
                .as_deref()
                .map(|name| grid_id(layout, name))
                .transpose()?;
            let floors = interior
                .floors
                .iter()
                .map(|name| grid_id(layout, name))
                .collect::<Result<Vec<_>, _>>()?;
            LayeredGridStack::new(exterior, floors)
        }
        None => LayeredGridStack::default(),
    };

    let mut ids = IdAllocator::default();
    let shake = layout.shake_duration();
    let mut grids = Vec::with_capacity(layout.grids.len());
    for (index, grid_layout) in layout.grids.iter().enumerate() {
        let id = GridId::new(u32::try_from(index).unwrap_or(u32::MAX));
        let mut grid = TileMapGrid::new(id, grid_layout.rows, grid_layout.columns, geometry);
        for map_layout in &grid_layout.maps {
            if map_layout.row >= grid_layout.rows || map_layout.column >= grid_layout.columns {
                return Err(WorldBuildError::SlotOutOfGrid {
                    grid: grid_layout.name.clone(),
                    row: map_layout.row,
                    column: map_layout.column,
                });
            }
            let coord = MapCoord::new(map_layout.row, map_layout.column);
            if grid.tile_map(coord).is_some() {
                return Err(WorldBuildError::DuplicateMap {
                    grid: grid_layout.name.clone(),
                    row: map_layout.row,
                    column: map_layout.column,
                });
            }

            let mut map = build_map(id, coord, geometry, map_layout)?;
            if !stack.contains(id) {
                validate_exterior_tiles(&map, attributes)?;
            }
            populate(&mut map, map_layout, shake, &mut ids)?;
            let _ = grid.insert(map);
        }
        grids.push(grid);
    }

    let player = build_player(layout, &grids)?;
    Ok(BuiltLayout {
        grids,
        stack,
        player,
        ids,
    })
}

fn grid_id(layout: &WorldLayout, name: &str) -> Result<GridId, WorldBuildError> {
    layout
        .grids
        .iter()
        .position(|grid| grid.name == name)
        .map(|index| GridId::new(u32::try_from(index).unwrap_or(u32::MAX)))
        .ok_or_else(|| WorldBuildError::UnknownGrid {
            name: name.to_owned(),
        })
}

fn tile_kind(symbol: char) -> Result<TileKind, WorldBuildError> {
    TileKind::from_symbol(symbol).ok_or(WorldBuildError::UnknownTileSymbol { symbol })
}

fn build_map(
    grid: GridId,
    coord: MapCoord,
    geometry: MapGeometry,
    layout: &MapLayout,
) -> Result<TileMap, WorldBuildError> {
    let mut map = if layout.tiles.is_empty() {
        TileMap::filled(grid, coord, geometry, tile_kind(layout.fill)?)
    } else {
        for (index, row) in layout.tiles.iter().enumerate() {
            let actual = row.chars().count();
            if actual != geometry.columns() as usize {
                return Err(WorldBuildError::RaggedTileRow {
                    row: index,
                    expected: geometry.columns(),
                    actual,
                });
            }
        }
        let tiles = layout
            .tiles
            .iter()
            .flat_map(|row| row.chars())
            .map(tile_kind)
            .collect::<Result<Vec<_>, _>>()?;
        TileMap::new(grid, coord, geometry, tiles)?
    };

    for patch in &layout.patches {
        let kind = tile_kind(patch.tile)?;
        let fits = patch
            .column
            .checked_add(patch.width)
            .is_some_and(|end| end <= geometry.columns())
            && patch
                .row
                .checked_add(patch.height)
                .is_some_and(|end| end <= geometry.rows());
        if !fits {
            return Err(WorldBuildError::PlacementOutOfMap {
                entity: "patch",
                column: patch.column,
                row: patch.row,
            });
        }
        for row in patch.row..patch.row + patch.height {
            for column in patch.column..patch.column + patch.width {
                let _ = map.set_tile(TileCoord::new(column, row), kind);
            }
        }
    }
    Ok(map)
}

/// Structure-only tiles are confined to interior floors.
pub(crate) fn validate_exterior_tiles(
    map: &TileMap,
    attributes: &TileAttributeTable,
) -> Result<(), WorldBuildError> {
    match map
        .tiles()
        .find(|(_, kind)| attributes.is_structure_only(*kind))
    {
        Some((tile, kind)) => Err(WorldBuildError::StructureTileOutsideStructure {
            grid: map.grid().get(),
            column: tile.column(),
            row: tile.row(),
            symbol: kind.symbol(),
        }),
        None => Ok(()),
    }
}

fn populate(
    map: &mut TileMap,
    layout: &MapLayout,
    shake: Duration,
    ids: &mut IdAllocator,
) -> Result<(), WorldBuildError> {
    for obstacle in &layout.obstacles {
        let tile = placement(map, "obstacle", obstacle.column, obstacle.row)?;
        let bounds = map.tile_bounds(tile);
        map.add_obstacle(Obstacle::new(ids.obstacle(), bounds, obstacle.yield_amount, shake));
    }

    for resource in &layout.resources {
        let tile = placement(map, "resource", resource.column, resource.row)?;
        let bounds = centered(map, tile, RESOURCE_SCALE);
        map.add_resource(LooseResource::new(ids.resource(), bounds, resource.amount));
    }

    for piece in &layout.pieces {
        let first = placement(map, "structure piece", piece.column, piece.row)?;
        let last_column = piece.column.saturating_add(piece.width.max(1) - 1);
        let last_row = piece.row.saturating_add(piece.height.max(1) - 1);
        let last = placement(map, "structure piece", last_column, last_row)?;
        let start = map.tile_bounds(first);
        let end = map.tile_bounds(last);
        let bounds = BoundingBox::new(start.left(), start.top(), end.right(), end.bottom());
        map.add_piece(StructurePiece::new(ids.piece(), bounds, piece.cost));
    }

    for creature in &layout.creatures {
        let tile = placement(map, "creature", creature.column, creature.row)?;
        let bounds = centered(map, tile, CREATURE_SCALE);
        map.add_creature(Creature::new(ids.creature(), bounds, creature.locomotion));
    }
    Ok(())
}

fn placement(
    map: &TileMap,
    entity: &'static str,
    column: u32,
    row: u32,
) -> Result<TileCoord, WorldBuildError> {
    let tile = TileCoord::new(column, row);
    map.tile(tile)
        .map(|_| tile)
        .ok_or(WorldBuildError::PlacementOutOfMap {
            entity,
            column,
            row,
        })
}

/// Box of `scale` tiles centered on `tile`.
pub(crate) fn centered(map: &TileMap, tile: TileCoord, scale: f32) -> BoundingBox {
    let size = Vec2::splat(map.geometry().tile_length() * scale);
    BoundingBox::from_origin_and_size(map.tile_center(tile) - size * 0.5, size)
}

fn build_player(layout: &WorldLayout, grids: &[TileMapGrid]) -> Result<Player, WorldBuildError> {
    let spawn = &layout.player;
    let outside = || WorldBuildError::PlayerOutsideWorld {
        grid: spawn.grid.clone(),
    };
    let id = grid_id(layout, &spawn.grid)?;
    let map = grids
        .iter()
        .find(|grid| grid.id() == id)
        .and_then(|grid| grid.tile_map(MapCoord::new(spawn.map_row, spawn.map_column)))
        .ok_or_else(outside)?;
    let tile = TileCoord::new(spawn.column, spawn.row);
    if map.tile(tile).is_none() {
        return Err(outside());
    }
    let size = Vec2::new(spawn.size[0], spawn.size[1]);
    let origin = map.tile_center(tile) - size * 0.5;
    Ok(Player::new(id, BoundingBox::from_origin_and_size(origin, size)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
        obstacle_shake_ms = 250

        [geometry]
        columns = 4
        rows = 3
        tile_length = 16.0

        [player]
        grid = "meadow"
        map_row = 0
        map_column = 0
        column = 1
        row = 1

        [[grids]]
        name = "meadow"
        rows = 1
        columns = 2

        [[grids.maps]]
        row = 0
        column = 0
        tiles = ["....", ".~~.", "...."]
        obstacles = [{ column = 3, row = 0, yield_amount = 2 }]
        resources = [{ column = 0, row = 2 }]

        [[grids.maps]]
        row = 0
        column = 1
        fill = ","
        patches = [{ column = 0, row = 0, width = 2, tile = "R" }]
        pieces = [{ column = 1, row = 1, width = 2, height = 2, cost = 3 }]
        creatures = [{ column = 3, row = 0, locomotion = "flying" }]
    "#;

    fn build_small(text: &str) -> Result<BuiltLayout, WorldBuildError> {
        let layout = WorldLayout::from_toml_str(text)?;
        build(&layout, &TileAttributeTable::standard())
    }

    #[test]
    fn small_layout_builds_every_entity() {
        let built = build_small(SMALL).expect("layout builds");
        let grid = &built.grids[0];
        let left = grid.tile_map(MapCoord::new(0, 0)).expect("left map");
        let right = grid.tile_map(MapCoord::new(0, 1)).expect("right map");

        assert_eq!(left.tile(TileCoord::new(1, 1)), Some(TileKind::Water));
        assert_eq!(left.obstacles()[0].yield_amount(), 2);
        assert_eq!(left.resources()[0].bounds().size(), Vec2::splat(8.0));

        assert_eq!(right.tile(TileCoord::new(1, 0)), Some(TileKind::Rock));
        assert_eq!(right.tile(TileCoord::new(2, 0)), Some(TileKind::Sand));
        assert_eq!(right.pieces()[0].bounds(), BoundingBox::new(80.0, 16.0, 112.0, 48.0));
        assert_eq!(right.creatures()[0].locomotion(), Locomotion::Flying);

        assert_eq!(built.player.grid(), GridId::new(0));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let text = SMALL.replace(r#"".~~.""#, r#"".~~""#);
        assert!(matches!(
            build_small(&text),
            Err(WorldBuildError::RaggedTileRow { row: 1, expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn unknown_symbols_are_rejected() {
        let text = SMALL.replace(r#"fill = ",""#, r#"fill = "?""#);
        assert!(matches!(
            build_small(&text),
            Err(WorldBuildError::UnknownTileSymbol { symbol: '?' })
        ));
    }

    #[test]
    fn structure_tiles_stay_indoors() {
        let text = SMALL.replace(r#"tile = "R""#, r##"tile = "#""##);
        assert!(matches!(
            build_small(&text),
            Err(WorldBuildError::StructureTileOutsideStructure { symbol: '#', .. })
        ));
    }

    #[test]
    fn placements_outside_the_map_are_rejected() {
        let text = SMALL.replace(
            "column = 3, row = 0, yield_amount",
            "column = 4, row = 0, yield_amount",
        );
        assert!(matches!(
            build_small(&text),
            Err(WorldBuildError::PlacementOutOfMap { entity: "obstacle", .. })
        ));
    }

    #[test]
    fn player_must_land_on_a_map() {
        let text = SMALL.replace("map_column = 0", "map_column = 5");
        assert!(matches!(
            build_small(&text),
            Err(WorldBuildError::PlayerOutsideWorld { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            WorldLayout::from_toml_str("grids = 3"),
            Err(WorldBuildError::Parse(_))
        ));
    }
}
