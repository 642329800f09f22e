#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tilescape engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems read the world, emit
//! [`Command`] values describing the mutations they want, the world executes
//! those commands via its `apply` entry point, and then broadcasts [`Event`]
//! values that adapters translate into effects, audio and presentation.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

mod geometry;
mod swing;
mod tiles;

pub use geometry::BoundingBox;
pub use swing::{SwingState, SwingTiming, Weapon};
pub use tiles::{TileAttributeTable, TileAttributes, TileKind, TraversalAttributes, TraversalSet};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances obstacle timers by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Moves the controlled entity to a new upper-left position within its grid.
    MovePlayer {
        /// New world position of the entity's bounding box origin.
        position: Vec2,
    },
    /// Relocates the controlled entity into another grid.
    EnterGrid {
        /// Grid the entity switches into.
        grid: GridId,
        /// World position of the entity's bounding box origin inside that grid.
        position: Vec2,
    },
    /// Lands a strike on a harvestable obstacle.
    StrikeObstacle {
        /// Obstacle that was hit.
        obstacle: ObstacleId,
    },
    /// Picks up a loose resource.
    CollectResource {
        /// Resource being collected.
        resource: ResourceId,
    },
    /// Picks up a creature.
    CollectCreature {
        /// Creature being collected.
        creature: CreatureId,
    },
    /// Spends wood to complete a structure piece.
    BuildStructurePiece {
        /// Piece being built.
        piece: PieceId,
    },
    /// Spawns a new creature into a tile map.
    SpawnCreature {
        /// Map that will own the creature.
        map: MapRef,
        /// Movement rules of the creature.
        locomotion: Locomotion,
        /// Upper-left world position of the creature.
        position: Vec2,
    },
    /// Moves an existing creature within its home map.
    MoveCreature {
        /// Creature being moved.
        creature: CreatureId,
        /// New upper-left world position.
        position: Vec2,
    },
    /// Replaces a single tile, for example swapping a door for its closed variant.
    ReplaceTile {
        /// Map containing the tile.
        map: MapRef,
        /// Tile to replace.
        tile: TileCoord,
        /// Kind written into the tile.
        kind: TileKind,
    },
    /// Rebuilds the world from its original layout.
    ResetWorld,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that the controlled entity moved within its grid.
    PlayerMoved {
        /// Origin before the move.
        from: Vec2,
        /// Origin after the move.
        to: Vec2,
    },
    /// Confirms that the controlled entity switched grids.
    GridEntered {
        /// Grid the entity occupies now.
        grid: GridId,
        /// Origin of the entity inside that grid.
        position: Vec2,
    },
    /// An idle obstacle was struck and started shaking.
    ObstacleShaking {
        /// Obstacle that was struck.
        obstacle: ObstacleId,
    },
    /// A shaking obstacle finished shaking and dropped a resource.
    ObstacleYielded {
        /// Obstacle that yielded.
        obstacle: ObstacleId,
        /// Resource dropped where the obstacle stood.
        resource: ResourceId,
    },
    /// A loose resource was collected.
    ResourceCollected {
        /// Resource that was collected.
        resource: ResourceId,
        /// Wood added to the stockpile.
        amount: u32,
    },
    /// A creature was collected.
    CreatureCollected {
        /// Creature that was collected.
        creature: CreatureId,
    },
    /// A structure piece was completed.
    StructurePieceBuilt {
        /// Piece that was completed.
        piece: PieceId,
    },
    /// A structure piece could not be built.
    StructurePieceRejected {
        /// Piece targeted by the request.
        piece: PieceId,
        /// Reason the request failed.
        reason: BuildRejection,
    },
    /// A creature appeared in a tile map.
    CreatureSpawned {
        /// Identifier allocated to the creature.
        creature: CreatureId,
        /// Map that owns the creature.
        map: MapRef,
    },
    /// A creature moved within its home map.
    CreatureMoved {
        /// Creature that moved.
        creature: CreatureId,
        /// Origin before the move.
        from: Vec2,
        /// Origin after the move.
        to: Vec2,
    },
    /// A tile was replaced and transition markers were rebuilt.
    TileReplaced {
        /// Map containing the tile.
        map: MapRef,
        /// Tile that changed.
        tile: TileCoord,
        /// Kind now stored in the tile.
        kind: TileKind,
        /// Number of transition markers present after the rebuild.
        markers: usize,
    },
    /// A tile replacement was reverted because it left the world inconsistent.
    TileReplacementRejected {
        /// Map containing the tile.
        map: MapRef,
        /// Tile targeted by the request.
        tile: TileCoord,
        /// Kind that was requested.
        kind: TileKind,
    },
    /// The world was rebuilt from its layout.
    WorldReset,
}

/// Reasons a structure piece cannot be built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildRejection {
    /// The piece has already been completed.
    AlreadyBuilt,
    /// The stockpile does not hold enough wood.
    InsufficientWood {
        /// Wood the piece costs.
        required: u32,
        /// Wood currently held.
        available: u32,
    },
    /// No piece with the provided identifier exists.
    MissingPiece,
}

/// Cardinal movement directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards decreasing `y`.
    Up,
    /// Towards increasing `y`.
    Down,
    /// Towards decreasing `x`.
    Left,
    /// Towards increasing `x`.
    Right,
}

impl Direction {
    /// Every direction in a fixed order.
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Unit vector pointing in the direction.
    #[must_use]
    pub const fn unit(self) -> Vec2 {
        match self {
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Horizontal direction matching the sign of `dx`, if non-zero.
    #[must_use]
    pub fn horizontal(dx: f32) -> Option<Self> {
        if dx > 0.0 {
            Some(Self::Right)
        } else if dx < 0.0 {
            Some(Self::Left)
        } else {
            None
        }
    }

    /// Vertical direction matching the sign of `dy`, if non-zero.
    #[must_use]
    pub fn vertical(dy: f32) -> Option<Self> {
        if dy > 0.0 {
            Some(Self::Down)
        } else if dy < 0.0 {
            Some(Self::Up)
        } else {
            None
        }
    }
}

/// Movement an entity requests for a single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MovementIntent {
    /// Movement along a named direction for the elapsed frame time.
    Directional {
        /// Direction of travel.
        direction: Direction,
        /// Speed in pixels per second.
        speed: f32,
        /// Frame time the movement covers.
        elapsed: Duration,
    },
    /// Raw displacement in pixels.
    Vector {
        /// Requested displacement.
        displacement: Vec2,
    },
}

impl MovementIntent {
    /// Full displacement requested by the intent.
    #[must_use]
    pub fn displacement(&self) -> Vec2 {
        match *self {
            Self::Directional {
                direction,
                speed,
                elapsed,
            } => direction.unit() * speed * elapsed.as_secs_f32(),
            Self::Vector { displacement } => displacement,
        }
    }
}

/// How a creature moves through the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locomotion {
    /// Moves over walkable ground.
    Walking,
    /// Moves over anything but interior walls and ignores solid objects.
    Flying,
    /// Moves through water only.
    Swimming,
}

impl Locomotion {
    /// Every locomotion kind.
    pub const ALL: [Locomotion; 3] = [Self::Walking, Self::Flying, Self::Swimming];

    /// Tiles an entity with this locomotion may enter.
    #[must_use]
    pub fn traversal(self, attributes: &impl TraversalAttributes) -> TraversalSet {
        match self {
            Self::Walking => TraversalSet::walking(attributes),
            Self::Flying => TraversalSet::flying(attributes),
            Self::Swimming => TraversalSet::swimming(attributes),
        }
    }

    /// Reports whether solid objects block the entity.
    #[must_use]
    pub const fn crosses_solids(self) -> bool {
        matches!(self, Self::Flying)
    }
}

/// Geometry accessors consumed from any movable entity.
pub trait Movable {
    /// Bounding box occupied by the entity in world space.
    fn world_bounding_box(&self) -> BoundingBox;
    /// Moves the entity so that its bounding box origin sits at `position`.
    fn set_world_position(&mut self, position: Vec2);
}

/// Side effects the core fires but does not implement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    /// A strike landed on an obstacle.
    StrikeLanded {
        /// Obstacle that was hit.
        obstacle: ObstacleId,
    },
    /// A structure piece was completed.
    StructureCompleted {
        /// Piece that was completed.
        piece: PieceId,
    },
    /// The controlled entity stepped through a transition marker.
    MarkerTransition {
        /// Grid that was entered.
        grid: GridId,
    },
}

/// Fire-and-forget sink for [`Effect`] values (audio, particles, ...).
pub trait EffectSink {
    /// Plays the effect. No result is expected.
    fn play(&mut self, effect: Effect);
}

impl EffectSink for Vec<Effect> {
    fn play(&mut self, effect: Effect) {
        self.push(effect);
    }
}

/// Per-map tile layout shared by every tile map of a world.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapGeometry {
    columns: u32,
    rows: u32,
    tile_length: f32,
}

impl MapGeometry {
    /// Creates a new map geometry.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, tile_length: f32) -> Self {
        Self {
            columns,
            rows,
            tile_length,
        }
    }

    /// Number of tile columns per map.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows per map.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a square tile in pixels.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }

    /// Map width in pixels.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.tile_length
    }

    /// Map height in pixels.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.tile_length
    }

    /// Map size in pixels.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    /// Number of tiles per map.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        usize::try_from(u64::from(self.columns) * u64::from(self.rows)).unwrap_or(0)
    }

    /// Reports whether the geometry describes a non-empty map.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.columns > 0 && self.rows > 0 && self.tile_length.is_finite() && self.tile_length > 0.0
    }
}

impl Default for MapGeometry {
    fn default() -> Self {
        Self::new(32, 24, 16.0)
    }
}

/// Slot of a tile map within its grid, expressed as row and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapCoord {
    row: u32,
    column: u32,
}

impl MapCoord {
    /// Creates a new map slot coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row of the slot.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column of the slot.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Slot adjacent in `direction`, or `None` when it would leave the
    /// non-negative quadrant.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<Self> {
        match direction {
            Direction::Up => self.row.checked_sub(1).map(|row| Self::new(row, self.column)),
            Direction::Down => self.row.checked_add(1).map(|row| Self::new(row, self.column)),
            Direction::Left => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(self.row, column)),
            Direction::Right => self
                .column
                .checked_add(1)
                .map(|column| Self::new(self.row, column)),
        }
    }
}

/// Location of a single tile within a tile map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Fully qualified reference to a tile map: its grid and slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapRef {
    /// Grid that owns the map.
    pub grid: GridId,
    /// Slot of the map within the grid.
    pub map: MapCoord,
}

impl MapRef {
    /// Creates a new map reference.
    #[must_use]
    pub const fn new(grid: GridId, map: MapCoord) -> Self {
        Self { grid, map }
    }
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }
    };
}

identifier!(
    /// Index of a tile map grid within the world.
    GridId
);
identifier!(
    /// Unique identifier assigned to a harvestable obstacle.
    ObstacleId
);
identifier!(
    /// Unique identifier assigned to a loose resource.
    ResourceId
);
identifier!(
    /// Unique identifier assigned to a creature.
    CreatureId
);
identifier!(
    /// Unique identifier assigned to a structure piece.
    PieceId
);
identifier!(
    /// Unique identifier assigned to a transition marker.
    MarkerId
);

/// Persistence-facing snapshot of a structure piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructurePieceSnapshot {
    /// Identifier of the piece.
    pub id: PieceId,
    /// Map that owns the piece.
    pub map: MapRef,
    /// Whether the piece has been completed.
    pub built: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn structure_piece_snapshot_round_trips_through_bincode() {
        assert_round_trip(&StructurePieceSnapshot {
            id: PieceId::new(3),
            map: MapRef::new(GridId::new(1), MapCoord::new(0, 2)),
            built: true,
        });
    }

    #[test]
    fn directional_intent_scales_with_elapsed_time() {
        let intent = MovementIntent::Directional {
            direction: Direction::Left,
            speed: 64.0,
            elapsed: Duration::from_millis(250),
        };
        assert_eq!(intent.displacement(), Vec2::new(-16.0, 0.0));
    }

    #[test]
    fn map_neighbors_stop_at_the_origin() {
        let origin = MapCoord::new(0, 0);
        assert_eq!(origin.neighbor(Direction::Up), None);
        assert_eq!(origin.neighbor(Direction::Left), None);
        assert_eq!(origin.neighbor(Direction::Right), Some(MapCoord::new(0, 1)));
        assert_eq!(origin.neighbor(Direction::Down), Some(MapCoord::new(1, 0)));
    }

    #[test]
    fn geometry_reports_pixel_dimensions() {
        let geometry = MapGeometry::default();
        assert_eq!(geometry.width(), 512.0);
        assert_eq!(geometry.height(), 384.0);
        assert_eq!(geometry.tile_count(), 768);
        assert!(!MapGeometry::new(0, 4, 16.0).is_valid());
    }

    #[test]
    fn opposite_directions_pair_up() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_ne!(direction.opposite(), direction);
        }
    }

    #[test]
    fn effect_sink_records_into_vectors() {
        let mut sink: Vec<Effect> = Vec::new();
        sink.play(Effect::MarkerTransition {
            grid: GridId::new(2),
        });
        assert_eq!(sink.len(), 1);
    }
}
