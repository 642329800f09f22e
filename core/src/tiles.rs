//! Static tile traversal attributes and per-entity traversal sets.

use serde::{Deserialize, Serialize};

/// Kinds of tiles that can be placed into a tile map.
///
/// The discriminant doubles as the compact tile identifier used by layouts and
/// save data, so variants must only ever be appended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    /// Open grass.
    Grass,
    /// Beach sand.
    Sand,
    /// Trodden path.
    Path,
    /// Shallow or deep water.
    Water,
    /// Impassable boulder.
    Rock,
    /// Interior floorboards.
    Floor,
    /// Interior wall.
    Wall,
    /// Open doorway on a building facade leading into the ground floor.
    Door,
    /// Doorway swapped for its closed variant.
    DoorClosed,
    /// Ground-floor exit leading back outside.
    Exit,
    /// Staircase leading one floor up.
    StairsUp,
    /// Staircase leading one floor down.
    StairsDown,
}

impl TileKind {
    /// Number of tile kinds.
    pub const COUNT: usize = 12;

    /// Every tile kind in identifier order.
    pub const ALL: [TileKind; Self::COUNT] = [
        Self::Grass,
        Self::Sand,
        Self::Path,
        Self::Water,
        Self::Rock,
        Self::Floor,
        Self::Wall,
        Self::Door,
        Self::DoorClosed,
        Self::Exit,
        Self::StairsUp,
        Self::StairsDown,
    ];

    /// Compact identifier of the tile kind.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Resolves a compact identifier back into a tile kind.
    #[must_use]
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Single-character symbol used by textual layouts.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Grass => '.',
            Self::Sand => ',',
            Self::Path => '=',
            Self::Water => '~',
            Self::Rock => 'R',
            Self::Floor => '_',
            Self::Wall => '#',
            Self::Door => 'D',
            Self::DoorClosed => 'd',
            Self::Exit => 'E',
            Self::StairsUp => '^',
            Self::StairsDown => 'v',
        }
    }

    /// Parses a layout symbol.
    #[must_use]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.symbol() == symbol)
    }

    /// Reports whether the tile connects two maps or floors and therefore
    /// carries a transition marker.
    #[must_use]
    pub const fn is_connector(self) -> bool {
        matches!(
            self,
            Self::Door | Self::Exit | Self::StairsUp | Self::StairsDown
        )
    }
}

/// Traversal attributes attached to a single tile kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAttributes {
    /// Walking entities may stand on the tile.
    pub walkable: bool,
    /// The tile is water; swimmers may stand on it.
    pub water: bool,
    /// The tile only ever appears inside structures.
    pub structure_only: bool,
}

impl TileAttributes {
    const fn new(walkable: bool, water: bool, structure_only: bool) -> Self {
        Self {
            walkable,
            water,
            structure_only,
        }
    }
}

/// Lookup surface the movement core consumes to classify tiles.
pub trait TraversalAttributes {
    /// Walking entities may stand on `kind`.
    fn is_walkable(&self, kind: TileKind) -> bool;
    /// `kind` is water.
    fn is_water(&self, kind: TileKind) -> bool;
    /// `kind` only appears inside structures.
    fn is_structure_only(&self, kind: TileKind) -> bool;
}

/// Static mapping from tile kind to traversal attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileAttributeTable {
    entries: [TileAttributes; TileKind::COUNT],
}

impl TileAttributeTable {
    /// Attribute table shipped with the game.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            entries: [
                TileAttributes::new(true, false, false),  // grass
                TileAttributes::new(true, false, false),  // sand
                TileAttributes::new(true, false, false),  // path
                TileAttributes::new(false, true, false),  // water
                TileAttributes::new(false, false, false), // rock
                TileAttributes::new(true, false, true),   // floor
                TileAttributes::new(false, false, true),  // wall
                TileAttributes::new(true, false, false),  // door
                TileAttributes::new(false, false, false), // closed door
                TileAttributes::new(true, false, true),   // exit
                TileAttributes::new(true, false, true),   // stairs up
                TileAttributes::new(true, false, true),   // stairs down
            ],
        }
    }

    /// Attributes recorded for `kind`.
    #[must_use]
    pub fn attributes(&self, kind: TileKind) -> TileAttributes {
        self.entries[usize::from(kind.id())]
    }

    /// Returns a copy of the table with the attributes of `kind` replaced.
    #[must_use]
    pub fn with_override(mut self, kind: TileKind, attributes: TileAttributes) -> Self {
        self.entries[usize::from(kind.id())] = attributes;
        self
    }
}

impl Default for TileAttributeTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TraversalAttributes for TileAttributeTable {
    fn is_walkable(&self, kind: TileKind) -> bool {
        self.attributes(kind).walkable
    }

    fn is_water(&self, kind: TileKind) -> bool {
        self.attributes(kind).water
    }

    fn is_structure_only(&self, kind: TileKind) -> bool {
        self.attributes(kind).structure_only
    }
}

/// Set of tile kinds an entity may move onto.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraversalSet(u32);

impl TraversalSet {
    /// Set that admits no tiles at all.
    pub const EMPTY: Self = Self(0);

    /// Builds a set from an explicit list of kinds.
    #[must_use]
    pub fn from_kinds(kinds: &[TileKind]) -> Self {
        kinds.iter().fold(Self::EMPTY, |set, kind| set.with(*kind))
    }

    /// Returns the set extended with `kind`.
    #[must_use]
    pub const fn with(self, kind: TileKind) -> Self {
        Self(self.0 | (1 << kind.id()))
    }

    /// Reports whether `kind` belongs to the set.
    #[must_use]
    pub const fn contains(self, kind: TileKind) -> bool {
        self.0 & (1 << kind.id()) != 0
    }

    /// Tiles a walking entity may enter.
    #[must_use]
    pub fn walking(attributes: &impl TraversalAttributes) -> Self {
        Self::matching(|kind| attributes.is_walkable(kind))
    }

    /// Tiles a swimming entity may enter.
    #[must_use]
    pub fn swimming(attributes: &impl TraversalAttributes) -> Self {
        Self::matching(|kind| attributes.is_water(kind))
    }

    /// Tiles a flying entity may enter: everything outdoors plus any walkable
    /// interior tile, but never through interior walls.
    #[must_use]
    pub fn flying(attributes: &impl TraversalAttributes) -> Self {
        Self::matching(|kind| !attributes.is_structure_only(kind) || attributes.is_walkable(kind))
    }

    /// Iterates the kinds contained in the set in identifier order.
    pub fn iter(self) -> impl Iterator<Item = TileKind> {
        TileKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }

    fn matching(mut predicate: impl FnMut(TileKind) -> bool) -> Self {
        TileKind::ALL
            .into_iter()
            .filter(|kind| predicate(*kind))
            .fold(Self::EMPTY, Self::with)
    }
}
