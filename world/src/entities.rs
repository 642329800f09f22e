//! Dynamic entities anchored to tile maps.

use std::time::Duration;

use glam::Vec2;
use tilescape_core::{
    BoundingBox, CreatureId, GridId, Locomotion, Movable, ObstacleId, PieceId, ResourceId,
};

/// Harvesting progress of an obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObstacleState {
    /// Untouched; blocks movement and can be struck.
    Idle,
    /// Struck and shaking; still blocks movement.
    Shaking {
        /// Time left until the obstacle yields.
        remaining: Duration,
    },
    /// Harvested; no longer blocks movement.
    Yielded,
}

/// Harvestable solid object such as a tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    id: ObstacleId,
    bounds: BoundingBox,
    yield_amount: u32,
    shake_duration: Duration,
    state: ObstacleState,
}

impl Obstacle {
    /// Creates an idle obstacle.
    #[must_use]
    pub const fn new(
        id: ObstacleId,
        bounds: BoundingBox,
        yield_amount: u32,
        shake_duration: Duration,
    ) -> Self {
        Self {
            id,
            bounds,
            yield_amount,
            shake_duration,
            state: ObstacleState::Idle,
        }
    }

    /// Identifier of the obstacle.
    #[must_use]
    pub const fn id(&self) -> ObstacleId {
        self.id
    }

    /// World-space footprint.
    #[must_use]
    pub const fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Wood dropped once the obstacle yields.
    #[must_use]
    pub const fn yield_amount(&self) -> u32 {
        self.yield_amount
    }

    /// Current harvesting state.
    #[must_use]
    pub const fn state(&self) -> ObstacleState {
        self.state
    }

    /// Reports whether the obstacle blocks movement.
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        !matches!(self.state, ObstacleState::Yielded)
    }

    /// Reports whether a strike would start the obstacle shaking.
    #[must_use]
    pub const fn is_harvestable(&self) -> bool {
        matches!(self.state, ObstacleState::Idle)
    }

    /// Idle → Shaking. Returns `false` for any other state.
    pub(crate) fn strike(&mut self) -> bool {
        if !self.is_harvestable() {
            return false;
        }
        self.state = ObstacleState::Shaking {
            remaining: self.shake_duration,
        };
        true
    }

    /// Runs the shake timer. Returns `true` on the Shaking → Yielded step.
    pub(crate) fn advance(&mut self, dt: Duration) -> bool {
        let ObstacleState::Shaking { remaining } = self.state else {
            return false;
        };
        let remaining = remaining.saturating_sub(dt);
        if remaining.is_zero() {
            self.state = ObstacleState::Yielded;
            true
        } else {
            self.state = ObstacleState::Shaking { remaining };
            false
        }
    }
}

/// Resource lying on the ground, waiting to be picked up.
#[derive(Clone, Debug, PartialEq)]
pub struct LooseResource {
    id: ResourceId,
    bounds: BoundingBox,
    amount: u32,
}

impl LooseResource {
    /// Creates a loose resource.
    #[must_use]
    pub const fn new(id: ResourceId, bounds: BoundingBox, amount: u32) -> Self {
        Self { id, bounds, amount }
    }

    /// Identifier of the resource.
    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    /// World-space footprint.
    #[must_use]
    pub const fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Wood granted on pickup.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount
    }
}

/// Creature roaming its home map.
#[derive(Clone, Debug, PartialEq)]
pub struct Creature {
    id: CreatureId,
    bounds: BoundingBox,
    locomotion: Locomotion,
}

impl Creature {
    /// Creates a creature.
    #[must_use]
    pub const fn new(id: CreatureId, bounds: BoundingBox, locomotion: Locomotion) -> Self {
        Self {
            id,
            bounds,
            locomotion,
        }
    }

    /// Identifier of the creature.
    #[must_use]
    pub const fn id(&self) -> CreatureId {
        self.id
    }

    /// Movement rules of the creature.
    #[must_use]
    pub const fn locomotion(&self) -> Locomotion {
        self.locomotion
    }
}

impl Movable for Creature {
    fn world_bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    fn set_world_position(&mut self, position: Vec2) {
        self.bounds = self.bounds.with_origin(position);
    }
}

/// Buildable part of a structure, paid for with wood.
#[derive(Clone, Debug, PartialEq)]
pub struct StructurePiece {
    id: PieceId,
    bounds: BoundingBox,
    cost: u32,
    built: bool,
}

impl StructurePiece {
    /// Creates an unbuilt structure piece.
    #[must_use]
    pub const fn new(id: PieceId, bounds: BoundingBox, cost: u32) -> Self {
        Self {
            id,
            bounds,
            cost,
            built: false,
        }
    }

    /// Identifier of the piece.
    #[must_use]
    pub const fn id(&self) -> PieceId {
        self.id
    }

    /// World-space footprint.
    #[must_use]
    pub const fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Wood required to build the piece.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Whether the piece has been completed.
    #[must_use]
    pub const fn is_built(&self) -> bool {
        self.built
    }

    pub(crate) fn mark_built(&mut self) {
        self.built = true;
    }
}

/// Entity steered by the player.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    grid: GridId,
    bounds: BoundingBox,
}

impl Player {
    pub(crate) const fn new(grid: GridId, bounds: BoundingBox) -> Self {
        Self { grid, bounds }
    }

    /// Grid the player currently occupies.
    #[must_use]
    pub const fn grid(&self) -> GridId {
        self.grid
    }

    pub(crate) fn set_grid(&mut self, grid: GridId) {
        self.grid = grid;
    }
}

impl Movable for Player {
    fn world_bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    fn set_world_position(&mut self, position: Vec2) {
        self.bounds = self.bounds.with_origin(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Obstacle {
        Obstacle::new(
            ObstacleId::new(1),
            BoundingBox::new(0.0, 0.0, 16.0, 16.0),
            2,
            Duration::from_millis(500),
        )
    }

    #[test]
    fn obstacle_shakes_then_yields_on_timer() {
        let mut obstacle = tree();
        assert!(obstacle.is_solid());
        assert!(obstacle.strike());
        assert!(!obstacle.strike(), "second strike while shaking is ignored");

        assert!(!obstacle.advance(Duration::from_millis(300)));
        assert!(obstacle.is_solid());
        assert!(obstacle.advance(Duration::from_millis(200)));
        assert_eq!(obstacle.state(), ObstacleState::Yielded);
        assert!(!obstacle.is_solid());
        assert!(!obstacle.advance(Duration::from_millis(200)));
    }

    #[test]
    fn idle_obstacles_ignore_time() {
        let mut obstacle = tree();
        assert!(!obstacle.advance(Duration::from_secs(10)));
        assert_eq!(obstacle.state(), ObstacleState::Idle);
    }

    #[test]
    fn movable_entities_keep_their_size() {
        let mut creature = Creature::new(
            CreatureId::new(4),
            BoundingBox::new(0.0, 0.0, 12.0, 10.0),
            Locomotion::Walking,
        );
        creature.set_world_position(Vec2::new(40.0, 50.0));
        let bounds = creature.world_bounding_box();
        assert_eq!(bounds.origin(), Vec2::new(40.0, 50.0));
        assert_eq!(bounds.size(), Vec2::new(12.0, 10.0));
    }
}
