#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that lets creatures roam their home tile map.
//!
//! Every creature follows a random heading for a while, then picks another.
//! Moves go through the shared collision resolver with the creature's own
//! traversal rules and are dropped if they would leave the home map.

use std::{
    collections::{BTreeMap, BTreeSet},
    f32::consts::TAU,
    time::Duration,
};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tilescape_core::{Command, CreatureId, Movable, MovementIntent, TileAttributeTable};
use tilescape_system_movement::resolve;
use tilescape_world::{query, Creature, TileMap, TileMapGrid, World};
use tracing::debug;

const REST_CHANCE: f64 = 0.2;

/// Tunables of the wandering system.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderConfig {
    /// Creature speed in pixels per second.
    pub speed: f32,
    /// Time a creature keeps its heading, in milliseconds.
    pub heading_ms: u64,
}

impl WanderConfig {
    /// Time a creature keeps its heading.
    #[must_use]
    pub const fn heading_duration(&self) -> Duration {
        Duration::from_millis(self.heading_ms)
    }
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            speed: 24.0,
            heading_ms: 1_500,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Heading {
    direction: Vec2,
    remaining: Duration,
}

/// Wandering system holding one heading per creature.
#[derive(Debug, Default)]
pub struct Wandering {
    config: WanderConfig,
    headings: BTreeMap<CreatureId, Heading>,
}

impl Wandering {
    /// Creates the system with the provided tunables.
    #[must_use]
    pub fn new(config: WanderConfig) -> Self {
        Self {
            config,
            headings: BTreeMap::new(),
        }
    }

    /// Tunables in use.
    #[must_use]
    pub const fn config(&self) -> WanderConfig {
        self.config
    }

    /// Number of creatures currently following a heading.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.headings.len()
    }

    /// Forgets every heading.
    pub fn reset(&mut self) {
        self.headings.clear();
    }

    /// Moves every creature of the world by one frame and emits
    /// [`Command::MoveCreature`] for each creature that actually moved.
    ///
    /// Creatures are visited grid by grid, map by map, in storage order, so a
    /// seeded `rng` reproduces the same moves.
    pub fn handle<R: Rng + ?Sized>(
        &mut self,
        world: &World,
        dt: Duration,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) {
        let attributes = query::attributes(world);
        let mut seen = BTreeSet::new();
        for grid in query::grids(world) {
            for map in grid.maps() {
                for creature in map.creatures() {
                    let _ = seen.insert(creature.id());
                    self.wander(creature, map, grid, attributes, dt, rng, out);
                }
            }
        }
        self.headings.retain(|id, _| seen.contains(id));
    }

    #[allow(clippy::too_many_arguments)]
    fn wander<R: Rng + ?Sized>(
        &mut self,
        creature: &Creature,
        home: &TileMap,
        grid: &TileMapGrid,
        attributes: &TileAttributeTable,
        dt: Duration,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) {
        let duration = self.config.heading_duration();
        let heading = self
            .headings
            .entry(creature.id())
            .or_insert_with(|| Heading {
                direction: Vec2::ZERO,
                remaining: Duration::ZERO,
            });
        if heading.remaining.is_zero() {
            *heading = Heading {
                direction: pick_direction(rng),
                remaining: duration,
            };
        }
        heading.remaining = heading.remaining.saturating_sub(dt);

        let displacement = heading.direction * self.config.speed * dt.as_secs_f32();
        if displacement == Vec2::ZERO {
            return;
        }

        let locomotion = creature.locomotion();
        let current = creature.world_bounding_box();
        let position = resolve(
            current,
            MovementIntent::Vector { displacement },
            locomotion.traversal(attributes),
            locomotion.crosses_solids(),
            grid,
        );
        let moved = current.with_origin(position);

        if position == current.origin() || !home.bounds().contains_box(&moved) {
            debug!(creature = creature.id().get(), ?locomotion, "creature_turned");
            heading.remaining = Duration::ZERO;
            return;
        }
        out.push(Command::MoveCreature {
            creature: creature.id(),
            position,
        });
    }
}

fn pick_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    if rng.gen_bool(REST_CHANCE) {
        Vec2::ZERO
    } else {
        Vec2::from_angle(rng.gen_range(0.0..TAU))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn directions_are_unit_length_or_rest() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..64 {
            let direction = pick_direction(&mut rng);
            assert!(direction == Vec2::ZERO || (direction.length() - 1.0).abs() < 1e-5);
        }
    }
}
