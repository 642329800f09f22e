#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Map-transition controller that moves the player between tile maps.
//!
//! The controller alternates between free movement, where directional input
//! is resolved against the current grid, and scrolling, where the camera
//! glides to a neighbouring map while input is suppressed. Transition markers
//! are checked every free-movement frame, including the frame a scroll ends.

use std::time::Duration;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tilescape_core::{
    BoundingBox, Command, Direction, GridId, Locomotion, MapCoord, MarkerId, MovementIntent,
    TileCoord, TraversalSet,
};
use tilescape_system_movement::{box_is_clear, resolve};
use tilescape_world::{query, TileMap, TileMapGrid, TransitionMarker, World, CREATURE_SCALE};
use tracing::{debug, warn};

mod camera;

pub use camera::Camera;

const SPAWN_ATTEMPTS: usize = 8;

/// Tunables of the map-transition controller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Player speed in pixels per second.
    pub player_speed: f32,
    /// Length of a scroll between neighbouring maps, in milliseconds.
    pub scroll_ms: u64,
    /// Extra distance the player moves in the travel direction when a scroll
    /// starts.
    pub edge_nudge: f32,
    /// Probability that a creature spawns when a scroll completes.
    pub spawn_chance: f64,
}

impl ControllerConfig {
    /// Length of a scroll between neighbouring maps.
    #[must_use]
    pub const fn scroll_duration(&self) -> Duration {
        Duration::from_millis(self.scroll_ms)
    }

    fn spawn_probability(&self) -> f64 {
        if self.spawn_chance.is_finite() {
            self.spawn_chance.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            player_speed: 96.0,
            scroll_ms: 400,
            edge_nudge: 2.0,
            spawn_chance: 0.25,
        }
    }
}

/// Observable outcomes of a controller frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionEvent {
    /// The player crossed into a neighbouring map and the camera started moving.
    ScrollStarted {
        /// Map being left.
        from: MapCoord,
        /// Map being entered.
        to: MapCoord,
        /// Camera center at the end of the scroll.
        target_center: Vec2,
    },
    /// The camera reached the new map and input is accepted again.
    ScrollCompleted {
        /// Map the camera rests on.
        map: MapCoord,
    },
    /// The player ran into the edge of the world and was placed flush with it.
    Clamped {
        /// Direction of the blocked movement.
        direction: Direction,
    },
    /// The player stepped onto a transition marker and switched grids.
    MarkerTransition {
        /// Marker that fired.
        marker: MarkerId,
        /// Grid entered.
        grid: GridId,
        /// Map entered within that grid.
        map: MapCoord,
    },
    /// The player is not on any tile map; world interaction was skipped.
    FrameSkipped,
}

/// Phase of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerPhase {
    /// Input moves the player.
    FreeMovement,
    /// The camera is moving to a neighbouring map; input is ignored.
    Scrolling,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Scroll {
    from: Vec2,
    to: Vec2,
    elapsed: Duration,
    target: MapCoord,
}

impl Scroll {
    /// Moves the camera along the scroll. Returns `true` once it arrived.
    fn advance(&mut self, dt: Duration, duration: Duration, camera: &mut Camera) -> bool {
        self.elapsed = self.elapsed.saturating_add(dt);
        if duration.is_zero() || self.elapsed >= duration {
            camera.center_on(self.to);
            return true;
        }
        let t = self.elapsed.as_secs_f32() / duration.as_secs_f32();
        camera.center_on(self.from.lerp(self.to, t));
        false
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ControllerState {
    FreeMovement,
    Scrolling(Scroll),
}

/// Controller that owns the free-movement / scrolling state machine.
#[derive(Debug)]
pub struct MapTransition {
    config: ControllerConfig,
    state: ControllerState,
    previous_marker: Option<MarkerId>,
}

impl Default for MapTransition {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl MapTransition {
    /// Creates a controller in free movement.
    #[must_use]
    pub const fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            state: ControllerState::FreeMovement,
            previous_marker: None,
        }
    }

    /// Tunables in use.
    #[must_use]
    pub const fn config(&self) -> ControllerConfig {
        self.config
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ControllerPhase {
        match self.state {
            ControllerState::FreeMovement => ControllerPhase::FreeMovement,
            ControllerState::Scrolling(_) => ControllerPhase::Scrolling,
        }
    }

    /// Forgets all transient state, for example after the world was reset.
    pub fn reset(&mut self) {
        self.state = ControllerState::FreeMovement;
        self.previous_marker = None;
    }

    /// Runs one controller frame.
    ///
    /// Movement is requested through `out` as world commands; the camera is
    /// moved in place. While scrolling, `movement` is ignored rather than queued.
    #[allow(clippy::too_many_arguments)]
    pub fn handle<R: Rng + ?Sized>(
        &mut self,
        world: &World,
        dt: Duration,
        movement: Option<Direction>,
        camera: &mut Camera,
        rng: &mut R,
        out: &mut Vec<Command>,
        events: &mut Vec<TransitionEvent>,
    ) {
        if let ControllerState::Scrolling(scroll) = &mut self.state {
            if !scroll.advance(dt, self.config.scroll_duration(), camera) {
                return;
            }
            let target = scroll.target;
            self.state = ControllerState::FreeMovement;
            debug!(row = target.row(), column = target.column(), "scroll_completed");
            events.push(TransitionEvent::ScrollCompleted { map: target });

            let Some(grid) = query::current_tile_grid(world) else {
                skip_frame(events);
                return;
            };
            if let Some(map) = grid.tile_map(target) {
                self.roll_spawn(world, grid, map, rng, out);
            }
            self.check_marker(world, grid, query::player_bounding_box(world), camera, out, events);
            return;
        }

        let Some(grid) = query::current_tile_grid(world) else {
            skip_frame(events);
            return;
        };
        let bounding_box = query::player_bounding_box(world);
        let Some(map) = grid.tile_map_at(bounding_box.center()) else {
            skip_frame(events);
            return;
        };
        // Neighbours are those of the map on screen, which the player may
        // still straddle after a scroll.
        let map = grid.tile_map_at(camera.center()).unwrap_or(map);

        let next = match movement {
            Some(direction) => {
                self.step(world, grid, map, bounding_box, direction, dt, camera, out, events)
            }
            None => bounding_box,
        };
        if self.phase() == ControllerPhase::FreeMovement {
            self.check_marker(world, grid, next, camera, out, events);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn step(
        &mut self,
        world: &World,
        grid: &TileMapGrid,
        map: &TileMap,
        bounding_box: BoundingBox,
        direction: Direction,
        dt: Duration,
        camera: &Camera,
        out: &mut Vec<Command>,
        events: &mut Vec<TransitionEvent>,
    ) -> BoundingBox {
        let traversable = TraversalSet::walking(query::attributes(world));
        let intent = MovementIntent::Directional {
            direction,
            speed: self.config.player_speed,
            elapsed: dt,
        };
        let region = camera.visible_region();
        let tentative = bounding_box.translated(intent.displacement());

        let next = if !tentative.exceeds(&region, direction) {
            bounding_box.with_origin(resolve(bounding_box, intent, traversable, false, grid))
        } else if let Some(neighbor) = grid.adjacent(map.coord(), direction) {
            let accepted =
                resolve(bounding_box, intent, traversable, false, grid) != bounding_box.origin();
            let nudged = tentative.translated(direction.unit() * self.config.edge_nudge);
            if accepted && box_is_clear(nudged, traversable, false, grid) {
                self.state = ControllerState::Scrolling(Scroll {
                    from: camera.center(),
                    to: neighbor.center(),
                    elapsed: Duration::ZERO,
                    target: neighbor.coord(),
                });
                debug!(
                    from_row = map.coord().row(),
                    from_column = map.coord().column(),
                    to_row = neighbor.coord().row(),
                    to_column = neighbor.coord().column(),
                    "scroll_started"
                );
                events.push(TransitionEvent::ScrollStarted {
                    from: map.coord(),
                    to: neighbor.coord(),
                    target_center: neighbor.center(),
                });
                nudged
            } else {
                bounding_box
            }
        } else {
            let clamped = flush_with(bounding_box, &region, direction);
            if clamped != bounding_box && box_is_clear(clamped, traversable, false, grid) {
                events.push(TransitionEvent::Clamped { direction });
                clamped
            } else {
                bounding_box
            }
        };

        if next != bounding_box {
            out.push(Command::MovePlayer {
                position: next.origin(),
            });
        }
        next
    }

    fn check_marker(
        &mut self,
        world: &World,
        grid: &TileMapGrid,
        bounding_box: BoundingBox,
        camera: &mut Camera,
        out: &mut Vec<Command>,
        events: &mut Vec<TransitionEvent>,
    ) {
        let center = bounding_box.center();
        let marker = grid
            .tile_map_at(center)
            .and_then(|map| map.marker_containing(center));
        let id = marker.map(TransitionMarker::id);
        if id == self.previous_marker {
            return;
        }
        self.previous_marker = id;
        let Some(marker) = marker else {
            return;
        };

        let destination = marker.destination();
        let Some(arrival) = query::tile_map(world, destination) else {
            warn!(grid = destination.grid.get(), "marker_destination_missing");
            return;
        };
        let position = marker.spawn_origin(bounding_box.size());
        out.push(Command::EnterGrid {
            grid: destination.grid,
            position,
        });
        camera.center_on(arrival.center());
        self.previous_marker = arrival
            .marker_containing(marker.spawn())
            .map(TransitionMarker::id);

        debug!(
            marker = marker.id().get(),
            grid = destination.grid.get(),
            row = destination.map.row(),
            column = destination.map.column(),
            "marker_transition"
        );
        events.push(TransitionEvent::MarkerTransition {
            marker: marker.id(),
            grid: destination.grid,
            map: destination.map,
        });
    }

    fn roll_spawn<R: Rng + ?Sized>(
        &self,
        world: &World,
        grid: &TileMapGrid,
        map: &TileMap,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) {
        if !rng.gen_bool(self.config.spawn_probability()) {
            return;
        }

        let locomotion = Locomotion::ALL[rng.gen_range(0..Locomotion::ALL.len())];
        let traversable = locomotion.traversal(query::attributes(world));
        let geometry = map.geometry();
        let size = Vec2::splat(geometry.tile_length() * CREATURE_SCALE);
        let player = query::player_bounding_box(world);

        for _ in 0..SPAWN_ATTEMPTS {
            let tile = TileCoord::new(
                rng.gen_range(0..geometry.columns()),
                rng.gen_range(0..geometry.rows()),
            );
            let position = map.tile_center(tile) - size * 0.5;
            let footprint = BoundingBox::from_origin_and_size(position, size);
            if footprint.intersects(&player)
                || !box_is_clear(footprint, traversable, locomotion.crosses_solids(), grid)
            {
                continue;
            }
            debug!(?locomotion, column = tile.column(), row = tile.row(), "creature_spawn_rolled");
            out.push(Command::SpawnCreature {
                map: map.map_ref(),
                locomotion,
                position,
            });
            return;
        }
    }
}

fn skip_frame(events: &mut Vec<TransitionEvent>) {
    warn!("frame_skipped");
    events.push(TransitionEvent::FrameSkipped);
}

/// Box whose leading edge coincides with the boundary facing `direction`.
fn flush_with(
    bounding_box: BoundingBox,
    region: &BoundingBox,
    direction: Direction,
) -> BoundingBox {
    let origin = bounding_box.origin();
    let size = bounding_box.size();
    let moved = match direction {
        Direction::Right => Vec2::new(region.right() - size.x, origin.y),
        Direction::Left => Vec2::new(region.left(), origin.y),
        Direction::Down => Vec2::new(origin.x, region.bottom() - size.y),
        Direction::Up => Vec2::new(origin.x, region.top()),
    };
    bounding_box.with_origin(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 512.0, 384.0)
    }

    #[test]
    fn flush_boxes_touch_the_boundary_exactly() {
        let player = BoundingBox::from_origin_and_size(Vec2::new(370.0, 369.0), Vec2::splat(12.0));
        assert_eq!(flush_with(player, &region(), Direction::Down).bottom(), 384.0);
        assert_eq!(flush_with(player, &region(), Direction::Left).left(), 0.0);
    }

    #[test]
    fn invalid_spawn_chances_never_spawn() {
        let config = ControllerConfig {
            spawn_chance: f64::NAN,
            ..ControllerConfig::default()
        };
        assert_eq!(config.spawn_probability(), 0.0);
        let config = ControllerConfig {
            spawn_chance: 3.0,
            ..ControllerConfig::default()
        };
        assert_eq!(config.spawn_probability(), 1.0);
    }

    #[test]
    fn scrolls_interpolate_linearly() {
        let mut camera = Camera::new(Vec2::new(256.0, 192.0), Vec2::new(512.0, 384.0));
        let mut scroll = Scroll {
            from: camera.center(),
            to: Vec2::new(768.0, 192.0),
            elapsed: Duration::ZERO,
            target: MapCoord::new(0, 1),
        };
        let duration = Duration::from_millis(400);
        assert!(!scroll.advance(Duration::from_millis(100), duration, &mut camera));
        assert_eq!(camera.center(), Vec2::new(384.0, 192.0));
        assert!(scroll.advance(Duration::from_millis(300), duration, &mut camera));
        assert_eq!(camera.center(), Vec2::new(768.0, 192.0));
    }
}
