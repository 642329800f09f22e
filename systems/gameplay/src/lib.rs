#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame entry point that sequences every system against the world.
//!
//! A frame runs obstacle timers, the map-transition controller, pickups and
//! building against the player's updated box, weapon strikes and finally
//! creature wandering. Every system emits commands that are applied to the
//! world before the next system reads it.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tilescape_core::{
    BoundingBox, Command, Direction, Effect, EffectSink, Event, Movable, Weapon,
};
use tilescape_system_map_transition::{
    Camera, ControllerConfig, ControllerPhase, MapTransition, TransitionEvent,
};
use tilescape_system_strike::Strikes;
use tilescape_system_wandering::{WanderConfig, Wandering};
use tilescape_world::{apply, query, World};
use tracing::debug;

/// Player input sampled for a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameInput {
    /// Direction the player pushes towards, if any.
    pub movement: Option<Direction>,
    /// Whether the player swings the weapon.
    pub swing: bool,
    /// Whether the player builds the structure piece beneath them.
    pub build: bool,
}

/// Tunables of every system driven by [`Gameplay`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Map-transition controller tunables.
    pub controller: ControllerConfig,
    /// Creature wandering tunables.
    pub wandering: WanderConfig,
}

/// Everything observable that happened during a frame, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameEvent {
    /// Event broadcast by the world.
    World(Event),
    /// Outcome reported by the map-transition controller.
    Transition(TransitionEvent),
}

/// Per-session systems state.
#[derive(Debug)]
pub struct Gameplay {
    transition: MapTransition,
    strikes: Strikes,
    wandering: Wandering,
    facing: Direction,
}

impl Default for Gameplay {
    fn default() -> Self {
        Self::new(GameplayConfig::default())
    }
}

impl Gameplay {
    /// Creates the systems with the provided tunables.
    #[must_use]
    pub fn new(config: GameplayConfig) -> Self {
        Self {
            transition: MapTransition::new(config.controller),
            strikes: Strikes::new(Weapon::default()),
            wandering: Wandering::new(config.wandering),
            facing: Direction::Down,
        }
    }

    /// Direction the player last moved in; swings go this way.
    #[must_use]
    pub const fn facing(&self) -> Direction {
        self.facing
    }

    /// Weapon and pending strikes of the player.
    #[must_use]
    pub const fn strikes(&self) -> &Strikes {
        &self.strikes
    }

    /// Rebuilds the world from its layout and forgets all transient state.
    pub fn reset(&mut self, world: &mut World, camera: &mut Camera, events: &mut Vec<FrameEvent>) {
        let mut world_events = Vec::new();
        apply(world, Command::ResetWorld, &mut world_events);
        events.extend(world_events.into_iter().map(FrameEvent::World));

        self.transition.reset();
        self.strikes.cancel();
        self.wandering.reset();
        self.facing = Direction::Down;
        if let Some(fresh) = Camera::for_world(world) {
            *camera = Camera::new(fresh.center(), camera.viewport());
        }
    }

    /// Runs one frame of `elapsed` simulated time.
    ///
    /// Effects are fired for landed strikes, completed structure pieces and
    /// marker transitions. When the player stands on no tile map the frame
    /// stops after the controller.
    #[allow(clippy::too_many_arguments)]
    pub fn update_map_grid<R: Rng + ?Sized>(
        &mut self,
        world: &mut World,
        elapsed: Duration,
        input: FrameInput,
        camera: &mut Camera,
        rng: &mut R,
        effects: &mut impl EffectSink,
        events: &mut Vec<FrameEvent>,
    ) {
        if let Some(direction) = input.movement {
            self.facing = direction;
        }
        execute(world, vec![Command::Tick { dt: elapsed }], effects, events);

        let mut commands = Vec::new();
        let mut transitions = Vec::new();
        self.transition.handle(
            world,
            elapsed,
            input.movement,
            camera,
            rng,
            &mut commands,
            &mut transitions,
        );
        execute(world, commands, effects, events);

        let mut skipped = false;
        let mut crossed = false;
        for transition in transitions {
            match transition {
                TransitionEvent::FrameSkipped => skipped = true,
                TransitionEvent::MarkerTransition { grid, .. } => {
                    crossed = true;
                    effects.play(Effect::MarkerTransition { grid });
                }
                _ => {}
            }
            events.push(FrameEvent::Transition(transition));
        }
        if skipped {
            return;
        }
        if crossed {
            self.strikes.cancel();
        }

        let player = query::player_bounding_box(world);
        let interactions = interactions(world, player, input.build);
        execute(world, interactions, effects, events);

        let swing = input.swing
            && !crossed
            && self.transition.phase() == ControllerPhase::FreeMovement;
        self.swing(world, elapsed, swing, effects, events);

        let mut commands = Vec::new();
        self.wandering.handle(world, elapsed, rng, &mut commands);
        execute(world, commands, effects, events);
    }

    fn swing(
        &mut self,
        world: &mut World,
        elapsed: Duration,
        begin: bool,
        effects: &mut impl EffectSink,
        events: &mut Vec<FrameEvent>,
    ) {
        let player = query::player_bounding_box(world);
        if begin && self.strikes.begin(player, self.facing) {
            debug!(direction = ?self.facing, "swing_started");
        }
        self.strikes.follow(player);

        let Some(grid) = query::current_tile_grid(world) else {
            return;
        };
        let mut commands = Vec::new();
        let _ = self.strikes.handle(grid, elapsed, &mut commands);
        execute(world, commands, effects, events);
    }
}

/// Pickups of everything the player overlaps, then building if requested.
/// Pickups come first so wood collected this frame can pay for the piece.
fn interactions(world: &World, player: BoundingBox, build: bool) -> Vec<Command> {
    let mut commands = Vec::new();
    let Some(grid) = query::current_tile_grid(world) else {
        return commands;
    };

    for map in grid.maps_overlapping(player) {
        commands.extend(
            map.resources()
                .iter()
                .filter(|resource| resource.bounds().intersects(&player))
                .map(|resource| Command::CollectResource {
                    resource: resource.id(),
                }),
        );
        commands.extend(
            map.creatures()
                .iter()
                .filter(|creature| creature.world_bounding_box().intersects(&player))
                .map(|creature| Command::CollectCreature {
                    creature: creature.id(),
                }),
        );
    }

    if build {
        let piece = grid
            .maps_overlapping(player)
            .flat_map(|map| map.pieces())
            .find(|piece| !piece.is_built() && piece.bounds().intersects(&player));
        if let Some(piece) = piece {
            commands.push(Command::BuildStructurePiece { piece: piece.id() });
        }
    }
    commands
}

fn execute(
    world: &mut World,
    commands: Vec<Command>,
    effects: &mut impl EffectSink,
    events: &mut Vec<FrameEvent>,
) {
    let mut world_events = Vec::new();
    for command in commands {
        apply(world, command, &mut world_events);
    }
    for event in world_events {
        match &event {
            Event::ObstacleShaking { obstacle } => effects.play(Effect::StrikeLanded {
                obstacle: *obstacle,
            }),
            Event::StructurePieceBuilt { piece } => {
                effects.play(Effect::StructureCompleted { piece: *piece });
            }
            _ => {}
        }
        events.push(FrameEvent::World(event));
    }
}
