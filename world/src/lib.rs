#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for Tilescape.
//!
//! The world owns every grid, tile map and entity. It only changes through
//! [`apply`], which executes a [`Command`] and reports the outcome as
//! [`Event`] values; systems read it through the [`query`] module.

use std::time::Duration;

use glam::Vec2;
use tilescape_core::{
    BoundingBox, BuildRejection, Command, CreatureId, Event, GridId, Locomotion, MapRef, Movable,
    ObstacleId, PieceId, ResourceId, TileAttributeTable, TileCoord, TileKind, TraversalAttributes,
};
use tracing::{debug, info, warn};

mod entities;
mod grid;
mod layout;
mod markers;
mod tile_map;

pub use entities::{Creature, LooseResource, Obstacle, ObstacleState, Player, StructurePiece};
pub use grid::{LayeredGridStack, TileMapGrid};
pub use layout::{
    CreatureLayout, GridLayout, InteriorLayout, MapLayout, ObstacleLayout, PatchLayout,
    PieceLayout, PlayerLayout, ResourceLayout, WorldBuildError, WorldLayout, CREATURE_SCALE,
};
pub use markers::TransitionMarker;
pub use tile_map::TileMap;

use layout::IdAllocator;

/// Represents the authoritative Tilescape world state.
#[derive(Debug)]
pub struct World {
    layout: WorldLayout,
    attributes: TileAttributeTable,
    grids: Vec<TileMapGrid>,
    stack: LayeredGridStack,
    player: Player,
    ids: IdAllocator,
    wood: u32,
    collected_creatures: u32,
    marker_count: usize,
}

impl World {
    /// Builds a world from its layout using the standard tile attributes.
    pub fn from_layout(layout: &WorldLayout) -> Result<Self, WorldBuildError> {
        Self::with_attributes(layout, TileAttributeTable::standard())
    }

    /// Builds a world from its layout with a custom attribute table.
    pub fn with_attributes(
        layout: &WorldLayout,
        attributes: TileAttributeTable,
    ) -> Result<Self, WorldBuildError> {
        let built = layout::build(layout, &attributes)?;
        let mut grids = built.grids;
        let marker_count = markers::rebuild(&mut grids, &built.stack)?;

        info!(
            grids = grids.len(),
            maps = grids.iter().map(|grid| grid.maps().count()).sum::<usize>(),
            floors = built.stack.len(),
            markers = marker_count,
            "world_built"
        );

        Ok(Self {
            layout: layout.clone(),
            attributes,
            grids,
            stack: built.stack,
            player: built.player,
            ids: built.ids,
            wood: 0,
            collected_creatures: 0,
            marker_count,
        })
    }

    fn grid_mut(&mut self, id: GridId) -> Option<&mut TileMapGrid> {
        self.grids.iter_mut().find(|grid| grid.id() == id)
    }

    fn tile_map_mut(&mut self, map: MapRef) -> Option<&mut TileMap> {
        self.grid_mut(map.grid)
            .and_then(|grid| grid.tile_map_mut(map.map))
    }

    fn maps_mut(&mut self) -> impl Iterator<Item = &mut TileMap> + '_ {
        self.grids.iter_mut().flat_map(|grid| grid.maps_mut())
    }

    fn advance_obstacles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let tile_length = self.layout.geometry.tile_length();
        let mut ids = std::mem::take(&mut self.ids);
        for map in self.maps_mut() {
            let yielded: Vec<(ObstacleId, BoundingBox, u32)> = map
                .obstacles_mut()
                .iter_mut()
                .filter_map(|obstacle| {
                    obstacle
                        .advance(dt)
                        .then(|| (obstacle.id(), obstacle.bounds(), obstacle.yield_amount()))
                })
                .collect();

            for (obstacle, bounds, amount) in yielded {
                let size = Vec2::splat(tile_length * layout::RESOURCE_SCALE);
                let drop = BoundingBox::from_origin_and_size(bounds.center() - size * 0.5, size);
                let resource = ids.resource();
                map.add_resource(LooseResource::new(resource, drop, amount));
                debug!(
                    obstacle = obstacle.get(),
                    resource = resource.get(),
                    "obstacle_yielded"
                );
                out_events.push(Event::ObstacleYielded { obstacle, resource });
            }
        }
        self.ids = ids;
    }

    fn strike_obstacle(&mut self, obstacle: ObstacleId, out_events: &mut Vec<Event>) {
        let struck = self
            .maps_mut()
            .find_map(|map| map.obstacle_mut(obstacle))
            .is_some_and(Obstacle::strike);
        if struck {
            out_events.push(Event::ObstacleShaking { obstacle });
        } else {
            debug!(obstacle = obstacle.get(), "strike_ignored");
        }
    }

    fn collect_resource(&mut self, resource: ResourceId, out_events: &mut Vec<Event>) {
        let Some(taken) = self.maps_mut().find_map(|map| map.take_resource(resource)) else {
            warn!(resource = resource.get(), "collect_missing_resource");
            return;
        };
        self.wood = self.wood.saturating_add(taken.amount());
        out_events.push(Event::ResourceCollected {
            resource,
            amount: taken.amount(),
        });
    }

    fn collect_creature(&mut self, creature: CreatureId, out_events: &mut Vec<Event>) {
        if self
            .maps_mut()
            .find_map(|map| map.take_creature(creature))
            .is_none()
        {
            warn!(creature = creature.get(), "collect_missing_creature");
            return;
        }
        self.collected_creatures = self.collected_creatures.saturating_add(1);
        out_events.push(Event::CreatureCollected { creature });
    }

    fn build_piece(&mut self, piece: PieceId, out_events: &mut Vec<Event>) {
        let wood = self.wood;
        let outcome = match self.maps_mut().find_map(|map| map.piece_mut(piece)) {
            None => Err(BuildRejection::MissingPiece),
            Some(target) if target.is_built() => Err(BuildRejection::AlreadyBuilt),
            Some(target) if target.cost() > wood => Err(BuildRejection::InsufficientWood {
                required: target.cost(),
                available: wood,
            }),
            Some(target) => {
                target.mark_built();
                Ok(target.cost())
            }
        };

        match outcome {
            Ok(cost) => {
                self.wood -= cost;
                info!(piece = piece.get(), cost, wood = self.wood, "structure_piece_built");
                out_events.push(Event::StructurePieceBuilt { piece });
            }
            Err(reason) => {
                debug!(piece = piece.get(), ?reason, "structure_piece_rejected");
                out_events.push(Event::StructurePieceRejected { piece, reason });
            }
        }
    }

    fn spawn_creature(
        &mut self,
        map: MapRef,
        locomotion: Locomotion,
        position: Vec2,
        out_events: &mut Vec<Event>,
    ) {
        let size = Vec2::splat(self.layout.geometry.tile_length() * CREATURE_SCALE);
        let creature = self.ids.creature();
        let Some(owner) = self.tile_map_mut(map) else {
            debug_assert!(false, "creature spawned into missing map {map:?}");
            warn!(grid = map.grid.get(), "spawn_into_missing_map");
            return;
        };
        owner.add_creature(Creature::new(
            creature,
            BoundingBox::from_origin_and_size(position, size),
            locomotion,
        ));
        debug!(creature = creature.get(), ?locomotion, "creature_spawned");
        out_events.push(Event::CreatureSpawned { creature, map });
    }

    fn move_creature(&mut self, creature: CreatureId, position: Vec2, out_events: &mut Vec<Event>) {
        let Some(target) = self.maps_mut().find_map(|map| map.creature_mut(creature)) else {
            return;
        };
        let from = target.world_bounding_box().origin();
        target.set_world_position(position);
        out_events.push(Event::CreatureMoved {
            creature,
            from,
            to: position,
        });
    }

    fn replace_tile(
        &mut self,
        map: MapRef,
        tile: TileCoord,
        kind: TileKind,
        out_events: &mut Vec<Event>,
    ) {
        let rejected = Event::TileReplacementRejected { map, tile, kind };
        let structure_only = self.attributes.is_structure_only(kind);
        let interior = self.stack.contains(map.grid);
        if structure_only && !interior {
            warn!(grid = map.grid.get(), ?kind, "structure_tile_outside_structure");
            out_events.push(rejected);
            return;
        }

        let Some(previous) = self
            .tile_map_mut(map)
            .and_then(|owner| owner.set_tile(tile, kind))
        else {
            warn!(grid = map.grid.get(), ?tile, "replace_missing_tile");
            out_events.push(rejected);
            return;
        };

        match markers::rebuild(&mut self.grids, &self.stack) {
            Ok(count) => {
                self.marker_count = count;
                debug!(grid = map.grid.get(), ?tile, ?kind, markers = count, "tile_replaced");
                out_events.push(Event::TileReplaced {
                    map,
                    tile,
                    kind,
                    markers: count,
                });
            }
            Err(error) => {
                warn!(error = %error, "tile_replacement_reverted");
                if let Some(owner) = self.tile_map_mut(map) {
                    let _ = owner.set_tile(tile, previous);
                }
                match markers::rebuild(&mut self.grids, &self.stack) {
                    Ok(count) => self.marker_count = count,
                    Err(error) => warn!(error = %error, "marker_restore_failed"),
                }
                out_events.push(rejected);
            }
        }
    }

    fn reset(&mut self, out_events: &mut Vec<Event>) {
        match Self::with_attributes(&self.layout, self.attributes.clone()) {
            Ok(fresh) => {
                *self = fresh;
                info!("world_reset");
                out_events.push(Event::WorldReset);
            }
            Err(error) => warn!(error = %error, "world_reset_failed"),
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            world.advance_obstacles(dt, out_events);
        }
        Command::MovePlayer { position } => {
            let from = world.player.world_bounding_box().origin();
            world.player.set_world_position(position);
            out_events.push(Event::PlayerMoved { from, to: position });
        }
        Command::EnterGrid { grid, position } => {
            if world.grids.iter().all(|candidate| candidate.id() != grid) {
                warn!(grid = grid.get(), "enter_unknown_grid");
                return;
            }
            world.player.set_grid(grid);
            world.player.set_world_position(position);
            info!(grid = grid.get(), x = position.x, y = position.y, "grid_entered");
            out_events.push(Event::GridEntered { grid, position });
        }
        Command::StrikeObstacle { obstacle } => world.strike_obstacle(obstacle, out_events),
        Command::CollectResource { resource } => world.collect_resource(resource, out_events),
        Command::CollectCreature { creature } => world.collect_creature(creature, out_events),
        Command::BuildStructurePiece { piece } => world.build_piece(piece, out_events),
        Command::SpawnCreature {
            map,
            locomotion,
            position,
        } => world.spawn_creature(map, locomotion, position, out_events),
        Command::MoveCreature { creature, position } => {
            world.move_creature(creature, position, out_events);
        }
        Command::ReplaceTile { map, tile, kind } => world.replace_tile(map, tile, kind, out_events),
        Command::ResetWorld => world.reset(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use tilescape_core::{
        BoundingBox, GridId, MapGeometry, MapRef, Movable, StructurePieceSnapshot,
        TileAttributeTable,
    };

    use super::{LayeredGridStack, TileMap, TileMapGrid, World};

    /// Bounding box of the player in world space.
    #[must_use]
    pub fn player_bounding_box(world: &World) -> BoundingBox {
        world.player.world_bounding_box()
    }

    /// Grid the player currently occupies.
    #[must_use]
    pub fn current_grid(world: &World) -> GridId {
        world.player.grid()
    }

    /// Grid with the provided identifier.
    #[must_use]
    pub fn grid(world: &World, id: GridId) -> Option<&TileMapGrid> {
        world.grids.iter().find(|grid| grid.id() == id)
    }

    /// Grid the player currently occupies.
    #[must_use]
    pub fn current_tile_grid(world: &World) -> Option<&TileMapGrid> {
        grid(world, current_grid(world))
    }

    /// Tile map under the center of the player's bounding box.
    #[must_use]
    pub fn current_tile_map(world: &World) -> Option<&TileMap> {
        let center = player_bounding_box(world).center();
        current_tile_grid(world).and_then(|grid| grid.tile_map_at(center))
    }

    /// Tile map referenced by `map`.
    #[must_use]
    pub fn tile_map(world: &World, map: MapRef) -> Option<&TileMap> {
        grid(world, map.grid).and_then(|grid| grid.tile_map(map.map))
    }

    /// Every grid in identifier order.
    #[must_use]
    pub fn grids(world: &World) -> &[TileMapGrid] {
        &world.grids
    }

    /// Interior floors and the exterior they open onto.
    #[must_use]
    pub fn stack(world: &World) -> &LayeredGridStack {
        &world.stack
    }

    /// Reports whether the player is inside a building.
    #[must_use]
    pub fn is_interior(world: &World) -> bool {
        world.stack.contains(current_grid(world))
    }

    /// Traversal attributes used by the world.
    #[must_use]
    pub fn attributes(world: &World) -> &TileAttributeTable {
        &world.attributes
    }

    /// Tile layout shared by every map.
    #[must_use]
    pub fn geometry(world: &World) -> MapGeometry {
        world.layout.geometry
    }

    /// Wood currently held.
    #[must_use]
    pub fn wood(world: &World) -> u32 {
        world.wood
    }

    /// Number of creatures collected so far.
    #[must_use]
    pub fn collected_creatures(world: &World) -> u32 {
        world.collected_creatures
    }

    /// Number of transition markers across all grids.
    #[must_use]
    pub fn marker_count(world: &World) -> usize {
        world.marker_count
    }

    /// Build state of every structure piece, ordered by grid and slot.
    #[must_use]
    pub fn structure_pieces(world: &World) -> Vec<StructurePieceSnapshot> {
        world
            .grids
            .iter()
            .flat_map(|grid| grid.maps())
            .flat_map(|map| {
                map.pieces().iter().map(|piece| StructurePieceSnapshot {
                    id: piece.id(),
                    map: map.map_ref(),
                    built: piece.is_built(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilescape_core::{MapCoord, MapGeometry};

    const BUILDING: &str = r#"
        obstacle_shake_ms = 500

        [geometry]
        columns = 8
        rows = 6
        tile_length = 16.0

        [player]
        grid = "outside"
        map_row = 0
        map_column = 0
        column = 1
        row = 1

        [interior]
        exterior = "outside"
        floors = ["ground"]

        [[grids]]
        name = "outside"
        rows = 1
        columns = 1

        [[grids.maps]]
        row = 0
        column = 0
        patches = [{ column = 3, row = 2, tile = "D" }]
        obstacles = [{ column = 6, row = 1, yield_amount = 3 }]
        resources = [{ column = 2, row = 4, amount = 2 }]
        pieces = [{ column = 5, row = 4, cost = 4 }]
        creatures = [{ column = 0, row = 5, locomotion = "walking" }]

        [[grids]]
        name = "ground"
        rows = 1
        columns = 1

        [[grids.maps]]
        row = 0
        column = 0
        fill = "_"
        patches = [{ column = 4, row = 5, tile = "E" }]
    "#;

    const OUTSIDE: MapRef = MapRef::new(GridId::new(0), MapCoord::new(0, 0));

    fn world() -> World {
        let layout = WorldLayout::from_toml_str(BUILDING).expect("layout parses");
        World::from_layout(&layout).expect("world builds")
    }

    fn outside(world: &World) -> &TileMap {
        query::tile_map(world, OUTSIDE).expect("outside map")
    }

    #[test]
    fn geometry_matches_layout() {
        let world = world();
        assert_eq!(query::geometry(&world), MapGeometry::new(8, 6, 16.0));
        assert_eq!(query::marker_count(&world), 2);
        assert!(!query::is_interior(&world));
    }

    #[test]
    fn tick_yields_struck_obstacles_once() {
        let mut world = world();
        let obstacle = outside(&world).obstacles()[0].id();
        let mut events = Vec::new();

        apply(&mut world, Command::StrikeObstacle { obstacle }, &mut events);
        apply(&mut world, Command::StrikeObstacle { obstacle }, &mut events);
        assert_eq!(events, vec![Event::ObstacleShaking { obstacle }]);

        events.clear();
        apply(&mut world, Command::Tick { dt: Duration::from_millis(500) }, &mut events);
        assert!(matches!(
            events[1],
            Event::ObstacleYielded { obstacle: yielded, .. } if yielded == obstacle
        ));
        assert_eq!(outside(&world).resources().len(), 2);

        events.clear();
        apply(&mut world, Command::Tick { dt: Duration::from_millis(500) }, &mut events);
        assert_eq!(events.len(), 1, "only TimeAdvanced");
    }

    #[test]
    fn building_spends_collected_wood() {
        let mut world = world();
        let resource = outside(&world).resources()[0].id();
        let piece = outside(&world).pieces()[0].id();
        let mut events = Vec::new();

        apply(&mut world, Command::BuildStructurePiece { piece }, &mut events);
        assert_eq!(
            events.pop(),
            Some(Event::StructurePieceRejected {
                piece,
                reason: BuildRejection::InsufficientWood {
                    required: 4,
                    available: 0
                }
            })
        );

        apply(&mut world, Command::CollectResource { resource }, &mut events);
        assert_eq!(query::wood(&world), 2);
        apply(&mut world, Command::CollectResource { resource }, &mut events);
        assert_eq!(query::wood(&world), 2, "resources are collected once");

        world.wood = 5;
        events.clear();
        apply(&mut world, Command::BuildStructurePiece { piece }, &mut events);
        apply(&mut world, Command::BuildStructurePiece { piece }, &mut events);
        assert_eq!(
            events,
            vec![
                Event::StructurePieceBuilt { piece },
                Event::StructurePieceRejected {
                    piece,
                    reason: BuildRejection::AlreadyBuilt
                },
            ]
        );
        assert_eq!(query::wood(&world), 1);
        assert!(query::structure_pieces(&world)[0].built);
    }

    #[test]
    fn closing_the_door_rebuilds_markers() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ReplaceTile {
                map: OUTSIDE,
                tile: TileCoord::new(3, 2),
                kind: TileKind::DoorClosed,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::TileReplaced {
                map: OUTSIDE,
                tile: TileCoord::new(3, 2),
                kind: TileKind::DoorClosed,
                markers: 0,
            }]
        );
        assert!(outside(&world).markers().is_empty());
    }

    #[test]
    fn replacements_that_orphan_a_connector_are_reverted() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ReplaceTile {
                map: OUTSIDE,
                tile: TileCoord::new(3, 2),
                kind: TileKind::Grass,
            },
            &mut events,
        );
        assert!(matches!(events[0], Event::TileReplacementRejected { .. }));
        assert_eq!(outside(&world).tile(TileCoord::new(3, 2)), Some(TileKind::Door));
        assert_eq!(query::marker_count(&world), 2);
    }

    #[test]
    fn structure_tiles_cannot_be_placed_outdoors() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ReplaceTile {
                map: OUTSIDE,
                tile: TileCoord::new(0, 0),
                kind: TileKind::Wall,
            },
            &mut events,
        );
        assert!(matches!(events[0], Event::TileReplacementRejected { .. }));
        assert_eq!(outside(&world).tile(TileCoord::new(0, 0)), Some(TileKind::Grass));
    }

    #[test]
    fn entering_a_grid_moves_the_player() {
        let mut world = world();
        let mut events = Vec::new();
        let position = Vec2::new(40.0, 60.0);
        apply(
            &mut world,
            Command::EnterGrid {
                grid: GridId::new(1),
                position,
            },
            &mut events,
        );
        assert_eq!(query::current_grid(&world), GridId::new(1));
        assert!(query::is_interior(&world));
        assert_eq!(query::player_bounding_box(&world).origin(), position);

        events.clear();
        apply(
            &mut world,
            Command::EnterGrid {
                grid: GridId::new(9),
                position: Vec2::ZERO,
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(query::current_grid(&world), GridId::new(1));
    }

    #[test]
    fn creatures_spawn_move_and_get_collected() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnCreature {
                map: OUTSIDE,
                locomotion: Locomotion::Swimming,
                position: Vec2::new(30.0, 30.0),
            },
            &mut events,
        );
        let Some(Event::CreatureSpawned { creature, .. }) = events.pop() else {
            panic!("expected a spawn event");
        };
        assert_eq!(outside(&world).creatures().len(), 2);

        apply(
            &mut world,
            Command::MoveCreature {
                creature,
                position: Vec2::new(34.0, 30.0),
            },
            &mut events,
        );
        assert_eq!(
            events.pop(),
            Some(Event::CreatureMoved {
                creature,
                from: Vec2::new(30.0, 30.0),
                to: Vec2::new(34.0, 30.0),
            })
        );

        apply(&mut world, Command::CollectCreature { creature }, &mut events);
        assert_eq!(query::collected_creatures(&world), 1);
        assert_eq!(outside(&world).creatures().len(), 1);
    }

    #[test]
    fn reset_restores_the_layout() {
        let mut world = world();
        let resource = outside(&world).resources()[0].id();
        let mut events = Vec::new();
        apply(&mut world, Command::CollectResource { resource }, &mut events);
        apply(
            &mut world,
            Command::MovePlayer {
                position: Vec2::new(90.0, 10.0),
            },
            &mut events,
        );

        events.clear();
        apply(&mut world, Command::ResetWorld, &mut events);
        assert_eq!(events, vec![Event::WorldReset]);
        assert_eq!(query::wood(&world), 0);
        assert_eq!(outside(&world).resources().len(), 1);
        assert_eq!(query::player_bounding_box(&world).center(), Vec2::new(24.0, 24.0));
    }
}
