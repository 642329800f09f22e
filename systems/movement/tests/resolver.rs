use std::time::Duration;

use glam::Vec2;
use tilescape_core::{
    BoundingBox, Direction, GridId, MapCoord, MapGeometry, MovementIntent, ObstacleId,
    TileAttributeTable, TileCoord, TileKind, TraversalSet,
};
use tilescape_system_movement::{box_is_clear, resolve};
use tilescape_world::{Obstacle, TileMap, TileMapGrid};

const GRID: GridId = GridId::new(0);

fn meadow(columns: u32) -> TileMapGrid {
    let geometry = MapGeometry::default();
    let mut grid = TileMapGrid::new(GRID, 1, columns.max(1), geometry);
    for column in 0..columns {
        let _ = grid.insert(TileMap::filled(
            GRID,
            MapCoord::new(0, column),
            geometry,
            TileKind::Grass,
        ));
    }
    grid
}

fn paint(grid: &mut TileMapGrid, tile: TileCoord, kind: TileKind) {
    let map = grid.tile_map_mut(MapCoord::new(0, 0)).expect("first map");
    let _ = map.set_tile(tile, kind);
}

fn entity(origin: Vec2) -> BoundingBox {
    BoundingBox::from_origin_and_size(origin, Vec2::splat(12.0))
}

fn walking() -> TraversalSet {
    TraversalSet::walking(&TileAttributeTable::standard())
}

fn step(direction: Direction, pixels: f32) -> MovementIntent {
    MovementIntent::Directional {
        direction,
        speed: pixels * 4.0,
        elapsed: Duration::from_millis(250),
    }
}

#[test]
fn water_blocks_walkers_but_not_amphibians() {
    let mut grid = meadow(1);
    paint(&mut grid, TileCoord::new(5, 5), TileKind::Water);
    let start = Vec2::new(66.0, 82.0);

    let grass_only = TraversalSet::from_kinds(&[TileKind::Grass]);
    assert_eq!(
        resolve(entity(start), step(Direction::Right, 4.0), grass_only, false, &grid),
        start
    );

    let amphibious = TraversalSet::from_kinds(&[TileKind::Grass, TileKind::Water]);
    assert_eq!(
        resolve(entity(start), step(Direction::Right, 4.0), amphibious, false, &grid),
        Vec2::new(70.0, 82.0)
    );
}

#[test]
fn rejected_moves_are_idempotent() {
    let mut grid = meadow(1);
    paint(&mut grid, TileCoord::new(5, 5), TileKind::Water);
    let intent = step(Direction::Right, 4.0);

    let first = resolve(entity(Vec2::new(66.0, 82.0)), intent, walking(), false, &grid);
    let second = resolve(entity(first), intent, walking(), false, &grid);
    assert_eq!(first, second);
}

#[test]
fn moves_never_slide_partially_towards_a_blocked_tile() {
    let mut grid = meadow(1);
    paint(&mut grid, TileCoord::new(5, 5), TileKind::Rock);
    let start = Vec2::new(60.0, 82.0);

    let resolved = resolve(entity(start), step(Direction::Right, 10.0), walking(), false, &grid);
    assert_eq!(resolved, start, "the whole step is rejected, not shortened");
}

#[test]
fn up_and_down_resolve_symmetrically() {
    let mut grid = meadow(1);
    paint(&mut grid, TileCoord::new(4, 3), TileKind::Rock);
    paint(&mut grid, TileCoord::new(4, 7), TileKind::Rock);
    let start = Vec2::new(66.0, 82.0);

    let up = resolve(entity(start), step(Direction::Up, 4.0), walking(), false, &grid);
    let down = resolve(entity(start), step(Direction::Down, 4.0), walking(), false, &grid);
    assert_eq!(up, Vec2::new(66.0, 78.0));
    assert_eq!(down, Vec2::new(66.0, 86.0));

    assert_eq!(resolve(entity(start), step(Direction::Up, 20.0), walking(), false, &grid), start);
    assert_eq!(resolve(entity(start), step(Direction::Down, 20.0), walking(), false, &grid), start);

    let there = resolve(entity(start), step(Direction::Down, 4.0), walking(), false, &grid);
    let back = resolve(entity(there), step(Direction::Up, 4.0), walking(), false, &grid);
    assert_eq!(back, start);
}

#[test]
fn solid_obstacles_block_unless_crossable() {
    let mut grid = meadow(1);
    let map = grid.tile_map_mut(MapCoord::new(0, 0)).expect("map");
    let tree = map.tile_bounds(TileCoord::new(6, 5));
    map.add_obstacle(Obstacle::new(ObstacleId::new(0), tree, 1, Duration::from_millis(500)));
    let start = Vec2::new(82.0, 82.0);

    assert_eq!(
        resolve(entity(start), step(Direction::Right, 4.0), walking(), false, &grid),
        start
    );
    assert_eq!(
        resolve(entity(start), step(Direction::Right, 4.0), walking(), true, &grid),
        Vec2::new(86.0, 82.0)
    );
}

#[test]
fn touching_an_obstacle_edge_is_allowed() {
    let mut grid = meadow(1);
    let map = grid.tile_map_mut(MapCoord::new(0, 0)).expect("map");
    let tree = map.tile_bounds(TileCoord::new(6, 5));
    map.add_obstacle(Obstacle::new(ObstacleId::new(0), tree, 1, Duration::from_millis(500)));

    let start = entity(Vec2::new(80.0, 82.0));
    let resolved = resolve(start, step(Direction::Right, 4.0), walking(), false, &grid);
    assert_eq!(resolved, Vec2::new(84.0, 82.0), "right edge lands exactly on the tree's left edge");
}

#[test]
fn vector_intents_resolve_each_axis_independently() {
    let mut grid = meadow(1);
    paint(&mut grid, TileCoord::new(5, 5), TileKind::Water);
    let intent = MovementIntent::Vector {
        displacement: Vec2::new(4.0, 2.0),
    };

    let resolved = resolve(entity(Vec2::new(66.0, 82.0)), intent, walking(), false, &grid);
    assert_eq!(resolved, Vec2::new(66.0, 84.0), "x is blocked, y still applies");
}

#[test]
fn movement_continues_across_populated_maps_only() {
    let grid = meadow(2);
    let near_seam = Vec2::new(498.0, 100.0);
    assert_eq!(
        resolve(entity(near_seam), step(Direction::Right, 8.0), walking(), false, &grid),
        Vec2::new(506.0, 100.0)
    );

    let lonely = meadow(1);
    assert_eq!(
        resolve(entity(near_seam), step(Direction::Right, 8.0), walking(), false, &lonely),
        near_seam,
        "no map beyond the boundary"
    );
    assert_eq!(
        resolve(
            entity(Vec2::new(2.0, 100.0)),
            step(Direction::Left, 4.0),
            walking(),
            false,
            &lonely,
        ),
        Vec2::new(2.0, 100.0)
    );
}

#[test]
fn box_is_clear_checks_the_whole_footprint() {
    let mut grid = meadow(1);
    paint(&mut grid, TileCoord::new(5, 5), TileKind::Water);

    assert!(box_is_clear(entity(Vec2::new(40.0, 40.0)), walking(), false, &grid));
    assert!(!box_is_clear(entity(Vec2::new(84.0, 84.0)), walking(), false, &grid));
    assert!(!box_is_clear(entity(Vec2::new(-4.0, 40.0)), walking(), false, &grid));
}
