use std::time::Duration;

use glam::Vec2;
use tilescape_core::{
    BoundingBox, Command, Direction, GridId, MapCoord, MapGeometry, ObstacleId, SwingTiming,
    TileCoord, TileKind, Weapon,
};
use tilescape_system_strike::{resolve_strikes, ActiveStrike, Strikes};
use tilescape_world::{query, Obstacle, TileMap, TileMapGrid, World, WorldLayout};

const GRID: GridId = GridId::new(0);
const WIND_UP: Duration = Duration::from_millis(120);

fn grid_with_trees(trees: &[(u32, TileCoord)]) -> TileMapGrid {
    let geometry = MapGeometry::default();
    let mut grid = TileMapGrid::new(GRID, 1, 2, geometry);
    for column in 0..2 {
        let _ = grid.insert(TileMap::filled(
            GRID,
            MapCoord::new(0, column),
            geometry,
            TileKind::Grass,
        ));
    }
    let map = grid.tile_map_mut(MapCoord::new(0, 0)).expect("map");
    for (id, tile) in trees {
        let bounds = map.tile_bounds(*tile);
        map.add_obstacle(Obstacle::new(
            ObstacleId::new(*id),
            bounds,
            1,
            Duration::from_millis(400),
        ));
    }
    grid
}

/// Holder standing just left of tile (6, 5), facing it.
fn holder() -> BoundingBox {
    BoundingBox::from_origin_and_size(Vec2::new(82.0, 82.0), Vec2::splat(12.0))
}

fn strike_count(commands: &[Command]) -> usize {
    commands
        .iter()
        .filter(|command| matches!(command, Command::StrikeObstacle { .. }))
        .count()
}

#[test]
fn winding_up_strikes_are_skipped() {
    let grid = grid_with_trees(&[(0, TileCoord::new(6, 5))]);
    let mut strikes = Strikes::new(Weapon::default());
    assert!(strikes.begin(holder(), Direction::Right));

    let mut commands = Vec::new();
    let report = strikes.handle(&grid, Duration::from_millis(60), &mut commands);
    assert!(commands.is_empty());
    assert_eq!(report.consumed, 0);
    assert_eq!(strikes.active().len(), 1);
}

#[test]
fn a_swing_lands_at_most_once() {
    let grid = grid_with_trees(&[(0, TileCoord::new(6, 5)), (1, TileCoord::new(6, 5))]);
    let mut strikes = Strikes::new(Weapon::default());
    assert!(strikes.begin(holder(), Direction::Right));

    let mut commands = Vec::new();
    let report = strikes.handle(&grid, WIND_UP, &mut commands);
    assert_eq!(report.landed, vec![ObstacleId::new(0)]);
    assert_eq!(report.consumed, 1);

    for _ in 0..10 {
        let _ = strikes.handle(&grid, Duration::from_millis(16), &mut commands);
    }
    assert_eq!(strike_count(&commands), 1);
    assert!(strikes.active().is_empty());
}

#[test]
fn a_new_swing_waits_for_the_weapon_to_rest() {
    let grid = grid_with_trees(&[(0, TileCoord::new(6, 5))]);
    let mut strikes = Strikes::new(Weapon::default());
    assert!(strikes.begin(holder(), Direction::Right));

    let mut commands = Vec::new();
    let _ = strikes.handle(&grid, WIND_UP, &mut commands);
    assert!(!strikes.begin(holder(), Direction::Right), "still retracting");

    let _ = strikes.handle(&grid, Duration::from_millis(180), &mut commands);
    assert!(strikes.begin(holder(), Direction::Right));
}

#[test]
fn misses_expire_silently() {
    let grid = grid_with_trees(&[(0, TileCoord::new(6, 5))]);
    let mut strikes = Strikes::new(Weapon::default());
    assert!(strikes.begin(holder(), Direction::Left));

    let mut commands = Vec::new();
    let _ = strikes.handle(&grid, WIND_UP, &mut commands);
    let report = strikes.handle(&grid, Duration::from_millis(180), &mut commands);
    assert!(commands.is_empty());
    assert_eq!(report.consumed, 1);
    assert!(report.landed.is_empty());
}

#[test]
fn only_idle_obstacles_are_struck() {
    let layout = WorldLayout::from_toml_str(
        r#"
        [player]
        grid = "meadow"
        map_row = 0
        map_column = 0
        column = 5
        row = 5

        [[grids]]
        name = "meadow"
        rows = 1
        columns = 1

        [[grids.maps]]
        row = 0
        column = 0
        obstacles = [{ column = 6, row = 5 }]
        "#,
    )
    .expect("layout");
    let mut world = World::from_layout(&layout).expect("world");
    let swinger = query::player_bounding_box(&world);

    let mut commands = Vec::new();
    let mut first = Strikes::new(Weapon::default());
    assert!(first.begin(swinger, Direction::Right));
    let grid = query::current_tile_grid(&world).expect("grid");
    let _ = first.handle(grid, WIND_UP, &mut commands);
    assert_eq!(strike_count(&commands), 1);

    let mut events = Vec::new();
    for command in commands.drain(..) {
        tilescape_world::apply(&mut world, command, &mut events);
    }

    let mut second = vec![ActiveStrike::new(swinger, extended_weapon())];
    let grid = query::current_tile_grid(&world).expect("grid");
    let report = resolve_strikes(grid, &mut second, &mut commands);
    assert!(report.landed.is_empty(), "shaking obstacles cannot be struck again");
    assert_eq!(second.len(), 1);
}

#[test]
fn strikes_only_reach_the_swingers_map() {
    let grid = grid_with_trees(&[]);
    let mut far_side = grid.clone();
    let map = far_side.tile_map_mut(MapCoord::new(0, 1)).expect("second map");
    let bounds = map.tile_bounds(TileCoord::new(0, 5));
    map.add_obstacle(Obstacle::new(ObstacleId::new(9), bounds, 1, Duration::from_millis(400)));

    // Holder hugs the seam from the left; the blade pokes into the next map.
    let swinger = BoundingBox::from_origin_and_size(Vec2::new(499.0, 82.0), Vec2::splat(12.0));
    let mut strikes = vec![ActiveStrike::new(swinger, extended_weapon())];
    let mut commands = Vec::new();
    let report = resolve_strikes(&far_side, &mut strikes, &mut commands);
    assert!(report.landed.is_empty());
    assert!(commands.is_empty());
}

fn extended_weapon() -> Weapon {
    let mut weapon = Weapon::new(SwingTiming::default(), 14.0, 10.0);
    assert!(weapon.begin_swing(Direction::Right));
    weapon.advance(WIND_UP);
    weapon
}
