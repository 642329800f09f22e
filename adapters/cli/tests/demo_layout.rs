use tilescape_system_gameplay::GameplayConfig;
use tilescape_world::{query, World, WorldLayout};

const DEMO: &str = include_str!("../layouts/demo.toml");

#[test]
fn demo_layout_builds_a_two_storey_house() {
    let layout = WorldLayout::from_toml_str(DEMO).expect("demo layout parses");
    let world = World::from_layout(&layout).expect("demo world builds");

    assert_eq!(query::grids(&world).len(), 3);
    assert_eq!(query::stack(&world).len(), 2);
    assert_eq!(query::marker_count(&world), 4);
    assert!(!query::is_interior(&world));
}

#[test]
fn demo_tunables_sit_beside_the_layout() {
    let config: GameplayConfig = toml::from_str(DEMO).expect("tunables parse");
    assert_eq!(config.controller.scroll_ms, 400);
    assert_eq!(config.wandering.heading_ms, 1_500);
}
