#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement and collision resolution against tile map grids.
//!
//! Each cardinal axis is resolved on its own: the box is moved by the full
//! displacement on that axis and the move is either accepted unmodified or
//! rejected outright. The resolver never slides an entity along an obstacle
//! and never moves it partially towards a blocked tile.

use std::ops::RangeInclusive;

use glam::Vec2;
use tilescape_core::{BoundingBox, Direction, MovementIntent, TraversalSet};
use tilescape_world::TileMapGrid;

/// Traversal rules of the entity being moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Rules {
    traversable: TraversalSet,
    allow_crossing_solid: bool,
}

/// Resolves `intent` for an entity occupying `bounding_box` and returns the
/// corrected upper-left position.
///
/// A move along an axis is rejected when any tile beneath the leading edge of
/// the moved box is missing or not in `traversable`, or when the moved box
/// overlaps a solid obstacle and `allow_crossing_solid` is `false`.
/// Vector intents resolve their dominant axis first and the remaining axis
/// from the already-resolved box.
#[must_use]
pub fn resolve(
    bounding_box: BoundingBox,
    intent: MovementIntent,
    traversable: TraversalSet,
    allow_crossing_solid: bool,
    grid: &TileMapGrid,
) -> Vec2 {
    let rules = Rules {
        traversable,
        allow_crossing_solid,
    };
    let displacement = intent.displacement();
    if !displacement.is_finite() {
        return bounding_box.origin();
    }

    let steps = if displacement.x.abs() >= displacement.y.abs() {
        [
            (Direction::horizontal(displacement.x), displacement.x.abs()),
            (Direction::vertical(displacement.y), displacement.y.abs()),
        ]
    } else {
        [
            (Direction::vertical(displacement.y), displacement.y.abs()),
            (Direction::horizontal(displacement.x), displacement.x.abs()),
        ]
    };

    steps
        .into_iter()
        .fold(bounding_box, |current, (direction, distance)| match direction {
            Some(direction) => step(current, direction, distance, rules, grid),
            None => current,
        })
        .origin()
}

/// Reports whether every tile beneath `bounding_box` is traversable and, for
/// entities that cannot cross solids, whether it overlaps no solid obstacle.
#[must_use]
pub fn box_is_clear(
    bounding_box: BoundingBox,
    traversable: TraversalSet,
    allow_crossing_solid: bool,
    grid: &TileMapGrid,
) -> bool {
    let rules = Rules {
        traversable,
        allow_crossing_solid,
    };
    let length = grid.geometry().tile_length();
    let columns = span(bounding_box.left(), bounding_box.right(), length);
    let rows = span(bounding_box.top(), bounding_box.bottom(), length);
    let tiles_clear = rows
        .clone()
        .all(|row| columns.clone().all(|column| tile_clear(column, row, rules, grid)));
    tiles_clear && solids_clear(bounding_box, rules, grid)
}

fn step(
    current: BoundingBox,
    direction: Direction,
    distance: f32,
    rules: Rules,
    grid: &TileMapGrid,
) -> BoundingBox {
    let tentative = current.translated(direction.unit() * distance);
    if leading_edge_clear(&tentative, direction, rules, grid)
        && solids_clear(tentative, rules, grid)
    {
        tentative
    } else {
        current
    }
}

fn leading_edge_clear(
    tentative: &BoundingBox,
    direction: Direction,
    rules: Rules,
    grid: &TileMapGrid,
) -> bool {
    let length = grid.geometry().tile_length();
    match direction {
        Direction::Left | Direction::Right => {
            let column = leading_index(tentative.edge(direction), direction, length);
            span(tentative.top(), tentative.bottom(), length)
                .all(|row| tile_clear(column, row, rules, grid))
        }
        Direction::Up | Direction::Down => {
            let row = leading_index(tentative.edge(direction), direction, length);
            span(tentative.left(), tentative.right(), length)
                .all(|column| tile_clear(column, row, rules, grid))
        }
    }
}

/// Global tile index of the leading edge. Right and bottom edges are
/// exclusive, so an edge lying on a tile boundary stays in the earlier tile.
fn leading_index(edge: f32, direction: Direction, length: f32) -> i64 {
    match direction {
        Direction::Left | Direction::Up => (edge / length).floor() as i64,
        Direction::Right | Direction::Down => (edge / length).ceil() as i64 - 1,
    }
}

/// Global tile indices covered by the half-open interval `[start, end)`.
/// Degenerate intervals still cover the tile containing `start`.
fn span(start: f32, end: f32, length: f32) -> RangeInclusive<i64> {
    let first = (start / length).floor() as i64;
    let last = ((end / length).ceil() as i64 - 1).max(first);
    first..=last
}

fn tile_clear(column: i64, row: i64, rules: Rules, grid: &TileMapGrid) -> bool {
    let length = grid.geometry().tile_length();
    let center = Vec2::new((column as f32 + 0.5) * length, (row as f32 + 0.5) * length);
    grid.tile_at(center).is_some_and(|kind| rules.traversable.contains(kind))
}

fn solids_clear(area: BoundingBox, rules: Rules, grid: &TileMapGrid) -> bool {
    rules.allow_crossing_solid || grid.solid_obstacle_intersecting(area).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_index_treats_far_edges_as_exclusive() {
        assert_eq!(leading_index(32.0, Direction::Right, 16.0), 1);
        assert_eq!(leading_index(32.5, Direction::Right, 16.0), 2);
        assert_eq!(leading_index(32.0, Direction::Left, 16.0), 2);
        assert_eq!(leading_index(-0.5, Direction::Up, 16.0), -1);
    }

    #[test]
    fn span_covers_partial_tiles() {
        assert_eq!(span(10.0, 22.0, 16.0), 0..=1);
        assert_eq!(span(16.0, 32.0, 16.0), 1..=1);
        assert_eq!(span(20.0, 20.0, 16.0), 1..=1);
    }
}
