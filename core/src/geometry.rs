//! Axis-aligned bounding boxes expressed in world pixels.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Direction;

/// Axis-aligned rectangle in world space with `y` growing downwards.
///
/// Tile sampling treats the box as half-open: a right edge lying exactly on a
/// tile boundary does not reach into the next tile. Intersection tests are
/// strict, so boxes that merely share an edge never overlap.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl BoundingBox {
    /// Creates a box from its four edges.
    #[must_use]
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a box anchored at `origin` (upper-left corner) with the given size.
    #[must_use]
    pub fn from_origin_and_size(origin: Vec2, size: Vec2) -> Self {
        Self::new(origin.x, origin.y, origin.x + size.x, origin.y + size.y)
    }

    /// Left edge.
    #[must_use]
    pub const fn left(&self) -> f32 {
        self.left
    }

    /// Top edge.
    #[must_use]
    pub const fn top(&self) -> f32 {
        self.top
    }

    /// Right edge.
    #[must_use]
    pub const fn right(&self) -> f32 {
        self.right
    }

    /// Bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> f32 {
        self.bottom
    }

    /// Upper-left corner, which doubles as the owning entity's world position.
    #[must_use]
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }

    /// Width and height of the box.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Geometric center of the box.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.left + self.right) * 0.5,
            (self.top + self.bottom) * 0.5,
        )
    }

    /// Returns the box shifted by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self::new(
            self.left + offset.x,
            self.top + offset.y,
            self.right + offset.x,
            self.bottom + offset.y,
        )
    }

    /// Returns a box of the same size whose upper-left corner sits at `origin`.
    #[must_use]
    pub fn with_origin(&self, origin: Vec2) -> Self {
        Self::from_origin_and_size(origin, self.size())
    }

    /// Reports whether the interiors of the two boxes overlap.
    #[must_use]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Reports whether `point` lies inside the half-open box.
    #[must_use]
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }

    /// Reports whether `other` lies entirely within this box (edges may touch).
    #[must_use]
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
    }

    /// Coordinate of the edge facing `direction`.
    #[must_use]
    pub const fn edge(&self, direction: Direction) -> f32 {
        match direction {
            Direction::Up => self.top,
            Direction::Down => self.bottom,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    /// Reports whether this box pokes out of `bounds` on the side facing `direction`.
    #[must_use]
    pub fn exceeds(&self, bounds: &BoundingBox, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.top < bounds.top,
            Direction::Down => self.bottom > bounds.bottom,
            Direction::Left => self.left < bounds.left,
            Direction::Right => self.right > bounds.right,
        }
    }
}
