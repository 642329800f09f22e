use glam::Vec2;
use tilescape_core::BoundingBox;
use tilescape_world::{query, World};

/// Viewport onto the world. In free movement the camera rests on the center
/// of the map the player occupies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    center: Vec2,
    viewport: Vec2,
}

impl Camera {
    /// Creates a camera looking at `center` with a viewport of `viewport` pixels.
    #[must_use]
    pub const fn new(center: Vec2, viewport: Vec2) -> Self {
        Self { center, viewport }
    }

    /// Camera resting on the map the player currently occupies, sized to one map.
    #[must_use]
    pub fn for_world(world: &World) -> Option<Self> {
        let map = query::current_tile_map(world)?;
        Some(Self::new(map.center(), query::geometry(world).size()))
    }

    /// Point the camera looks at.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        self.center
    }

    /// Size of the visible area in pixels.
    #[must_use]
    pub const fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// World-space region currently visible.
    #[must_use]
    pub fn visible_region(&self) -> BoundingBox {
        BoundingBox::from_origin_and_size(self.center - self.viewport * 0.5, self.viewport)
    }

    /// Moves the camera instantly.
    pub fn center_on(&mut self, center: Vec2) {
        self.center = center;
    }
}
