use egui::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer pixel coordinate inside a layer, (0, 0) is the top-left pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PixelPosition {
    pub x: i32,
    pub y: i32,
}

impl PixelPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position of this pixel's top-left corner in pixel units
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    /// Center of the pixel cell in pixel units
    pub fn center(self) -> Vec2 {
        self.to_vec2() + Vec2::splat(0.5)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for PixelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Width and height of a layer in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub x: u32,
    pub y: u32,
}

impl Resolution {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    pub fn is_empty(self) -> bool {
        self.x == 0 || self.y == 0
    }

    pub fn contains(self, position: PixelPosition) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.x
            && (position.y as u32) < self.y
    }

    pub fn pixel_count(self) -> usize {
        self.x as usize * self.y as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(32, 32)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// Maps a normalized canvas position to the space handed to the GPU.
///
/// Identity: the vertex shader performs the [0, 1] to [-1, 1] mapping, so
/// canvas-space values can be stored in shapes unchanged.
pub fn to_gl_position(position: Vec2) -> Vec2 {
    position
}

/// Inverse of [`to_gl_position`].
pub fn from_gl_position(position: Vec2) -> Vec2 {
    position
}

/// Snaps a normalized canvas position to the nearest device pixel.
pub fn align_with_pixel_grid(position: Vec2, canvas_size: Vec2) -> Vec2 {
    if canvas_size.x <= 0.0 || canvas_size.y <= 0.0 {
        return position;
    }

    let in_pixels = position * canvas_size;
    Vec2::new(in_pixels.x.round(), in_pixels.y.round()) / canvas_size
}
