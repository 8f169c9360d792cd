//! # Entity Components
//!
//! Plain-old-data values shared by the pooled entity types.
//! They are `Copy` and zeroable so a reset is a plain overwrite.

use bytemuck::{Pod, Zeroable};

/// Position in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// X coordinate in world space.
    pub x: f32,
    /// Y coordinate in world space (height).
    pub y: f32,
    /// Z coordinate in world space.
    pub z: f32,
    /// Padding for alignment (ensures 16-byte alignment for SIMD).
    pub _padding: f32,
}

impl Position {
    /// The world origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            _padding: 0.0,
        }
    }

    /// Moves the position by `velocity` over `dt` seconds.
    #[inline]
    pub fn advance(&mut self, velocity: Velocity, dt: f32) {
        self.x += velocity.x * dt;
        self.y += velocity.y * dt;
        self.z += velocity.z * dt;
    }
}

/// Velocity in world units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity {
    /// X velocity.
    pub x: f32,
    /// Y velocity.
    pub y: f32,
    /// Z velocity.
    pub z: f32,
    /// Padding for alignment.
    pub _padding: f32,
}

impl Velocity {
    /// At rest.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new velocity.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            _padding: 0.0,
        }
    }
}
