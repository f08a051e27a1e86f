//! River Runner - entity lifecycle and collision core for an endless river flight game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pools, collisions, craft, session)
//! - `tuning`: Data-driven game balance

pub mod sim;
pub mod tuning;

pub use tuning::{Tuning, TuningError};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed frame step used by the headless runner (60 Hz)
    pub const FRAME_DT: f32 = 1.0 / 60.0;

    /// Height of the water surface
    pub const WATER_LEVEL: f32 = 0.0;
    /// Splash effects spawn slightly above the water
    pub const SPLASH_HEIGHT: f32 = 0.1;
    /// Craft flying below this height throws up spray
    pub const LOW_FLIGHT_HEIGHT: f32 = 2.0;
    /// Per-frame chance of spray while flying low
    pub const LOW_FLIGHT_SPLASH_CHANCE: f32 = 0.05;

    /// Island cylinder: base radius is this multiple of the island size
    pub const ISLAND_BASE_FACTOR: f32 = 1.2;
    pub const ISLAND_HEIGHT: f32 = 0.5;
    /// Island sizes are drawn from this range when the pool is built
    pub const ISLAND_MIN_SIZE: f32 = 0.5;
    pub const ISLAND_MAX_SIZE: f32 = 2.0;

    /// Bridge deck depth along the river
    pub const BRIDGE_DEPTH: f32 = 2.0;
    pub const BRIDGE_MIN_HEIGHT: f32 = 3.0;
    pub const BRIDGE_MAX_HEIGHT: f32 = 5.0;

    /// Fuel canister box (tank on its side plus cap)
    pub const FUEL_WIDTH: f32 = 1.0;
    pub const FUEL_HEIGHT: f32 = 1.0;
    pub const FUEL_DEPTH: f32 = 1.3;
    pub const FUEL_RADIUS: f32 = 1.0;
    /// Bob motion (radians/s of the sine argument, units of amplitude)
    pub const FUEL_BOB_SPEED: f32 = 0.5;
    pub const FUEL_BOB_HEIGHT: f32 = 0.2;
    /// Spin about the vertical axis (radians/s)
    pub const FUEL_SPIN_SPEED: f32 = 0.6;

    /// Craft collision box half extents (wingspan, fuselage + fin, nose to tail)
    pub const CRAFT_HALF_WIDTH: f32 = 1.5;
    pub const CRAFT_HALF_HEIGHT: f32 = 0.6;
    pub const CRAFT_HALF_DEPTH: f32 = 1.2;
    pub const CRAFT_RADIUS: f32 = 1.0;
    /// Craft start position
    pub const CRAFT_START_Y: f32 = 1.0;
    /// Forward distance covered per unit of speed per second
    pub const CRAFT_FORWARD_SCALE: f32 = 10.0;

    /// Explosion particle lifetime (seconds)
    pub const EXPLOSION_LIFETIME: f32 = 1.0;
    /// Explosion point light lifetime (seconds)
    pub const EXPLOSION_FLASH: f32 = 0.2;
    /// Water splash particle lifetime (seconds)
    pub const SPLASH_LIFETIME: f32 = 0.8;
}

/// World-space forward direction (the craft flies toward -Z)
pub const FORWARD: Vec3 = Vec3::NEG_Z;

/// Distance `pos` lies behind `reference` along the flight direction.
/// Positive when `pos` has already been passed.
#[inline]
pub fn distance_behind(pos: Vec3, reference: Vec3) -> f32 {
    pos.z - reference.z
}

/// Rotate a box's half extents about the vertical axis and return the
/// half extents of the axis-aligned box that encloses it.
#[inline]
pub fn yaw_half_extents(half: Vec3, yaw: f32) -> Vec3 {
    let (s, c) = yaw.sin_cos();
    let (s, c) = (s.abs(), c.abs());
    Vec3::new(c * half.x + s * half.z, half.y, s * half.x + c * half.z)
}
