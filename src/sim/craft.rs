//! The player's craft
//!
//! Kinematic only: speed ramps with the throttle, the craft slides sideways
//! while steering and always flies forward. Its collision hook does not act
//! on anything itself; it records who it touched so the session can decide
//! between "crashed" and "collected" after the collision pass.

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::bounds::Aabb;
use super::collision::{Collidable, CollisionResponse};
use super::entity::EntityId;
use super::pool::PlayerState;
use crate::consts::*;
use crate::{FORWARD, Tuning};

/// Visual attitude while climbing/diving (radians)
const PITCH_ANGLE: f32 = std::f32::consts::PI * 0.05;
/// Visual bank while steering (radians)
const BANK_ANGLE: f32 = std::f32::consts::PI * 0.1;

/// Control commands for a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlInput {
    pub accelerate: bool,
    pub brake: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Craft {
    pub position: Vec3,
    pub speed: f32,
    /// Nose-up positive (visual only)
    pub pitch: f32,
    /// Left bank positive (visual only)
    pub roll: f32,
    /// Entities touched during the current collision pass
    #[serde(skip)]
    contacts: Vec<EntityId>,
}

impl Default for Craft {
    fn default() -> Self {
        Self {
            position: Self::start_position(),
            speed: 0.0,
            pitch: 0.0,
            roll: 0.0,
            contacts: Vec::new(),
        }
    }
}

impl Craft {
    pub fn start_position() -> Vec3 {
        Vec3::new(0.0, CRAFT_START_Y, 0.0)
    }

    /// Back to the start line, stopped
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> PlayerState {
        PlayerState {
            position: self.position,
            speed: self.speed,
        }
    }

    /// Apply one frame of input
    pub fn update(&mut self, input: &ControlInput, tuning: &Tuning, dt: f32) {
        if input.accelerate {
            self.speed = (self.speed + tuning.acceleration * dt).min(tuning.max_speed);
            self.pitch = PITCH_ANGLE;
        } else if input.brake {
            self.speed = (self.speed - tuning.deceleration * dt).max(0.0);
            self.pitch = -PITCH_ANGLE;
        } else {
            // Coast down at half the braking rate
            self.speed = (self.speed - tuning.deceleration * 0.5 * dt).max(0.0);
            self.pitch = 0.0;
        }

        let lateral = tuning.lateral_factor * self.speed * dt;
        if input.left && !input.right {
            self.position.x -= lateral;
            self.roll = BANK_ANGLE;
        } else if input.right && !input.left {
            self.position.x += lateral;
            self.roll = -BANK_ANGLE;
        } else {
            self.roll = 0.0;
        }

        self.position += FORWARD * self.speed * CRAFT_FORWARD_SCALE * dt;
    }

    /// Box enclosing the craft at its current pitch and bank
    pub fn aabb(&self) -> Aabb {
        let half = Vec3::new(CRAFT_HALF_WIDTH, CRAFT_HALF_HEIGHT, CRAFT_HALF_DEPTH);
        let rotation = Mat3::from_rotation_x(self.pitch) * Mat3::from_rotation_z(self.roll);
        Aabb::from_center_half_extents(self.position, rotation.abs() * half)
    }

    /// Hand over (and clear) the contacts recorded since the last call
    pub fn take_contacts(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.contacts)
    }
}

impl Collidable<EntityId> for Craft {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(self.aabb())
    }

    fn collision_radius(&self) -> Option<f32> {
        Some(CRAFT_RADIUS)
    }

    fn on_collision(&mut self, other: EntityId) -> CollisionResponse {
        self.contacts.push(other);
        CollisionResponse::Ignore
    }
}
