//! Pooled entity variants: islands, bridges and fuel pickups
//!
//! Kinds are plain data. Per-kind behavior (spawn placement, collision
//! response, animation) is looked up from the kind tag rather than through
//! trait objects.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::bounds::Aabb;
use super::collision::{Collidable, CollisionResponse};
use crate::consts::*;
use crate::yaw_half_extents;

/// Pool families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolKind {
    Obstacle,
    Pickup,
}

/// Stable handle for anything the collision engine can track.
/// Pool handles are slot indices and never change for the pool's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityId {
    /// The player's craft
    Craft,
    Obstacle(usize),
    Pickup(usize),
}

impl EntityId {
    pub fn slot(kind: PoolKind, index: usize) -> Self {
        match kind {
            PoolKind::Obstacle => EntityId::Obstacle(index),
            PoolKind::Pickup => EntityId::Pickup(index),
        }
    }

    /// Pool family and slot index, if this is a pooled entity
    pub fn pool_slot(&self) -> Option<(PoolKind, usize)> {
        match *self {
            EntityId::Craft => None,
            EntityId::Obstacle(i) => Some((PoolKind::Obstacle, i)),
            EntityId::Pickup(i) => Some((PoolKind::Pickup, i)),
        }
    }
}

/// Entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Round sandbar occupying part of the river
    Island,
    /// Spans the whole river width
    Bridge,
    /// Collectible fuel canister
    Fuel,
}

/// Where a kind spawns across the river
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lateral {
    Centered,
    /// Anywhere the footprint still fits inside the river
    Random,
}

/// Where a kind spawns vertically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Resting on the water surface
    Grounded,
    /// At the configured pickup height
    Hover,
}

/// Placement rule for one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRule {
    pub lateral: Lateral,
    pub elevation: Elevation,
}

impl EntityKind {
    pub fn pool(self) -> PoolKind {
        match self {
            EntityKind::Island | EntityKind::Bridge => PoolKind::Obstacle,
            EntityKind::Fuel => PoolKind::Pickup,
        }
    }

    pub fn spawn_rule(self) -> SpawnRule {
        match self {
            EntityKind::Island => SpawnRule {
                lateral: Lateral::Random,
                elevation: Elevation::Grounded,
            },
            EntityKind::Bridge => SpawnRule {
                lateral: Lateral::Centered,
                elevation: Elevation::Grounded,
            },
            EntityKind::Fuel => SpawnRule {
                lateral: Lateral::Random,
                elevation: Elevation::Hover,
            },
        }
    }

    pub fn collision_response(self) -> CollisionResponse {
        match self {
            EntityKind::Island | EntityKind::Bridge => CollisionResponse::Blocking,
            EntityKind::Fuel => CollisionResponse::Collectible,
        }
    }
}

/// Collision footprint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Box half extents before rotation
    pub half_extents: Vec3,
    /// Radius for the sphere fast path
    pub radius: f32,
}

impl Footprint {
    /// Full width across the river
    pub fn width(&self) -> f32 {
        self.half_extents.x * 2.0
    }
}

/// Kind-specific animation state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Animation {
    Static,
    /// Pickup hover: sine bob around `base_y` plus spin about Y
    Bob { time: f32, base_y: f32 },
}

/// One pool slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub footprint: Footprint,
    pub position: Vec3,
    /// Rotation about the vertical axis (radians)
    pub yaw: f32,
    pub active: bool,
    pub visible: bool,
    pub animation: Animation,
}

impl Entity {
    fn template(kind: EntityKind, footprint: Footprint, animation: Animation) -> Self {
        Self {
            kind,
            footprint,
            position: Vec3::ZERO,
            yaw: 0.0,
            active: false,
            visible: false,
            animation,
        }
    }

    /// Island of the given size (top radius)
    pub fn island(size: f32) -> Self {
        let base = size * ISLAND_BASE_FACTOR;
        Self::template(
            EntityKind::Island,
            Footprint {
                half_extents: Vec3::new(base, ISLAND_HEIGHT / 2.0, base),
                radius: size,
            },
            Animation::Static,
        )
    }

    /// Bridge spanning `width` with deck at `height`
    pub fn bridge(width: f32, height: f32) -> Self {
        Self::template(
            EntityKind::Bridge,
            Footprint {
                half_extents: Vec3::new(width / 2.0, height / 2.0, BRIDGE_DEPTH / 2.0),
                radius: width.max(height) / 2.0,
            },
            Animation::Static,
        )
    }

    pub fn fuel() -> Self {
        Self::template(
            EntityKind::Fuel,
            Footprint {
                half_extents: Vec3::new(FUEL_WIDTH / 2.0, FUEL_HEIGHT / 2.0, FUEL_DEPTH / 2.0),
                radius: FUEL_RADIUS,
            },
            Animation::Bob {
                time: 0.0,
                base_y: 0.0,
            },
        )
    }

    /// Move to `position` and restart animation. Does not touch `active`.
    pub fn place(&mut self, position: Vec3) {
        self.position = position;
        self.yaw = 0.0;
        if let Animation::Bob { time, base_y } = &mut self.animation {
            *time = 0.0;
            *base_y = position.y;
        }
    }

    /// Advance animation by `dt` seconds
    pub fn animate(&mut self, dt: f32) {
        if let Animation::Bob { time, base_y } = &mut self.animation {
            *time += dt;
            self.position.y = *base_y + (*time * FUEL_BOB_SPEED).sin() * FUEL_BOB_HEIGHT;
            self.yaw = (self.yaw + FUEL_SPIN_SPEED * dt) % std::f32::consts::TAU;
        }
    }

    /// Axis-aligned box for the current position and yaw
    pub fn aabb(&self) -> Aabb {
        let half = yaw_half_extents(self.footprint.half_extents, self.yaw);
        Aabb::from_center_half_extents(self.position, half)
    }
}

impl Collidable<EntityId> for Entity {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(self.aabb())
    }

    fn collision_radius(&self) -> Option<f32> {
        Some(self.footprint.radius)
    }

    fn on_collision(&mut self, other: EntityId) -> CollisionResponse {
        let response = self.kind.collision_response();
        log::debug!("{:?} collision with {:?}: {:?}", self.kind, other, response);
        response
    }
}
