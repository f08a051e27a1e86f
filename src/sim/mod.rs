//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Frame `dt` drives every timer (no wall clock)
//! - Seeded RNG only
//! - Stable iteration order (registration order, slot order)
//! - No rendering or platform dependencies; visuals go through `VisualSink`

pub mod bounds;
pub mod collision;
pub mod craft;
pub mod effects;
pub mod entity;
pub mod error;
pub mod pool;
pub mod session;

pub use bounds::{Aabb, Ray, Sphere};
pub use collision::{
    Collidable, CollisionEngine, CollisionResponse, CollisionView, CollisionWorld, Contact,
    RayHit, StepReport,
};
pub use craft::{ControlInput, Craft};
pub use effects::{EffectKind, EffectQueue, TransientEffect};
pub use entity::{Animation, Entity, EntityId, EntityKind, Footprint, PoolKind, SpawnRule};
pub use error::LifecycleError;
pub use pool::{EntityPools, NullSink, PlayerState, Pool, SpawnCadence, UpdateReport, VisualSink};
pub use session::{CrashCause, GameEvent, GamePhase, GameSession, SoundCue, autopilot};
