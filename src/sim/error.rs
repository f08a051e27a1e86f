//! Lifecycle error taxonomy
//!
//! None of these halt the simulation. The convenience operations swallow
//! them and do less work; the `try_` variants hand them back to callers that
//! want to assert on them.

use thiserror::Error;

use super::entity::{EntityId, PoolKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Spawn requested but every slot is active
    #[error("{0:?} pool exhausted")]
    PoolExhausted(PoolKind),
    /// Deregister requested for an entity the engine does not track
    #[error("entity not registered with the collision engine")]
    NotRegistered,
    /// Entity has neither a bounding box nor a collision radius
    #[error("entity has no bounding volume")]
    InvalidBounds,
    /// Slot index outside the pool
    #[error("no slot for {0:?}")]
    InvalidSlot(EntityId),
    /// Recycle or collect requested for an inactive slot
    #[error("{0:?} is not active")]
    NotActive(EntityId),
    /// Operation only valid for another pool family
    #[error("{0:?} does not support this operation")]
    WrongKind(EntityId),
}
