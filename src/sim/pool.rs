//! Fixed-capacity entity pools and their spawn/recycle lifecycle
//!
//! `EntityPools` is the only code that flips an entity's `active` flag. Every
//! activation registers the slot with the collision engine and every
//! deactivation deregisters it in the same call, so "registered" and
//! "active" never disagree between calls.

use std::fmt;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{Collidable, CollisionEngine, CollisionView, CollisionWorld};
use super::entity::{Elevation, Entity, EntityId, EntityKind, Lateral, PoolKind};
use super::error::LifecycleError;
use crate::consts::*;
use crate::{Tuning, distance_behind};

/// Tolerance for accumulated frame time against the pickup interval
const CADENCE_EPSILON: f64 = 1e-6;

/// Player state queried once per frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerState {
    pub position: Vec3,
    pub speed: f32,
}

/// Receives visual side effects for pooled entities
pub trait VisualSink {
    /// Build (or rebuild) the visual for an entity at `position`
    fn materialize(&mut self, _id: EntityId, _kind: EntityKind, _position: Vec3) {}

    fn set_visible(&mut self, _id: EntityId, _visible: bool) {}
}

/// Sink that drops everything (headless)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl VisualSink for NullSink {}

/// A fixed sequence of slots of one family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    kind: PoolKind,
    slots: Vec<Entity>,
    /// Active slot indices in spawn order
    active: Vec<usize>,
}

impl Pool {
    fn new(kind: PoolKind, slots: Vec<Entity>) -> Self {
        Self {
            kind,
            active: Vec::with_capacity(slots.len()),
            slots,
        }
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active slot indices in spawn order
    pub fn active_slots(&self) -> &[usize] {
        &self.active
    }

    pub fn get(&self, slot: usize) -> Option<&Entity> {
        self.slots.get(slot)
    }

    pub fn slots(&self) -> &[Entity] {
        &self.slots
    }

    /// Active entities with their handles, in spawn order
    pub fn iter_active(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.active
            .iter()
            .map(|&i| (EntityId::slot(self.kind, i), &self.slots[i]))
    }

    fn first_inactive(&self) -> Option<usize> {
        self.slots.iter().position(|e| !e.active)
    }

    fn activate(&mut self, slot: usize) {
        self.slots[slot].active = true;
        self.slots[slot].visible = true;
        self.active.push(slot);
    }

    fn deactivate(&mut self, slot: usize) {
        self.slots[slot].active = false;
        self.slots[slot].visible = false;
        self.active.retain(|&i| i != slot);
    }
}

/// Timing state for spawn decisions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpawnCadence {
    /// Accumulated game time (seconds)
    pub game_time: f64,
    /// Game time of the last successful pickup spawn
    pub last_pickup_spawn: f64,
}

/// What one `update` changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub recycled: Vec<EntityId>,
    pub spawned: Vec<EntityId>,
}

/// Owner of every obstacle and pickup slot
pub struct EntityPools {
    obstacles: Pool,
    pickups: Pool,
    cadence: SpawnCadence,
    rng: Pcg32,
    sink: Box<dyn VisualSink>,

    river_width: f32,
    spawn_distance: f32,
    recycle_margin: f32,
    obstacle_ceiling: usize,
    obstacle_spawn_rate: f32,
    pickup_interval: f64,
    pickup_height: f32,
}

impl fmt::Debug for EntityPools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityPools")
            .field("obstacles", &self.obstacles.active_count())
            .field("pickups", &self.pickups.active_count())
            .field("cadence", &self.cadence)
            .finish_non_exhaustive()
    }
}

impl EntityPools {
    /// Build every slot up front; all start inactive and hidden
    pub fn new(tuning: &Tuning) -> Self {
        let mut rng = Pcg32::seed_from_u64(tuning.seed);

        let mut obstacles = Vec::with_capacity(tuning.obstacle_slots());
        for _ in 0..tuning.island_slots {
            let size = rng.random_range(ISLAND_MIN_SIZE..ISLAND_MAX_SIZE);
            obstacles.push(Entity::island(size));
        }
        for _ in 0..tuning.bridge_slots {
            let height = rng.random_range(BRIDGE_MIN_HEIGHT..BRIDGE_MAX_HEIGHT);
            obstacles.push(Entity::bridge(tuning.river_width, height));
        }

        let pickups = (0..tuning.pickup_slots).map(|_| Entity::fuel()).collect();

        Self {
            obstacles: Pool::new(PoolKind::Obstacle, obstacles),
            pickups: Pool::new(PoolKind::Pickup, pickups),
            cadence: SpawnCadence::default(),
            rng,
            sink: Box::new(NullSink),
            river_width: tuning.river_width,
            spawn_distance: tuning.spawn_distance,
            recycle_margin: tuning.recycle_margin,
            obstacle_ceiling: tuning.obstacle_ceiling,
            obstacle_spawn_rate: tuning.obstacle_spawn_rate,
            pickup_interval: f64::from(tuning.pickup_interval),
            pickup_height: tuning.pickup_height,
        }
    }

    /// Attach a visual sink; every slot is materialized hidden right away
    pub fn with_visual_sink(mut self, sink: Box<dyn VisualSink>) -> Self {
        self.sink = sink;
        for pool in [&self.obstacles, &self.pickups] {
            for (i, entity) in pool.slots.iter().enumerate() {
                let id = EntityId::slot(pool.kind, i);
                self.sink.materialize(id, entity.kind, entity.position);
                self.sink.set_visible(id, entity.visible);
            }
        }
        self
    }

    pub fn obstacles(&self) -> &Pool {
        &self.obstacles
    }

    pub fn pickups(&self) -> &Pool {
        &self.pickups
    }

    pub fn pool(&self, kind: PoolKind) -> &Pool {
        match kind {
            PoolKind::Obstacle => &self.obstacles,
            PoolKind::Pickup => &self.pickups,
        }
    }

    fn pool_mut(&mut self, kind: PoolKind) -> &mut Pool {
        match kind {
            PoolKind::Obstacle => &mut self.obstacles,
            PoolKind::Pickup => &mut self.pickups,
        }
    }

    pub fn cadence(&self) -> SpawnCadence {
        self.cadence
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        let (kind, slot) = id.pool_slot()?;
        self.pool(kind).get(slot)
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.entity(id).is_some_and(|e| e.active)
    }

    /// Handles of every active entity, obstacles first, each in spawn order
    pub fn active_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.obstacles
            .iter_active()
            .chain(self.pickups.iter_active())
            .map(|(id, _)| id)
    }

    /// Activate the first free slot of `kind`
    pub fn try_spawn(
        &mut self,
        kind: PoolKind,
        player: &PlayerState,
        engine: &mut CollisionEngine,
    ) -> Result<EntityId, LifecycleError> {
        let slot = self
            .pool(kind)
            .first_inactive()
            .ok_or(LifecycleError::PoolExhausted(kind))?;
        let id = EntityId::slot(kind, slot);

        let (entity_kind, footprint_width, half_height) = {
            let entity = &self.pool(kind).slots[slot];
            (
                entity.kind,
                entity.footprint.width(),
                entity.footprint.half_extents.y,
            )
        };
        let position = self.spawn_position(entity_kind, footprint_width, half_height, player);

        let pool = self.pool_mut(kind);
        pool.slots[slot].place(position);
        pool.activate(slot);

        self.sink.materialize(id, entity_kind, position);
        self.sink.set_visible(id, true);
        engine.register(id);

        log::debug!("spawned {:?} ({:?}) at {}", id, entity_kind, position);
        Ok(id)
    }

    /// Activate the first free slot of `kind`; no-op when the pool is exhausted
    pub fn spawn(
        &mut self,
        kind: PoolKind,
        player: &PlayerState,
        engine: &mut CollisionEngine,
    ) -> Option<EntityId> {
        match self.try_spawn(kind, player, engine) {
            Ok(id) => Some(id),
            Err(err) => {
                log::trace!("spawn dropped: {}", err);
                None
            }
        }
    }

    /// Kind rule table applied to the player's position
    fn spawn_position(
        &mut self,
        kind: EntityKind,
        footprint_width: f32,
        half_height: f32,
        player: &PlayerState,
    ) -> Vec3 {
        let rule = kind.spawn_rule();

        let x = match rule.lateral {
            Lateral::Centered => 0.0,
            Lateral::Random => {
                let span = (self.river_width - footprint_width).max(0.0);
                (self.rng.random::<f32>() - 0.5) * span
            }
        };
        let y = match rule.elevation {
            Elevation::Grounded => WATER_LEVEL + half_height,
            Elevation::Hover => self.pickup_height,
        };
        let z = player.position.z - self.spawn_distance;

        Vec3::new(x, y, z)
    }

    /// Deactivate, hide and deregister one active entity
    fn retire(&mut self, id: EntityId, engine: &mut CollisionEngine) -> Result<(), LifecycleError> {
        let (kind, slot) = id.pool_slot().ok_or(LifecycleError::InvalidSlot(id))?;
        let pool = self.pool_mut(kind);
        let entity = pool.slots.get(slot).ok_or(LifecycleError::InvalidSlot(id))?;
        if !entity.active {
            return Err(LifecycleError::NotActive(id));
        }
        pool.deactivate(slot);
        self.sink.set_visible(id, false);
        engine.deregister(id);
        Ok(())
    }

    /// Return an active entity to its pool
    pub fn try_recycle(
        &mut self,
        id: EntityId,
        engine: &mut CollisionEngine,
    ) -> Result<(), LifecycleError> {
        self.retire(id, engine)?;
        log::debug!("recycled {:?}", id);
        Ok(())
    }

    /// Return an active entity to its pool; no-op if already inactive
    pub fn recycle(&mut self, id: EntityId, engine: &mut CollisionEngine) -> bool {
        match self.try_recycle(id, engine) {
            Ok(()) => true,
            Err(err) => {
                log::trace!("recycle ignored: {}", err);
                false
            }
        }
    }

    /// Remove a pickup immediately after gameplay confirmed the collection
    pub fn try_collect(
        &mut self,
        id: EntityId,
        engine: &mut CollisionEngine,
    ) -> Result<(), LifecycleError> {
        if !matches!(id, EntityId::Pickup(_)) {
            return Err(LifecycleError::WrongKind(id));
        }
        self.retire(id, engine)?;
        log::debug!("collected {:?}", id);
        Ok(())
    }

    /// Collect a pickup; no-op for obstacles and inactive slots
    pub fn collect(&mut self, id: EntityId, engine: &mut CollisionEngine) -> bool {
        match self.try_collect(id, engine) {
            Ok(()) => true,
            Err(err) => {
                log::trace!("collect ignored: {}", err);
                false
            }
        }
    }

    /// Per-frame lifecycle: animate, recycle, spawn
    pub fn update(
        &mut self,
        player: &PlayerState,
        dt: f32,
        engine: &mut CollisionEngine,
    ) -> UpdateReport {
        let mut report = UpdateReport::default();
        self.cadence.game_time += f64::from(dt);

        for kind in [PoolKind::Obstacle, PoolKind::Pickup] {
            let pool = self.pool_mut(kind);
            for &slot in &pool.active {
                pool.slots[slot].animate(dt);
            }

            let expired: Vec<EntityId> = self
                .pool(kind)
                .iter_active()
                .filter(|(_, e)| distance_behind(e.position, player.position) > self.recycle_margin)
                .map(|(id, _)| id)
                .collect();
            for id in expired {
                if self.retire(id, engine).is_ok() {
                    log::debug!("recycled {:?} behind player", id);
                    report.recycled.push(id);
                }
            }
        }

        // Chance scales with speed, so faster flight means denser obstacles
        let roll: f32 = self.rng.random();
        if roll < self.obstacle_spawn_rate * player.speed
            && self.obstacles.active_count() < self.obstacle_ceiling
        {
            if let Some(id) = self.spawn(PoolKind::Obstacle, player, engine) {
                report.spawned.push(id);
            }
        }

        if self.pickup_due() {
            if let Some(id) = self.spawn(PoolKind::Pickup, player, engine) {
                self.cadence.last_pickup_spawn = self.cadence.game_time;
                report.spawned.push(id);
            }
        }

        report
    }

    fn pickup_due(&self) -> bool {
        self.cadence.game_time - self.cadence.last_pickup_spawn + CADENCE_EPSILON
            >= self.pickup_interval
    }

    /// Deactivate everything and zero the cadence
    pub fn reset(&mut self, engine: &mut CollisionEngine) {
        let ids: Vec<EntityId> = self.active_ids().collect();
        let count = ids.len();
        for id in ids {
            // Every id came from an active list, so retire cannot fail here
            let _ = self.retire(id, engine);
        }
        self.cadence = SpawnCadence::default();
        log::debug!("pools reset ({} entities retired)", count);
    }
}

#[cfg(test)]
impl EntityPools {
    /// Move an entity without touching its lifecycle state
    pub(crate) fn test_place(&mut self, id: EntityId, position: Vec3) {
        if let Some((kind, slot)) = id.pool_slot() {
            if let Some(entity) = self.pool_mut(kind).slots.get_mut(slot) {
                entity.place(position);
            }
        }
    }
}

impl CollisionView<EntityId> for EntityPools {
    fn collidable(&self, id: EntityId) -> Option<&dyn Collidable<EntityId>> {
        self.entity(id)
            .filter(|e| e.active)
            .map(|e| e as &dyn Collidable<EntityId>)
    }
}

impl CollisionWorld<EntityId> for EntityPools {
    fn collidable_mut(&mut self, id: EntityId) -> Option<&mut dyn Collidable<EntityId>> {
        let (kind, slot) = id.pool_slot()?;
        self.pool_mut(kind)
            .slots
            .get_mut(slot)
            .filter(|e| e.active)
            .map(|e| e as &mut dyn Collidable<EntityId>)
    }
}
