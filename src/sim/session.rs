//! Headless game session: the per-frame orchestration around the core
//!
//! Frame order is fixed: craft movement, then pool lifecycle (recycle and
//! spawn), then the collision pass, then score/fuel/game-over reactions.
//! A slot recycled earlier in the frame is deregistered before the collision
//! pass runs, so it can never collide in its old role.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{
    Collidable, CollisionEngine, CollisionView, CollisionWorld, RayHit, StepReport,
};
use super::craft::{ControlInput, Craft};
use super::effects::{EffectKind, EffectQueue};
use super::entity::EntityId;
use super::pool::{EntityPools, VisualSink};
use crate::{Tuning, TuningError};
use crate::consts::*;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Flying,
    Paused,
    GameOver,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrashCause {
    Obstacle(EntityId),
    OutOfFuel,
    Riverbank,
}

/// Sounds the outer layer should play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    EngineStart,
    EngineStop,
    Explosion,
    Splash,
    Fuel,
}

/// Side effects for the outer layer (UI, audio, renderer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    FuelCollected { pickup: EntityId, fuel: f32, score: u64 },
    Effect { kind: EffectKind, position: Vec3 },
    Sound(SoundCue),
    GameOver { cause: CrashCause, score: u64 },
    Restarted,
}

/// Mutable collision world: the craft plus every pooled entity
struct SceneMut<'a> {
    craft: &'a mut Craft,
    pools: &'a mut EntityPools,
}

impl CollisionView<EntityId> for SceneMut<'_> {
    fn collidable(&self, id: EntityId) -> Option<&dyn Collidable<EntityId>> {
        match id {
            EntityId::Craft => Some(&*self.craft as &dyn Collidable<EntityId>),
            _ => self.pools.collidable(id),
        }
    }
}

impl CollisionWorld<EntityId> for SceneMut<'_> {
    fn collidable_mut(&mut self, id: EntityId) -> Option<&mut dyn Collidable<EntityId>> {
        match id {
            EntityId::Craft => Some(&mut *self.craft as &mut dyn Collidable<EntityId>),
            _ => self.pools.collidable_mut(id),
        }
    }
}

/// Read-only view for ray queries
struct SceneRef<'a> {
    craft: &'a Craft,
    pools: &'a EntityPools,
}

impl CollisionView<EntityId> for SceneRef<'_> {
    fn collidable(&self, id: EntityId) -> Option<&dyn Collidable<EntityId>> {
        match id {
            EntityId::Craft => Some(self.craft as &dyn Collidable<EntityId>),
            _ => self.pools.collidable(id),
        }
    }
}

/// A complete run: craft, pools, collision engine, score and fuel
#[derive(Debug)]
pub struct GameSession {
    tuning: Tuning,
    phase: GamePhase,
    score: f64,
    fuel: f32,
    frame: u64,
    craft: Craft,
    pools: EntityPools,
    engine: CollisionEngine,
    effects: EffectQueue,
    /// Cosmetic randomness (spray), kept apart from spawn randomness
    rng: Pcg32,
    events: Vec<GameEvent>,
}

impl GameSession {
    pub fn new(tuning: Tuning) -> Self {
        if let Err(err) = tuning.validate() {
            log::warn!("Tuning failed validation: {}", err);
        }
        let pools = EntityPools::new(&tuning);
        Self::with_pools(tuning, pools)
    }

    /// Like [`new`](Self::new), but refuses tuning that fails validation
    pub fn try_new(tuning: Tuning) -> Result<Self, TuningError> {
        tuning.validate()?;
        Ok(Self::new(tuning))
    }

    /// Session whose pools report visuals to `sink`
    pub fn with_visual_sink(tuning: Tuning, sink: Box<dyn VisualSink>) -> Self {
        let pools = EntityPools::new(&tuning).with_visual_sink(sink);
        Self::with_pools(tuning, pools)
    }

    fn with_pools(tuning: Tuning, pools: EntityPools) -> Self {
        let mut engine = CollisionEngine::new();
        engine.register(EntityId::Craft);

        log::info!(
            "Session start: river={} spawn_distance={} pools={}+{}",
            tuning.river_width,
            tuning.spawn_distance,
            tuning.obstacle_slots(),
            tuning.pickup_slots
        );

        Self {
            phase: GamePhase::Flying,
            score: 0.0,
            fuel: tuning.fuel_capacity,
            frame: 0,
            craft: Craft::default(),
            pools,
            engine,
            effects: EffectQueue::new(),
            rng: Pcg32::seed_from_u64(tuning.seed.wrapping_add(1)),
            events: vec![GameEvent::Sound(SoundCue::EngineStart)],
            tuning,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> u64 {
        self.score.floor() as u64
    }

    pub fn fuel(&self) -> f32 {
        self.fuel
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn craft(&self) -> &Craft {
        &self.craft
    }

    pub fn pools(&self) -> &EntityPools {
        &self.pools
    }

    pub fn engine(&self) -> &CollisionEngine {
        &self.engine
    }

    pub fn effects(&self) -> &EffectQueue {
        &self.effects
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Nearest entity straight ahead of the craft within `max_distance`
    pub fn look_ahead(&self, max_distance: f32) -> Option<RayHit<EntityId>> {
        let view = SceneRef {
            craft: &self.craft,
            pools: &self.pools,
        };
        let nose = self.craft.position + crate::FORWARD * CRAFT_HALF_DEPTH;
        self.engine.cast_ray_filtered(
            &view,
            nose,
            crate::FORWARD,
            max_distance,
            |id| id != EntityId::Craft,
        )
    }

    /// Advance one frame
    pub fn tick(&mut self, input: &ControlInput, dt: f32) {
        if self.phase != GamePhase::Flying {
            return;
        }
        self.frame += 1;

        self.craft.update(input, &self.tuning, dt);

        let player = self.craft.state();
        self.pools.update(&player, dt, &mut self.engine);

        self.collision_pass();
        self.resolve_contacts();

        self.update_game_state(dt);
        self.spray();
        self.effects.update(dt);
    }

    /// Run the broad phase over the craft and every active slot
    pub fn collision_pass(&mut self) -> StepReport<EntityId> {
        let mut scene = SceneMut {
            craft: &mut self.craft,
            pools: &mut self.pools,
        };
        self.engine.step(&mut scene)
    }

    /// React to what the craft touched in the last collision pass
    fn resolve_contacts(&mut self) {
        for other in self.craft.take_contacts() {
            if self.phase == GamePhase::GameOver {
                // Later callbacks from the same pass are moot
                break;
            }
            match other {
                EntityId::Pickup(_) => self.collect_fuel(other),
                EntityId::Obstacle(_) => {
                    let position = self.craft.position;
                    self.trigger_effect(EffectKind::Explosion, position);
                    self.events.push(GameEvent::Sound(SoundCue::Explosion));
                    self.game_over(CrashCause::Obstacle(other));
                }
                EntityId::Craft => {}
            }
        }
    }

    fn collect_fuel(&mut self, pickup: EntityId) {
        // A second contact with the same canister in one pass is a no-op
        if !self.pools.collect(pickup, &mut self.engine) {
            return;
        }
        self.fuel = (self.fuel + self.tuning.fuel_per_pickup).min(self.tuning.fuel_capacity);
        self.score += self.tuning.pickup_score as f64;
        log::debug!("Fuel collected: fuel={:.1} score={}", self.fuel, self.score());
        self.events.push(GameEvent::Sound(SoundCue::Fuel));
        self.events.push(GameEvent::FuelCollected {
            pickup,
            fuel: self.fuel,
            score: self.score(),
        });
    }

    fn update_game_state(&mut self, dt: f32) {
        if self.phase != GamePhase::Flying {
            return;
        }

        self.score += f64::from(self.craft.speed * self.tuning.distance_score * dt);

        self.fuel = (self.fuel - self.tuning.fuel_drain * dt).max(0.0);
        if self.fuel <= 0.0 {
            self.game_over(CrashCause::OutOfFuel);
            return;
        }

        let position = self.craft.position;
        if position.x.abs() > self.tuning.river_width / 2.0 {
            let splash = Vec3::new(position.x, SPLASH_HEIGHT, position.z);
            self.trigger_effect(EffectKind::Splash, splash);
            self.events.push(GameEvent::Sound(SoundCue::Splash));
            self.game_over(CrashCause::Riverbank);
        }
    }

    /// Occasional spray behind the craft while it skims the water
    fn spray(&mut self) {
        if self.phase != GamePhase::Flying || self.craft.position.y >= LOW_FLIGHT_HEIGHT {
            return;
        }
        if self.rng.random::<f32>() < LOW_FLIGHT_SPLASH_CHANCE {
            let behind = self.craft.position - crate::FORWARD * 2.0;
            self.trigger_effect(
                EffectKind::Splash,
                Vec3::new(behind.x, SPLASH_HEIGHT, behind.z),
            );
            self.events.push(GameEvent::Sound(SoundCue::Splash));
        }
    }

    fn trigger_effect(&mut self, kind: EffectKind, position: Vec3) {
        self.effects.trigger(kind, position);
        self.events.push(GameEvent::Effect { kind, position });
    }

    fn game_over(&mut self, cause: CrashCause) {
        if self.phase == GamePhase::GameOver {
            return;
        }
        self.phase = GamePhase::GameOver;
        log::info!("Game over: {:?}, final score {}", cause, self.score());
        self.events.push(GameEvent::Sound(SoundCue::EngineStop));
        self.events.push(GameEvent::GameOver {
            cause,
            score: self.score(),
        });
    }

    /// Toggle pause (ignored once the run is over)
    pub fn toggle_pause(&mut self) {
        match self.phase {
            GamePhase::Flying => {
                self.phase = GamePhase::Paused;
                self.events.push(GameEvent::Sound(SoundCue::EngineStop));
            }
            GamePhase::Paused => {
                self.phase = GamePhase::Flying;
                self.events.push(GameEvent::Sound(SoundCue::EngineStart));
            }
            GamePhase::GameOver => {}
        }
    }

    /// Start a fresh run with the same pools
    pub fn restart(&mut self) {
        self.pools.reset(&mut self.engine);
        self.engine.clear();
        self.engine.register(EntityId::Craft);
        self.craft.reset();
        self.effects.clear();
        self.score = 0.0;
        self.fuel = self.tuning.fuel_capacity;
        self.frame = 0;
        self.phase = GamePhase::Flying;
        log::info!("Session restarted");
        self.events.push(GameEvent::Restarted);
        self.events.push(GameEvent::Sound(SoundCue::EngineStart));
    }
}

/// Simple autopilot for demos: hold throttle, dodge what the forward ray sees,
/// drift toward the river center otherwise
pub fn autopilot(session: &GameSession) -> ControlInput {
    let craft = session.craft();
    let half_width = session.tuning().river_width / 2.0;
    let mut input = ControlInput {
        accelerate: true,
        ..Default::default()
    };

    let threat = session
        .look_ahead(40.0)
        .filter(|hit| matches!(hit.id, EntityId::Obstacle(_)))
        .and_then(|hit| session.pools().entity(hit.id));

    if let Some(obstacle) = threat {
        if obstacle.position.x >= craft.position.x {
            input.left = true;
        } else {
            input.right = true;
        }
    } else if craft.position.x > half_width * 0.5 {
        input.left = true;
    } else if craft.position.x < -half_width * 0.5 {
        input.right = true;
    }

    input
}
