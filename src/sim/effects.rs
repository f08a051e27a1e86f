//! Transient visual effects with frame-driven expiry
//!
//! Effects age by the frame `dt` and drop out of the queue once their
//! lifetime is spent. Nothing here depends on wall-clock time.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Crash fireball plus a brief point-light flash
    Explosion,
    /// Spray kicked up from the water
    Splash,
}

impl EffectKind {
    pub fn lifetime(self) -> f32 {
        match self {
            EffectKind::Explosion => EXPLOSION_LIFETIME,
            EffectKind::Splash => SPLASH_LIFETIME,
        }
    }

    /// How long the effect's light stays on
    pub fn flash_duration(self) -> f32 {
        match self {
            EffectKind::Explosion => EXPLOSION_FLASH,
            EffectKind::Splash => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransientEffect {
    pub kind: EffectKind,
    pub position: Vec3,
    /// Seconds since the effect was triggered
    pub age: f32,
}

impl TransientEffect {
    pub fn remaining(&self) -> f32 {
        (self.kind.lifetime() - self.age).max(0.0)
    }

    /// Normalized progress 0..1 (for fade-out)
    pub fn progress(&self) -> f32 {
        (self.age / self.kind.lifetime()).clamp(0.0, 1.0)
    }

    pub fn flash_active(&self) -> bool {
        self.age < self.kind.flash_duration()
    }
}

/// Expiring-effects list updated once per frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectQueue {
    effects: Vec<TransientEffect>,
}

impl EffectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&mut self, kind: EffectKind, position: Vec3) {
        self.effects.push(TransientEffect {
            kind,
            position,
            age: 0.0,
        });
    }

    /// Age every effect and drop the expired ones. Returns how many expired.
    pub fn update(&mut self, dt: f32) -> usize {
        let before = self.effects.len();
        for effect in &mut self.effects {
            effect.age += dt;
        }
        self.effects.retain(|e| e.age < e.kind.lifetime());
        before - self.effects.len()
    }

    pub fn active(&self) -> &[TransientEffect] {
        &self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_expire_after_lifetime() {
        let mut queue = EffectQueue::new();
        queue.trigger(EffectKind::Explosion, Vec3::ZERO);
        queue.trigger(EffectKind::Splash, Vec3::new(1.0, 0.1, -3.0));

        assert_eq!(queue.update(0.5), 0);
        assert_eq!(queue.len(), 2);

        // Splash (0.8s) goes first
        assert_eq!(queue.update(0.375), 1);
        assert_eq!(queue.active()[0].kind, EffectKind::Explosion);

        assert_eq!(queue.update(0.125), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_explosion_flash_is_short() {
        let mut queue = EffectQueue::new();
        queue.trigger(EffectKind::Explosion, Vec3::ZERO);
        assert!(queue.active()[0].flash_active());

        queue.update(0.25);
        let effect = queue.active()[0];
        assert!(!effect.flash_active());
        assert!((effect.remaining() - 0.75).abs() < 1e-6);
        assert!((effect.progress() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_splash_never_flashes() {
        let mut queue = EffectQueue::new();
        queue.trigger(EffectKind::Splash, Vec3::ZERO);
        assert!(!queue.active()[0].flash_active());
        queue.clear();
        assert!(queue.is_empty());
    }
}
