//! Data-driven game balance
//!
//! Every tunable number the simulation reads lives here. Defaults match the
//! shipped game; a JSON file can override any subset of fields.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure while loading or saving a tuning file
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tuning json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value: {0}")]
    Invalid(&'static str),
}

/// Game balance parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Seed for the simulation RNG
    pub seed: u64,

    // === World ===
    /// Playable river width (craft crashes beyond ±width/2)
    pub river_width: f32,
    /// Entities spawn this far ahead of the craft
    pub spawn_distance: f32,
    /// Entities this far behind the craft are recycled
    pub recycle_margin: f32,

    // === Pools ===
    pub island_slots: usize,
    pub bridge_slots: usize,
    pub pickup_slots: usize,
    /// No new obstacle spawns while this many are active
    pub obstacle_ceiling: usize,
    /// Per-frame obstacle spawn chance per unit of craft speed
    pub obstacle_spawn_rate: f32,
    /// Seconds between fuel pickup spawns
    pub pickup_interval: f32,
    /// Fuel pickups hover at this height
    pub pickup_height: f32,

    // === Craft ===
    pub max_speed: f32,
    /// Speed gained per second while accelerating
    pub acceleration: f32,
    /// Speed lost per second while braking (half of it while coasting)
    pub deceleration: f32,
    /// Sideways movement per unit of speed per second
    pub lateral_factor: f32,

    // === Fuel & score ===
    pub fuel_capacity: f32,
    /// Fuel burned per second of flight
    pub fuel_drain: f32,
    /// Fuel restored by one pickup
    pub fuel_per_pickup: f32,
    /// Score per unit of speed per second
    pub distance_score: f32,
    /// Score bonus for collecting fuel
    pub pickup_score: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            seed: 0x5eed_0f_a11,

            river_width: 10.0,
            spawn_distance: 100.0,
            recycle_margin: 20.0,

            island_slots: 10,
            bridge_slots: 3,
            pickup_slots: 5,
            obstacle_ceiling: 15,
            obstacle_spawn_rate: 0.01,
            pickup_interval: 10.0,
            pickup_height: 1.5,

            // Per-second rates (per-frame values at 60 fps, scaled)
            max_speed: 2.0,
            acceleration: 3.0,
            deceleration: 1.8,
            lateral_factor: 0.5,

            fuel_capacity: 100.0,
            fuel_drain: 5.0,
            fuel_per_pickup: 25.0,
            distance_score: 10.0,
            pickup_score: 100,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON (missing fields fall back to defaults)
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Total obstacle slots (islands + bridges)
    pub fn obstacle_slots(&self) -> usize {
        self.island_slots + self.bridge_slots
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        if !(self.river_width > 0.0) {
            return Err(TuningError::Invalid("river_width must be positive"));
        }
        if !(self.spawn_distance > 0.0) {
            return Err(TuningError::Invalid("spawn_distance must be positive"));
        }
        if !(self.recycle_margin >= 0.0) {
            return Err(TuningError::Invalid("recycle_margin must not be negative"));
        }
        if !(self.pickup_interval > 0.0) {
            return Err(TuningError::Invalid("pickup_interval must be positive"));
        }
        if !(self.obstacle_spawn_rate >= 0.0) {
            return Err(TuningError::Invalid("obstacle_spawn_rate must not be negative"));
        }
        if !(self.fuel_capacity > 0.0) {
            return Err(TuningError::Invalid("fuel_capacity must be positive"));
        }
        Ok(())
    }
}
