use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BeatSyncError, Result};

/// Distance (in world units) melodic objects spend in their warmup approach.
pub const BEAT_WARMUP_DISTANCE: f64 = 25.0;
/// Speed (world units per second) of the warmup approach.
pub const BEAT_WARMUP_SPEED: f64 = 155.0;
/// Time a melodic object needs to cover the warmup distance. Melodic entries
/// are dispatched this much earlier than obstacles and cues.
pub const WARMUP_OFFSET_MS: f64 = BEAT_WARMUP_DISTANCE / BEAT_WARMUP_SPEED * 1000.0;

pub const DEFAULT_ANTICIPATION_MS: f64 = 2000.0;
pub const DEFAULT_BEAT_SPEED: f32 = 4.0;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub pools: PoolConfig,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.session.validate()
    }
}

/// Timing parameters for a playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How far the lookahead clock leads the playback clock.
    pub anticipation_ms: f64,
    /// Approach speed of presented objects, in world units per second.
    pub beat_speed: f32,
    /// Lead subtracted from the melodic dispatch window only.
    pub warmup_offset_ms: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            anticipation_ms: DEFAULT_ANTICIPATION_MS,
            beat_speed: DEFAULT_BEAT_SPEED,
            warmup_offset_ms: WARMUP_OFFSET_MS,
        }
    }
}

impl SessionConfig {
    pub fn anticipation_seconds(&self) -> f32 {
        (self.anticipation_ms / 1000.0) as f32
    }

    pub fn validate(&self) -> Result<()> {
        if !self.anticipation_ms.is_finite() || self.anticipation_ms < 0.0 {
            return Err(BeatSyncError::Config(format!(
                "anticipation_ms must be a non-negative number, got {}",
                self.anticipation_ms
            )));
        }
        if !self.beat_speed.is_finite() || self.beat_speed <= 0.0 {
            return Err(BeatSyncError::Config(format!(
                "beat_speed must be positive, got {}",
                self.beat_speed
            )));
        }
        if !self.warmup_offset_ms.is_finite() || self.warmup_offset_ms < 0.0 {
            return Err(BeatSyncError::Config(format!(
                "warmup_offset_ms must be a non-negative number, got {}",
                self.warmup_offset_ms
            )));
        }
        Ok(())
    }
}

/// Capacity of each in-memory pool built by [`crate::PoolSet::from_config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Capacity of each arrow pool (one per color).
    pub arrow: usize,
    /// Capacity of each dot pool (one per color).
    pub dot: usize,
    pub mine: usize,
    pub wall: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            arrow: 20,
            dot: 10,
            mine: 10,
            wall: 10,
        }
    }
}
