//! Normalizer configuration

use serde::{Deserialize, Serialize};
use soul_loudness::{GainCalculator, EBU_R128_STREAMING_LUFS, MAX_GAIN_DB, PEAK_CEILING_DB};
use std::time::Duration;

/// Runtime configuration, changed through `LoudnessNormalizer::configure`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Whether normalization is active
    #[serde(default)]
    pub enabled: bool,

    /// Loudness every track is brought toward, in LUFS
    #[serde(default = "default_target_lufs")]
    pub target_lufs: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target_lufs: default_target_lufs(),
        }
    }
}

/// Fixed tuning chosen when the normalizer is built
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizerSettings {
    /// Gain ramp length in milliseconds
    #[serde(default = "default_ramp_ms")]
    pub ramp_ms: u64,

    /// Highest post-gain sample peak, in dBFS
    #[serde(default = "default_peak_ceiling_db")]
    pub peak_ceiling_db: f64,

    /// Boosts beyond this fall back to unity, in dB
    #[serde(default = "default_max_gain_db")]
    pub max_gain_db: f64,
}

impl NormalizerSettings {
    /// Ramp length as a `Duration`
    pub fn ramp(&self) -> Duration {
        Duration::from_millis(self.ramp_ms)
    }

    /// Gain calculator using these limits
    pub fn calculator(&self) -> GainCalculator {
        GainCalculator::new(self.peak_ceiling_db, self.max_gain_db)
    }
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            ramp_ms: default_ramp_ms(),
            peak_ceiling_db: default_peak_ceiling_db(),
            max_gain_db: default_max_gain_db(),
        }
    }
}

// Default values
fn default_target_lufs() -> f64 {
    EBU_R128_STREAMING_LUFS
}

fn default_ramp_ms() -> u64 {
    400
}

fn default_peak_ceiling_db() -> f64 {
    PEAK_CEILING_DB
}

fn default_max_gain_db() -> f64 {
    MAX_GAIN_DB
}
