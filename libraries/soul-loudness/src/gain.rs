//! Normalization gain
//!
//! Turns a measurement and a target loudness into the linear gain for a
//! lane. The gain is capped so the measured peak lands at or under the peak
//! ceiling. Unknown, silent, and absurdly quiet content stays at unity.

use crate::analyzer::LoudnessMeasurement;

/// Highest level the post-gain sample peak may reach, in dBFS
pub const PEAK_CEILING_DB: f64 = -0.5;

/// Gains above this (after the peak cap) fall back to unity, in dB
pub const MAX_GAIN_DB: f64 = 24.0;

/// Floor applied to the linear peak before taking its log
pub const PEAK_FLOOR: f64 = 1e-10;

/// Convert decibels to a linear factor
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a linear factor to decibels
pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * linear.max(PEAK_FLOOR).log10()
}

/// Gain computation with configurable limits
///
/// # Example
///
/// ```rust
/// use soul_loudness::{GainCalculator, LoudnessMeasurement};
///
/// let calc = GainCalculator::default();
/// // Quiet track, lots of headroom: full correction to the target
/// let m = LoudnessMeasurement::new(-20.0, 0.25);
/// assert!((calc.gain_db(Some(&m), -14.0).unwrap() - 6.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainCalculator {
    peak_ceiling_db: f64,
    max_gain_db: f64,
}

impl Default for GainCalculator {
    fn default() -> Self {
        Self {
            peak_ceiling_db: PEAK_CEILING_DB,
            max_gain_db: MAX_GAIN_DB,
        }
    }
}

impl GainCalculator {
    /// Create a calculator with a custom ceiling and boost limit
    pub fn new(peak_ceiling_db: f64, max_gain_db: f64) -> Self {
        Self {
            peak_ceiling_db,
            max_gain_db,
        }
    }

    /// Peak ceiling in dBFS
    pub fn peak_ceiling_db(&self) -> f64 {
        self.peak_ceiling_db
    }

    /// Boost limit in dB
    pub fn max_gain_db(&self) -> f64 {
        self.max_gain_db
    }

    /// Gain in dB to apply, or `None` when the lane should stay at unity
    pub fn gain_db(&self, measurement: Option<&LoudnessMeasurement>, target_lufs: f64) -> Option<f64> {
        let measurement = measurement?;
        if !measurement.lufs.is_finite() || !target_lufs.is_finite() {
            return None;
        }

        let peak_db = 20.0 * measurement.peak.max(PEAK_FLOOR).log10();
        let max_for_peak = self.peak_ceiling_db - peak_db;
        let gain_db = (target_lufs - measurement.lufs).min(max_for_peak);

        if gain_db > self.max_gain_db {
            return None;
        }
        Some(gain_db)
    }

    /// Linear gain to apply (1.0 for unity)
    pub fn linear_gain(&self, measurement: Option<&LoudnessMeasurement>, target_lufs: f64) -> f64 {
        self.gain_db(measurement, target_lufs)
            .map_or(1.0, db_to_linear)
    }
}

/// Linear normalization gain with the default limits
///
/// Pure; the same inputs always give the same gain.
pub fn compute_gain(measurement: Option<&LoudnessMeasurement>, target_lufs: f64) -> f64 {
    GainCalculator::default().linear_gain(measurement, target_lufs)
}
