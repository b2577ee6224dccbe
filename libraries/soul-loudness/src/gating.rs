//! Two-stage gating (ITU-R BS.1770-4, section 2.8)
//!
//! 1. Drop blocks at or below the absolute gate (-70 LUFS).
//! 2. Average what is left to get the ungated loudness.
//! 3. Drop blocks more than 10 LU below that.
//! 4. Average the remaining blocks to get the integrated loudness.
//!
//! The relative threshold is derived from the absolute-gate survivors only.
//! Changing that order changes the result and breaks comparability with
//! reference meters.

/// Absolute gate threshold in LUFS
pub const ABSOLUTE_GATE_LUFS: f64 = -70.0;

/// Relative gate offset from the ungated loudness, in LU
pub const RELATIVE_GATE_LU: f64 = -10.0;

/// Offset in the BS.1770 loudness formula, `L = -0.691 + 10 log10(z)`
pub const LOUDNESS_OFFSET: f64 = -0.691;

/// Convert a mean-square block power to LUFS
pub fn power_to_lufs(power: f64) -> f64 {
    LOUDNESS_OFFSET + 10.0 * power.log10()
}

/// Convert LUFS back to the equivalent block power
pub fn lufs_to_power(lufs: f64) -> f64 {
    10.0_f64.powf((lufs - LOUDNESS_OFFSET) / 10.0)
}

/// Outcome of gating a sequence of block powers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatedLoudness {
    /// Integrated (relative-gated) loudness; `-inf` if nothing passed the absolute gate
    pub integrated_lufs: f64,
    /// Loudness of the absolute-gate survivors; `-inf` if there were none
    pub ungated_lufs: f64,
    /// Number of blocks fed in
    pub total_blocks: usize,
    /// Blocks that passed the absolute gate
    pub absolute_survivors: usize,
    /// Blocks that passed both gates
    pub relative_survivors: usize,
}

impl GatedLoudness {
    /// Gate `powers` and compute the integrated loudness
    pub fn from_block_powers(powers: &[f64]) -> Self {
        let absolute_threshold = lufs_to_power(ABSOLUTE_GATE_LUFS);
        let above_absolute: Vec<f64> = powers
            .iter()
            .copied()
            .filter(|&p| p > absolute_threshold)
            .collect();

        if above_absolute.is_empty() {
            return Self {
                integrated_lufs: f64::NEG_INFINITY,
                ungated_lufs: f64::NEG_INFINITY,
                total_blocks: powers.len(),
                absolute_survivors: 0,
                relative_survivors: 0,
            };
        }

        let ungated_lufs = power_to_lufs(mean(&above_absolute));
        let relative_threshold = lufs_to_power(ungated_lufs + RELATIVE_GATE_LU);
        let above_relative: Vec<f64> = above_absolute
            .iter()
            .copied()
            .filter(|&p| p >= relative_threshold)
            .collect();

        // The loudest block is never below the mean, so this only triggers on
        // rounding. Fall back to the ungated value rather than report silence.
        let integrated_lufs = if above_relative.is_empty() {
            ungated_lufs
        } else {
            power_to_lufs(mean(&above_relative))
        };

        Self {
            integrated_lufs,
            ungated_lufs,
            total_blocks: powers.len(),
            absolute_survivors: above_absolute.len(),
            relative_survivors: above_relative.len(),
        }
    }

    /// True when no block passed the absolute gate
    pub fn is_silent(&self) -> bool {
        self.absolute_survivors == 0
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
