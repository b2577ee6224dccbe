//! Integrated loudness measurement
//!
//! Runs a decoded buffer through K-weighting, block power accumulation and
//! two-stage gating, and pairs the result with the sample peak of the
//! unweighted signal.

use crate::blocks::block_powers;
use crate::gating::GatedLoudness;
use crate::kweighting::KWeighting;
use serde::{Deserialize, Serialize};
use soul_core::AudioBuffer;
use std::fmt;
use tracing::debug;

/// Loudness of one piece of content
///
/// `lufs` is `-inf` when no block passed the absolute gate (silence or near
/// silence). That is a normal value, not an error; analysis failures are
/// reported separately and never folded into it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessMeasurement {
    /// Integrated loudness in LUFS, or `-inf`
    pub lufs: f64,
    /// Sample peak, linear (1.0 = full scale)
    pub peak: f64,
}

impl LoudnessMeasurement {
    /// Create a measurement
    pub fn new(lufs: f64, peak: f64) -> Self {
        Self { lufs, peak }
    }

    /// True when the content produced no gated loudness
    pub fn is_silent(&self) -> bool {
        self.lufs == f64::NEG_INFINITY
    }

    /// Sample peak in dBFS (`-inf` for a zero peak)
    pub fn peak_dbfs(&self) -> f64 {
        if self.peak > 0.0 {
            20.0 * self.peak.log10()
        } else {
            f64::NEG_INFINITY
        }
    }
}

impl fmt::Display for LoudnessMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_silent() {
            write!(f, "Loudness: silent, Sample Peak: {:.1} dBFS", self.peak_dbfs())
        } else {
            write!(
                f,
                "Loudness: {:.1} LUFS, Sample Peak: {:.1} dBFS",
                self.lufs,
                self.peak_dbfs()
            )
        }
    }
}

/// Maximum absolute sample across all channels of the unweighted buffer
///
/// This is a sample peak, not an oversampled true peak, so inter-sample
/// overs are not seen.
pub fn sample_peak(buffer: &AudioBuffer) -> f64 {
    buffer
        .channels()
        .iter()
        .flat_map(|channel| channel.iter())
        .fold(0.0_f64, |peak, &s| peak.max(f64::from(s.abs())))
}

/// Measure integrated loudness and sample peak of `buffer`
///
/// CPU-bound and O(samples); keep it off latency-sensitive threads.
pub fn measure(buffer: &AudioBuffer) -> LoudnessMeasurement {
    let sample_rate = buffer.sample_rate();
    let filter = KWeighting::for_sample_rate(sample_rate);

    let weighted: Vec<Vec<f64>> = buffer
        .channels()
        .iter()
        .map(|channel| filter.apply(channel))
        .collect();

    let powers = block_powers(&weighted, sample_rate);
    let gated = GatedLoudness::from_block_powers(&powers);
    let peak = sample_peak(buffer);

    debug!(
        sample_rate,
        channels = buffer.channel_count(),
        frames = buffer.frames(),
        blocks = gated.total_blocks,
        absolute_survivors = gated.absolute_survivors,
        relative_survivors = gated.relative_survivors,
        lufs = gated.integrated_lufs,
        peak,
        "Measured integrated loudness"
    );

    LoudnessMeasurement::new(gated.integrated_lufs, peak)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(amplitude: f32, freq: f32, rate: u32, seconds: f32) -> Vec<f32> {
        let n = (rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn digital_silence() {
        let buffer = AudioBuffer::new(44_100, vec![vec![0.0; 44_100]; 2]).unwrap();
        let m = measure(&buffer);
        assert!(m.is_silent());
        assert_eq!(m.peak, 0.0);
    }

    #[test]
    fn below_absolute_gate_keeps_real_peak() {
        // -80 dBFS sine sits well under the -70 LUFS gate
        let quiet = sine(0.0001, 1000.0, 48_000, 1.0);
        let buffer = AudioBuffer::new(48_000, vec![quiet]).unwrap();
        let m = measure(&buffer);

        assert!(m.is_silent());
        assert!((m.peak - 0.0001).abs() < 1e-6);
    }

    #[test]
    fn shorter_than_one_block_is_silent() {
        let buffer = AudioBuffer::new(48_000, vec![sine(0.5, 1000.0, 48_000, 0.3)]).unwrap();
        let m = measure(&buffer);
        assert!(m.is_silent());
        assert!(m.peak > 0.49);
    }

    #[test]
    fn full_scale_sine_measures_minus_three() {
        let buffer = AudioBuffer::new(48_000, vec![sine(1.0, 1000.0, 48_000, 3.0)]).unwrap();
        let m = measure(&buffer);
        assert!((m.lufs - -3.01).abs() < 0.1, "got {:.3} LUFS", m.lufs);
        assert!(m.peak > 0.99 && m.peak <= 1.0);
    }

    #[test]
    fn stereo_is_three_db_louder_than_mono() {
        let tone = sine(0.1, 1000.0, 48_000, 2.0);
        let mono = measure(&AudioBuffer::new(48_000, vec![tone.clone()]).unwrap());
        let stereo = measure(&AudioBuffer::new(48_000, vec![tone.clone(), tone]).unwrap());
        assert!((stereo.lufs - mono.lufs - 3.01).abs() < 0.05);
    }

    #[test]
    fn peak_uses_unweighted_signal() {
        let mut left = vec![0.0_f32; 48_000];
        left[100] = -0.75;
        let right = vec![0.25_f32; 48_000];
        let buffer = AudioBuffer::new(48_000, vec![left, right]).unwrap();
        assert_eq!(sample_peak(&buffer), 0.75);
    }

    #[test]
    fn display_formats() {
        let loud = LoudnessMeasurement::new(-14.04, 0.5);
        assert_eq!(loud.to_string(), "Loudness: -14.0 LUFS, Sample Peak: -6.0 dBFS");

        let silent = LoudnessMeasurement::new(f64::NEG_INFINITY, 0.0);
        assert!(silent.to_string().contains("silent"));
    }
}
