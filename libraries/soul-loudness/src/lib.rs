//! Loudness analysis and normalization gain for Soul Player
//!
//! This crate provides:
//! - K-weighting (ITU-R BS.1770 pre-filter and RLB high-pass)
//! - 400 ms block power accumulation with 75% overlap
//! - Two-stage (absolute + relative) gated integrated loudness in LUFS
//! - Sample peak measurement on the unweighted signal
//! - Peak-capped normalization gain toward a target loudness
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐     ┌────────────┐
//! │ AudioBuffer │ ──► │ K-weighting  │ ──► │ Block powers  │ ──► │   Gating   │
//! └─────────────┘     └──────────────┘     └───────────────┘     └────────────┘
//!        │                                                              │
//!        └──────────────► sample peak ──────────┐                       ▼
//!                                               └──────────► LoudnessMeasurement
//!
//! During Playback:
//! ┌─────────────────────┐     ┌────────────────┐     ┌───────────────┐
//! │ LoudnessMeasurement │ ──► │ GainCalculator │ ──► │  Linear gain  │
//! └─────────────────────┘     └────────────────┘     └───────────────┘
//! ```
//!
//! Everything here is synchronous and CPU-bound. Callers on an async runtime
//! should run [`measure`] on a blocking worker.
//!
//! # Example
//!
//! ```rust
//! use soul_core::AudioBuffer;
//! use soul_loudness::{compute_gain, measure, EBU_R128_STREAMING_LUFS};
//!
//! let rate = 48_000;
//! let sine: Vec<f32> = (0..rate * 2)
//!     .map(|i| 0.25 * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / rate as f32).sin())
//!     .collect();
//! let buffer = AudioBuffer::new(rate, vec![sine]).unwrap();
//!
//! let measurement = measure(&buffer);
//! let gain = compute_gain(Some(&measurement), EBU_R128_STREAMING_LUFS);
//! assert!(gain > 1.0);
//! ```

#![deny(unsafe_code)]

mod analyzer;
pub mod blocks;
mod gain;
pub mod gating;
pub mod kweighting;
mod target;

pub use analyzer::{measure, sample_peak, LoudnessMeasurement};
pub use gain::{
    compute_gain, db_to_linear, linear_to_db, GainCalculator, MAX_GAIN_DB, PEAK_CEILING_DB,
    PEAK_FLOOR,
};
pub use gating::GatedLoudness;
pub use kweighting::{BiquadCoefficients, KWeighting};
pub use target::{NormalizationTarget, MAX_TARGET_LUFS, MIN_TARGET_LUFS};

/// ReplayGain 2.0 reference loudness level (-18 LUFS)
pub const REPLAYGAIN_REFERENCE_LUFS: f64 = -18.0;

/// EBU R128 broadcast reference level (-23 LUFS)
pub const EBU_R128_BROADCAST_LUFS: f64 = -23.0;

/// EBU R128 streaming reference level (-14 LUFS, common for streaming platforms)
pub const EBU_R128_STREAMING_LUFS: f64 = -14.0;
