//! Soul Player - Loudness Normalization Runtime
//!
//! Brings every track in a dual-lane (crossfading) player to a common
//! perceived loudness:
//! - Measures each track once (EBU R128 / BS.1770 via `soul-loudness`)
//! - Deduplicates concurrent measurements of the same content
//! - Ramps each lane's gain smoothly toward target minus measured loudness
//! - Never applies a measurement to a lane that has moved on to other content
//!
//! # Architecture
//!
//! ```text
//! LoudnessNormalizer
//!   ├── MeasurementCache    ContentId → in-flight | cached
//!   ├── MeasurementPipeline AudioFetcher → AudioDecoder → measure()
//!   └── LaneRouter          PlaybackLane::{A, B} → GainLane
//! ```
//!
//! The host supplies the collaborators through `soul-core` traits:
//! an `AudioFetcher`, an `AudioDecoder` and two `GainLane`s. `GainNode` is a
//! ready-made lane for hosts that run their own sample loop.
//!
//! Everything here needs a tokio runtime: measurements run as tokio tasks and
//! decoding runs on the blocking pool.

pub mod cache;
pub mod config;
pub mod error;
pub mod gain_node;
pub mod lanes;
pub mod normalizer;
pub mod pipeline;

pub use cache::MeasurementCache;
pub use config::{NormalizerConfig, NormalizerSettings};
pub use error::{NormalizerError, Result};
pub use gain_node::GainNode;
pub use lanes::{LaneRouter, LaneState};
pub use normalizer::{ApplyOutcome, LoudnessNormalizer};
pub use pipeline::MeasurementPipeline;
