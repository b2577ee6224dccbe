//! Soul Player Core
//!
//! Platform-agnostic core types, traits, and error handling shared by the
//! loudness normalization crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `ContentId`, `AudioBuffer`, `PlaybackLane`, `GainRamp`
//! - **Host Traits**: `AudioFetcher`, `AudioDecoder`, `GainLane`
//! - **Error Handling**: Unified `SoulError` and `Result` types
//!
//! The host application owns the actual audio pipeline. It hands the
//! normalizer a way to fetch encoded bytes, a way to decode them, and two
//! gain-controllable output lanes. Nothing in here assumes a particular audio
//! engine.
//!
//! # Example
//!
//! ```rust
//! use soul_core::{AudioBuffer, ContentId, PlaybackLane};
//!
//! let id = ContentId::new("track-42");
//! let buffer = AudioBuffer::new(48_000, vec![vec![0.0; 480], vec![0.0; 480]]).unwrap();
//!
//! assert_eq!(buffer.channel_count(), 2);
//! assert_eq!(PlaybackLane::A.other(), PlaybackLane::B);
//! assert_eq!(id.as_str(), "track-42");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SoulError};
pub use traits::{AudioDecoder, AudioFetcher, GainLane};
pub use types::{AudioBuffer, ContentId, GainRamp, PlaybackLane, SampleRate};
