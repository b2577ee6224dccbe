//! Soul Player Audio
//!
//! Default host collaborators for loudness analysis:
//! - [`SourceFetcher`]: loads encoded bytes from `http(s)://` URLs (reqwest),
//!   `file://` URLs, or plain filesystem paths (tokio)
//! - [`SymphoniaDecoder`]: decodes MP3, FLAC, OGG/Vorbis, WAV and AAC bytes
//!   into a planar [`soul_core::AudioBuffer`], keeping every channel
//!
//! Hosts with their own network stack or codecs implement
//! [`soul_core::AudioFetcher`] / [`soul_core::AudioDecoder`] instead.
//!
//! # Example: Fetch and decode
//!
//! ```rust,no_run
//! use soul_audio::{SourceFetcher, SymphoniaDecoder};
//! use soul_core::{AudioDecoder, AudioFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = SourceFetcher::new()?;
//! let bytes = fetcher.fetch("/music/song.flac").await?;
//!
//! let buffer = SymphoniaDecoder::new().decode(bytes)?;
//! println!("{} channels at {} Hz", buffer.channel_count(), buffer.sample_rate());
//! # Ok(())
//! # }
//! ```

mod decoder;
mod error;
mod fetch;

pub use decoder::SymphoniaDecoder;
pub use error::{AudioError, Result};
pub use fetch::SourceFetcher;
