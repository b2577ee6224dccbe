//! Soul Loudness - command-line loudness measurement and normalization
//!
//! Thin host around `soul-playback`: real HTTP/file fetching and Symphonia
//! decoding, two `GainNode` lanes, configuration from a TOML file plus
//! `SOUL_LOUDNESS_*` environment variables.

pub mod config;
pub mod error;
pub mod session;

pub use config::CliConfig;
pub use error::{CliError, Result};
pub use session::{MeasureReport, RenderReport, Session};
