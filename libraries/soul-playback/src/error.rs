//! Error types for loudness normalization

use soul_core::SoulError;
use thiserror::Error;

/// Normalizer errors
///
/// `Clone` because one in-flight measurement outcome is handed to every
/// caller that joined it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizerError {
    /// Fetching the encoded audio failed
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Decoding the audio failed
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Decoded audio was not usable
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    /// A lane's gain stage could not be prepared
    #[error("Lane error: {0}")]
    Lane(String),

    /// The background measurement task died
    #[error("Measurement task failed: {0}")]
    Task(String),

    /// The normalizer has been torn down
    #[error("Normalizer has been torn down")]
    TornDown,
}

impl From<SoulError> for NormalizerError {
    fn from(err: SoulError) -> Self {
        match err {
            SoulError::Fetch(msg) => Self::Fetch(msg),
            SoulError::Io(e) => Self::Fetch(e.to_string()),
            SoulError::Decode(msg) => Self::Decode(msg),
            SoulError::InvalidInput(msg) => Self::InvalidAudio(msg),
            SoulError::Lane(msg) => Self::Lane(msg),
        }
    }
}

/// Result type for normalizer operations
pub type Result<T> = std::result::Result<T, NormalizerError>;
