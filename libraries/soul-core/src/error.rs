/// Core error types for Soul Player
use thiserror::Error;

/// Result type alias using `SoulError`
pub type Result<T> = std::result::Result<T, SoulError>;

/// Core error type shared by the host-collaborator traits
#[derive(Error, Debug)]
pub enum SoulError {
    /// Fetching encoded audio bytes failed (network, missing file, bad status)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Decoding bytes into PCM failed (corrupt or unsupported input)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A playback lane could not be prepared
    #[error("Lane error: {0}")]
    Lane(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SoulError {
    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a lane error
    pub fn lane(msg: impl Into<String>) -> Self {
        Self::Lane(msg.into())
    }
}
