/// Audio-specific errors
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server returned {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Source locator uses a scheme we cannot fetch
    #[error("Unsupported source scheme: {0}")]
    UnsupportedScheme(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Container has no decodable audio track
    #[error("No audio tracks found")]
    NoAudioTrack,

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Invalid audio buffer
    #[error("Invalid audio buffer: {0}")]
    InvalidBuffer(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Symphonia error
    #[error("Symphonia error: {0}")]
    Symphonia(String),
}

impl AudioError {
    /// Whether the failure happened while fetching (as opposed to decoding)
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            Self::Request(_)
                | Self::HttpStatus { .. }
                | Self::UnsupportedScheme(_)
                | Self::FileNotFound(_)
                | Self::Io(_)
        )
    }
}

impl From<AudioError> for soul_core::SoulError {
    fn from(err: AudioError) -> Self {
        if err.is_fetch() {
            soul_core::SoulError::fetch(err.to_string())
        } else {
            soul_core::SoulError::decode(err.to_string())
        }
    }
}
