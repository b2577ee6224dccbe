/// CLI error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid target loudness: {0}")]
    InvalidTarget(String),

    #[error("Audio error: {0}")]
    Audio(#[from] soul_audio::AudioError),

    #[error("Normalizer error: {0}")]
    Normalizer(#[from] soul_playback::NormalizerError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("WAV output error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
