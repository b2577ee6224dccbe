//! Fetch → decode → measure

use crate::error::{NormalizerError, Result};
use soul_core::{AudioDecoder, AudioFetcher};
use soul_loudness::LoudnessMeasurement;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Turns a source locator into a loudness measurement
///
/// Fetching runs on the async executor. Decoding and measuring are CPU-bound
/// and run on tokio's blocking pool so playback tasks keep being polled.
#[derive(Clone)]
pub struct MeasurementPipeline {
    fetcher: Arc<dyn AudioFetcher>,
    decoder: Arc<dyn AudioDecoder>,
}

impl MeasurementPipeline {
    /// Create a pipeline from host-provided fetcher and decoder
    pub fn new(fetcher: Arc<dyn AudioFetcher>, decoder: Arc<dyn AudioDecoder>) -> Self {
        Self { fetcher, decoder }
    }

    /// Measure the audio at `source`
    ///
    /// # Errors
    /// Returns `Fetch`, `Decode` or `InvalidAudio` from the collaborators, or
    /// `Task` if the blocking worker died
    pub async fn run(&self, source: &str) -> Result<LoudnessMeasurement> {
        let started = Instant::now();

        let bytes = self.fetcher.fetch(source).await?;
        debug!(source, bytes = bytes.len(), "Fetched audio");

        let decoder = Arc::clone(&self.decoder);
        let measurement = tokio::task::spawn_blocking(move || {
            let buffer = decoder.decode(bytes)?;
            debug!(
                sample_rate = buffer.sample_rate(),
                channels = buffer.channel_count(),
                frames = buffer.frames(),
                "Decoded audio"
            );
            Ok::<_, NormalizerError>(soul_loudness::measure(&buffer))
        })
        .await
        .map_err(|e| NormalizerError::Task(e.to_string()))??;

        info!(
            source,
            lufs = measurement.lufs,
            peak_dbfs = measurement.peak_dbfs(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Measured loudness"
        );

        Ok(measurement)
    }
}

impl std::fmt::Debug for MeasurementPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementPipeline").finish_non_exhaustive()
    }
}
