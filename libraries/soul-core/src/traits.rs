/// Host-collaborator traits
///
/// The normalizer never touches the network, codecs, or the audio graph
/// directly. The host hands it implementations of these traits.
use crate::error::Result;
use crate::types::{AudioBuffer, ContentId, GainRamp};
use async_trait::async_trait;

/// Fetches raw encoded audio bytes for a source locator (URL or path)
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Fetch the complete encoded payload
    ///
    /// # Errors
    /// Returns `SoulError::Fetch` on transport failure or a non-success response
    async fn fetch(&self, source: &str) -> Result<Vec<u8>>;
}

/// Decodes encoded audio bytes into a planar `AudioBuffer`
///
/// Decoding is CPU-bound and is called from a blocking worker, never from the
/// async executor.
pub trait AudioDecoder: Send + Sync {
    /// Decode the whole payload
    ///
    /// # Errors
    /// Returns `SoulError::Decode` on malformed or unsupported input
    fn decode(&self, bytes: Vec<u8>) -> Result<AudioBuffer>;
}

/// A gain-controllable playback lane provided by the host
///
/// Each lane is only ever driven by its own apply/reset calls, so
/// implementations only need whatever synchronization their audio primitive
/// requires internally.
pub trait GainLane: Send + Sync {
    /// One-time setup of the lane's gain stage
    ///
    /// Called lazily before the first ramp. The router guarantees it runs at
    /// most once per lane unless it fails.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Schedule a smooth ramp toward `ramp.target`
    fn ramp_gain(&self, ramp: GainRamp);

    /// The content currently assigned to this lane by the host
    fn assigned_content_id(&self) -> Option<ContentId>;

    /// Release the lane's gain stage (teardown)
    fn release(&self) {}
}
