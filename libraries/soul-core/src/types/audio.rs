/// Audio-related types
use crate::error::{Result, SoulError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Common sample rates
    pub const CD_QUALITY: Self = Self(44_100);
    pub const DVD_QUALITY: Self = Self(48_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }
}

/// Decoded multichannel PCM audio
///
/// Samples are stored planar (one `Vec` per channel) as f32 in the nominal
/// range [-1.0, 1.0]. Every channel holds the same number of frames; the
/// constructors enforce this so downstream analysis never has to.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: SampleRate,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a buffer from per-channel sample vectors
    ///
    /// # Errors
    /// Returns `InvalidInput` for a zero sample rate, no channels, or channels
    /// of differing lengths
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SoulError::invalid_input("sample rate must be non-zero"));
        }
        let Some(first) = channels.first() else {
            return Err(SoulError::invalid_input("audio buffer needs at least one channel"));
        };
        let frames = first.len();
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != frames)
        {
            return Err(SoulError::invalid_input(format!(
                "channel {} has {} samples, expected {}",
                index,
                channel.len(),
                frames
            )));
        }

        Ok(Self {
            sample_rate: SampleRate::new(sample_rate),
            channels,
        })
    }

    /// Create a buffer from interleaved samples (`[L, R, L, R, ...]`)
    ///
    /// # Errors
    /// Returns `InvalidInput` if the sample count is not divisible by the
    /// channel count, or for the same reasons as [`AudioBuffer::new`]
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(SoulError::invalid_input("audio buffer needs at least one channel"));
        }
        let channel_count = channels as usize;
        if samples.len() % channel_count != 0 {
            return Err(SoulError::invalid_input(format!(
                "sample count {} is not divisible by channel count {}",
                samples.len(),
                channel_count
            )));
        }

        let frames = samples.len() / channel_count;
        let mut planar = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in planar.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self::new(sample_rate, planar)
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.as_hz()
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Samples of one channel
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All channels, planar
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Playback duration of the buffer
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate.as_hz()))
    }

    /// Check if the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rate_common_values() {
        assert_eq!(SampleRate::CD_QUALITY.as_hz(), 44_100);
        assert_eq!(SampleRate::DVD_QUALITY.as_hz(), 48_000);
    }

    #[test]
    fn rejects_mismatched_channel_lengths() {
        let result = AudioBuffer::new(44_100, vec![vec![0.0; 10], vec![0.0; 9]]);
        assert!(matches!(result, Err(SoulError::InvalidInput(_))));
    }

    #[test]
    fn rejects_zero_rate_and_no_channels() {
        assert!(AudioBuffer::new(0, vec![vec![0.0; 4]]).is_err());
        assert!(AudioBuffer::new(44_100, Vec::new()).is_err());
    }

    #[test]
    fn deinterleaves_stereo() {
        let buffer = AudioBuffer::from_interleaved(&[0.1, -0.1, 0.2, -0.2], 2, 48_000).unwrap();
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0).unwrap(), &[0.1, 0.2]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.1, -0.2]);
        assert!(buffer.channel(2).is_none());
    }

    #[test]
    fn interleaved_length_must_divide() {
        assert!(AudioBuffer::from_interleaved(&[0.0; 5], 2, 48_000).is_err());
        assert!(AudioBuffer::from_interleaved(&[0.0; 4], 0, 48_000).is_err());
    }

    #[test]
    fn audio_buffer_duration() {
        // 44100 frames = 1 second
        let buffer = AudioBuffer::new(44_100, vec![vec![0.0; 44_100]; 2]).unwrap();
        assert!((buffer.duration().as_secs_f64() - 1.0).abs() < 1e-9);
        assert!(!buffer.is_empty());
    }
}
