/// Audio decoder implementation using Symphonia
use crate::error::{AudioError, Result};
use soul_core::{AudioBuffer, AudioDecoder};
use std::io::Cursor;
use symphonia::core::audio::{AudioBuffer as SymphoniaBuffer, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Audio decoder using Symphonia
///
/// Supports: MP3, FLAC, OGG, WAV, AAC
///
/// Unlike a playback decoder this never downmixes: loudness weighting needs
/// every channel, so the output keeps the source layout, planar.
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    /// Optional file extension to help the probe
    extension: Option<String>,
}

impl SymphoniaDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self { extension: None }
    }

    /// Create a decoder that hints the container format by extension
    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: Some(extension.into()),
        }
    }

    /// Decode a complete encoded payload
    pub fn decode_bytes(&self, bytes: Vec<u8>) -> Result<AudioBuffer> {
        if bytes.is_empty() {
            return Err(AudioError::DecodeError("empty payload".to_string()));
        }

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = &self.extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::Symphonia(format!("Failed to probe payload: {}", e)))?;

        let mut format = probed.format;

        let track = format.default_track().ok_or(AudioError::NoAudioTrack)?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Symphonia(format!("Failed to create decoder: {}", e)))?;

        let mut channels: Vec<Vec<f32>> = Vec::new();
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                // End of this logical stream
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(AudioError::Symphonia(format!("Error reading packet: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // A single corrupt packet is recoverable
                    skipped_packets += 1;
                    debug!(error = %e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(AudioError::DecodeError(e.to_string())),
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);

            let mut planar = SymphoniaBuffer::<f32>::new(decoded.capacity() as u64, spec);
            decoded.convert(&mut planar);

            let channel_count = spec.channels.count();
            if channels.is_empty() {
                channels = vec![Vec::new(); channel_count];
            } else if channels.len() != channel_count {
                return Err(AudioError::DecodeError(format!(
                    "channel count changed mid-stream ({} -> {})",
                    channels.len(),
                    channel_count
                )));
            }

            for (index, channel) in channels.iter_mut().enumerate() {
                // Float sources can carry overs; keep within full scale
                channel.extend(planar.chan(index).iter().map(|s| s.clamp(-1.0, 1.0)));
            }
        }

        if skipped_packets > 0 {
            warn!(skipped_packets, "Decoded with corrupt packets skipped");
        }

        let sample_rate = sample_rate.ok_or_else(|| {
            AudioError::DecodeError("stream does not declare a sample rate".to_string())
        })?;
        if channels.is_empty() {
            return Err(AudioError::DecodeError("no audio frames decoded".to_string()));
        }

        let buffer = AudioBuffer::new(sample_rate, channels)
            .map_err(|e| AudioError::InvalidBuffer(e.to_string()))?;

        debug!(
            sample_rate,
            channels = buffer.channel_count(),
            frames = buffer.frames(),
            "Decoded audio payload"
        );

        Ok(buffer)
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: Vec<u8>) -> soul_core::Result<AudioBuffer> {
        Ok(self.decode_bytes(bytes)?)
    }
}
