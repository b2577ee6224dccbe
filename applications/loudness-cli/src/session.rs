//! Measurement and rendering built on the playback normalizer

use crate::config::CliConfig;
use crate::error::Result;
use futures_util::future::join_all;
use serde::Serialize;
use soul_audio::{AudioError, SourceFetcher, SymphoniaDecoder};
use soul_core::{AudioBuffer, ContentId, PlaybackLane};
use soul_loudness::{linear_to_db, LoudnessMeasurement};
use soul_playback::{GainNode, LaneRouter, LoudnessNormalizer};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of measuring one source
#[derive(Debug, Clone, Serialize)]
pub struct MeasureReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lufs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_dbfs: Option<f64>,
    /// Gain that would be applied at the configured target, in dB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain_db: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of rendering a normalized copy
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub source: String,
    pub output: String,
    pub gain_db: f64,
    pub frames: usize,
}

/// A normalizer wired to real fetch/decode and two `GainNode` lanes
pub struct Session {
    normalizer: LoudnessNormalizer,
    fetcher: Arc<SourceFetcher>,
    lane_a: Arc<GainNode>,
    lane_b: Arc<GainNode>,
    target_lufs: f64,
}

impl Session {
    /// Build an enabled normalizer from configuration
    pub fn new(config: &CliConfig) -> Result<Self> {
        let target_lufs = config.target()?.lufs();
        let fetcher = Arc::new(SourceFetcher::with_timeout(config.fetch.timeout())?);
        let lane_a = Arc::new(GainNode::new());
        let lane_b = Arc::new(GainNode::new());

        let normalizer = LoudnessNormalizer::with_settings(
            LaneRouter::new(lane_a.clone(), lane_b.clone()),
            fetcher.clone(),
            Arc::new(SymphoniaDecoder::new()),
            config.settings,
        );
        normalizer.configure(true, target_lufs);

        Ok(Self {
            normalizer,
            fetcher,
            lane_a,
            lane_b,
            target_lufs,
        })
    }

    pub fn normalizer(&self) -> &LoudnessNormalizer {
        &self.normalizer
    }

    pub fn target_lufs(&self) -> f64 {
        self.target_lufs
    }

    /// Measure every source concurrently
    ///
    /// Duplicate sources are measured once. Failures are reported per
    /// source rather than aborting the batch.
    pub async fn measure_all(&self, sources: &[String]) -> Vec<MeasureReport> {
        let calculator = self.normalizer.settings().calculator();
        let ids: Vec<ContentId> = sources.iter().map(|s| ContentId::new(s.as_str())).collect();

        let results = join_all(
            sources
                .iter()
                .zip(&ids)
                .map(|(source, id)| self.normalizer.measure(source, id)),
        )
        .await;

        sources
            .iter()
            .zip(results)
            .map(|(source, result)| match result {
                Ok(measurement) => MeasureReport {
                    source: source.clone(),
                    lufs: (!measurement.is_silent()).then_some(measurement.lufs),
                    peak_dbfs: Some(measurement.peak_dbfs()),
                    gain_db: Some(
                        calculator
                            .gain_db(Some(&measurement), self.target_lufs)
                            .unwrap_or(0.0),
                    ),
                    error: None,
                },
                Err(e) => {
                    warn!(source = %source, error = %e, "Measurement failed");
                    MeasureReport {
                        source: source.clone(),
                        lufs: None,
                        peak_dbfs: None,
                        gain_db: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect()
    }

    /// Write a normalized 32-bit float WAV of `source` to `output`
    ///
    /// The source is fetched and decoded once. Unless it was measured
    /// earlier in this session, the decoded buffer is measured in place and
    /// recorded with the normalizer. The audio then passes through lane A's
    /// `GainNode` exactly as it would during playback, so a non-zero ramp
    /// setting fades in from unity.
    pub async fn render(&self, source: &str, output: &Path) -> Result<RenderReport> {
        let id = ContentId::new(source);
        let cached = self.normalizer.cached_measurement(&id);

        let bytes = self.fetcher.fetch_bytes(source).await?;
        let measure = cached.is_none();
        let (buffer, measured) = tokio::task::spawn_blocking(move || {
            let buffer = SymphoniaDecoder::new().decode_bytes(bytes)?;
            let measured = measure.then(|| soul_loudness::measure(&buffer));
            Ok::<_, AudioError>((buffer, measured))
        })
        .await??;
        if let Some(measurement) = measured {
            self.normalizer.record_measurement(&id, measurement);
        }

        self.lane_a.assign(Some(id.clone()));
        let gain = match self.normalizer.apply_gain(PlaybackLane::A, &id) {
            Some(gain) => gain,
            None => {
                warn!(source, "Normalization not applied, rendering at unity");
                1.0
            }
        };

        let mut samples = interleave(&buffer);
        self.lane_a
            .process(&mut samples, buffer.channel_count(), buffer.sample_rate());
        write_wav(output, &buffer, &samples)?;

        let report = RenderReport {
            source: source.to_string(),
            output: output.display().to_string(),
            gain_db: linear_to_db(f64::from(gain)),
            frames: buffer.frames(),
        };
        info!(
            source,
            output = %report.output,
            gain_db = report.gain_db,
            "Rendered normalized copy"
        );
        Ok(report)
    }

    /// Cached measurement for a previously measured source
    pub fn cached(&self, source: &str) -> Option<LoudnessMeasurement> {
        self.normalizer.cached_measurement(&ContentId::new(source))
    }

    /// Release both lanes and drop cached measurements
    pub fn close(&self) {
        self.normalizer.teardown();
        self.lane_a.assign(None);
        self.lane_b.assign(None);
    }
}

fn interleave(buffer: &AudioBuffer) -> Vec<f32> {
    let channels = buffer.channels();
    let mut samples = Vec::with_capacity(buffer.frames() * channels.len());
    for frame in 0..buffer.frames() {
        for channel in channels {
            samples.push(channel[frame]);
        }
    }
    samples
}

fn write_wav(path: &Path, buffer: &AudioBuffer, samples: &[f32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: buffer.channel_count() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
