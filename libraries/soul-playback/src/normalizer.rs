//! Loudness normalizer facade
//!
//! Ties the measurement cache, the fetch/decode/measure pipeline and the
//! host's two playback lanes together.

use crate::cache::MeasurementCache;
use crate::config::{NormalizerConfig, NormalizerSettings};
use crate::error::{NormalizerError, Result};
use crate::lanes::{LaneRouter, LaneState};
use crate::pipeline::MeasurementPipeline;
use soul_core::{AudioDecoder, AudioFetcher, ContentId, GainRamp, PlaybackLane};
use soul_loudness::{LoudnessMeasurement, NormalizationTarget, MAX_TARGET_LUFS, MIN_TARGET_LUFS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What `analyze_and_apply` ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Normalization is disabled or the normalizer was torn down
    Skipped,
    /// A gain ramp was scheduled
    Applied {
        /// Linear gain scheduled on the lane
        gain: f32,
    },
    /// The lane moved on to other content before the measurement finished
    Stale,
    /// Measurement failed; the lane stays at unity
    Failed(NormalizerError),
}

/// Per-track loudness normalization for a dual-lane player
///
/// Measurements are cached by content id and shared between the lanes and
/// any pre-analysis, so each track is fetched and decoded at most once while
/// its entry is alive.
///
/// # Example
///
/// ```rust,no_run
/// use soul_audio::{SourceFetcher, SymphoniaDecoder};
/// use soul_core::{ContentId, PlaybackLane};
/// use soul_playback::{GainNode, LaneRouter, LoudnessNormalizer};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let lane_a = Arc::new(GainNode::new());
/// let lane_b = Arc::new(GainNode::new());
/// let normalizer = LoudnessNormalizer::new(
///     LaneRouter::new(lane_a.clone(), lane_b.clone()),
///     Arc::new(SourceFetcher::new()?),
///     Arc::new(SymphoniaDecoder::new()),
/// );
/// normalizer.configure(true, -14.0);
///
/// let id = ContentId::new("track-42");
/// lane_a.assign(Some(id.clone()));
/// normalizer
///     .analyze_and_apply(PlaybackLane::A, "https://cdn.example.com/42.mp3", &id)
///     .await;
/// # Ok(())
/// # }
/// ```
pub struct LoudnessNormalizer {
    config: RwLock<NormalizerConfig>,
    settings: NormalizerSettings,
    cache: MeasurementCache,
    pipeline: Arc<MeasurementPipeline>,
    lanes: LaneRouter,
    torn_down: AtomicBool,
}

impl LoudnessNormalizer {
    /// Create a disabled normalizer with default settings
    pub fn new(
        lanes: LaneRouter,
        fetcher: Arc<dyn AudioFetcher>,
        decoder: Arc<dyn AudioDecoder>,
    ) -> Self {
        Self::with_settings(lanes, fetcher, decoder, NormalizerSettings::default())
    }

    /// Create a disabled normalizer with custom ramp and gain limits
    pub fn with_settings(
        lanes: LaneRouter,
        fetcher: Arc<dyn AudioFetcher>,
        decoder: Arc<dyn AudioDecoder>,
        settings: NormalizerSettings,
    ) -> Self {
        Self {
            config: RwLock::new(NormalizerConfig::default()),
            settings,
            cache: MeasurementCache::new(),
            pipeline: Arc::new(MeasurementPipeline::new(fetcher, decoder)),
            lanes,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Current configuration
    pub fn config(&self) -> NormalizerConfig {
        *self.config.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Fixed settings
    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    /// Whether normalization is active
    pub fn is_enabled(&self) -> bool {
        self.config().enabled && !self.is_torn_down()
    }

    /// Whether `teardown` has run
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Enable/disable normalization and set the target loudness
    ///
    /// The target is clamped to the supported LUFS range; a NaN target keeps
    /// the previous one. Disabling ramps both lanes back to unity. Enabling or moving
    /// the target re-applies cached measurements to lanes that are playing
    /// measured content.
    pub fn configure(&self, enabled: bool, target_lufs: f64) {
        if self.is_torn_down() {
            debug!("Ignoring configure after teardown");
            return;
        }

        let (previous, target_lufs) = {
            let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
            let previous = *config;
            let target_lufs = if target_lufs.is_nan() {
                warn!("Ignoring NaN normalization target, keeping {}", previous.target_lufs);
                previous.target_lufs
            } else {
                target_lufs.clamp(MIN_TARGET_LUFS, MAX_TARGET_LUFS)
            };
            *config = NormalizerConfig {
                enabled,
                target_lufs,
            };
            (previous, target_lufs)
        };

        if previous.enabled != enabled || previous.target_lufs != target_lufs {
            info!(enabled, target_lufs, "Loudness normalization configured");
        }

        if !enabled {
            for lane in PlaybackLane::ALL {
                self.reset_gain(lane);
            }
        } else if !previous.enabled || previous.target_lufs != target_lufs {
            for lane in PlaybackLane::ALL {
                if let Some(content_id) = self.lanes.assigned_content_id(lane) {
                    if self.cache.get(&content_id).is_some() {
                        self.apply_gain(lane, &content_id);
                    }
                }
            }
        }
    }

    /// Change only the target loudness
    pub fn set_target(&self, target: NormalizationTarget) {
        self.configure(self.config().enabled, target.lufs());
    }

    /// Measure `source` and ramp `lane` to the resulting gain
    ///
    /// Gain is only ever applied while the lane is playing `content_id`. A
    /// cached measurement is applied straight away. Otherwise the lane is
    /// held at unity while measuring and the assignment is checked again
    /// when the measurement arrives.
    /// Failures never reach the caller as errors; they leave the lane at
    /// unity.
    pub async fn analyze_and_apply(
        &self,
        lane: PlaybackLane,
        source: &str,
        content_id: &ContentId,
    ) -> ApplyOutcome {
        if !self.is_enabled() {
            return ApplyOutcome::Skipped;
        }

        if let Err(e) = self.lanes.ensure_ready(lane) {
            self.lanes.begin(lane, content_id, LaneState::Failed);
            return ApplyOutcome::Failed(e);
        }

        if let Some(measurement) = self.cache.get(content_id) {
            if !self.lanes.is_assigned(lane, content_id) {
                debug!(lane = %lane, content_id = %content_id, "Lane is playing other content, not applying cached gain");
                return ApplyOutcome::Stale;
            }
            debug!(lane = %lane, content_id = %content_id, "Applying cached measurement");
            self.lanes.begin(lane, content_id, LaneState::Applied);
            return match self.ramp_to(lane, Some(&measurement)) {
                Some(gain) => ApplyOutcome::Applied { gain },
                None => {
                    self.lanes.transition(lane, content_id, LaneState::Idle);
                    ApplyOutcome::Skipped
                }
            };
        }

        self.lanes.begin(lane, content_id, LaneState::Analyzing);
        self.lanes.ramp(lane, GainRamp::unity(self.settings.ramp()));

        match self.measure(source, content_id).await {
            Ok(measurement) => {
                if !self.is_enabled() {
                    self.lanes.transition(lane, content_id, LaneState::Idle);
                    return ApplyOutcome::Skipped;
                }
                if !self.lanes.is_assigned(lane, content_id) {
                    debug!(lane = %lane, content_id = %content_id, "Lane moved on, discarding gain");
                    self.lanes.transition(lane, content_id, LaneState::Idle);
                    return ApplyOutcome::Stale;
                }

                self.lanes.transition(lane, content_id, LaneState::Applied);
                match self.ramp_to(lane, Some(&measurement)) {
                    Some(gain) => ApplyOutcome::Applied { gain },
                    None => {
                        self.lanes.transition(lane, content_id, LaneState::Idle);
                        ApplyOutcome::Skipped
                    }
                }
            }
            Err(e) => {
                warn!(
                    lane = %lane,
                    content_id = %content_id,
                    error = %e,
                    "Loudness analysis failed, leaving lane at unity"
                );
                self.lanes.transition(lane, content_id, LaneState::Failed);
                ApplyOutcome::Failed(e)
            }
        }
    }

    /// Warm the cache for upcoming content without touching any lane
    ///
    /// Returns the background task, or `None` when normalization is
    /// disabled or the measurement is already cached. Errors are logged, not
    /// cached.
    pub fn pre_analyze(&self, source: &str, content_id: &ContentId) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }
        if self.cache.get(content_id).is_some() {
            debug!(content_id = %content_id, "Pre-analysis skipped, already cached");
            return None;
        }

        let cache = self.cache.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let source = source.to_string();
        let content_id = content_id.clone();

        Some(tokio::spawn(async move {
            let result = cache
                .measure(&content_id, {
                    let source = source.clone();
                    move || async move { pipeline.run(&source).await }
                })
                .await;
            match result {
                Ok(_) => debug!(content_id = %content_id, "Pre-analysis complete"),
                Err(e) => warn!(content_id = %content_id, source = %source, error = %e, "Pre-analysis failed"),
            }
        }))
    }

    /// Deduplicated measurement of `source`, without touching any lane
    ///
    /// # Errors
    /// `TornDown` after teardown, otherwise whatever the pipeline failed with
    pub async fn measure(&self, source: &str, content_id: &ContentId) -> Result<LoudnessMeasurement> {
        if self.is_torn_down() {
            return Err(NormalizerError::TornDown);
        }

        let pipeline = Arc::clone(&self.pipeline);
        let source = source.to_string();
        self.cache
            .measure(content_id, move || async move { pipeline.run(&source).await })
            .await
    }

    /// Apply the cached gain for `content_id` to `lane`
    ///
    /// Without a cached measurement the lane ramps to unity. Nothing happens
    /// while disabled, after teardown, or when the lane is playing other
    /// content. Returns the scheduled gain.
    pub fn apply_gain(&self, lane: PlaybackLane, content_id: &ContentId) -> Option<f32> {
        if !self.is_enabled() {
            return None;
        }
        if !self.lanes.is_assigned(lane, content_id) {
            debug!(lane = %lane, content_id = %content_id, "Not applying gain to unassigned content");
            return None;
        }
        if let Err(e) = self.lanes.ensure_ready(lane) {
            warn!(lane = %lane, error = %e, "Cannot apply gain");
            return None;
        }

        let measurement = self.cache.get(content_id);
        let state = if measurement.is_some() {
            LaneState::Applied
        } else {
            LaneState::Idle
        };
        self.lanes.begin(lane, content_id, state);
        let gain = self.ramp_to(lane, measurement.as_ref());
        if gain.is_none() {
            self.lanes.transition(lane, content_id, LaneState::Idle);
        }
        gain
    }

    /// Store a measurement computed outside the pipeline
    ///
    /// For hosts that already hold the decoded audio. Replaces any cached or
    /// in-flight entry for `content_id`; a running measurement for it will
    /// not overwrite this one.
    pub fn record_measurement(&self, content_id: &ContentId, measurement: LoudnessMeasurement) {
        if self.is_torn_down() {
            return;
        }
        self.cache.insert(content_id, measurement);
    }

    /// Ramp `lane` back to unity
    pub fn reset_gain(&self, lane: PlaybackLane) {
        if self.is_torn_down() {
            return;
        }
        if let Err(e) = self.lanes.ensure_ready(lane) {
            warn!(lane = %lane, error = %e, "Cannot reset gain");
            return;
        }
        self.lanes.reset(lane);
        self.lanes.ramp(lane, GainRamp::unity(self.settings.ramp()));
    }

    /// Cached measurement for `content_id`
    pub fn cached_measurement(&self, content_id: &ContentId) -> Option<LoudnessMeasurement> {
        self.cache.get(content_id)
    }

    /// Normalization state of `lane`
    pub fn lane_state(&self, lane: PlaybackLane) -> LaneState {
        self.lanes.state(lane)
    }

    /// Drop every cached and in-flight measurement
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop the measurement for one content id
    pub fn invalidate(&self, content_id: &ContentId) -> bool {
        self.cache.invalidate(content_id)
    }

    /// Reset both lanes, release them and empty the cache
    ///
    /// Every later call is a no-op (or fails with `TornDown`). Calling it
    /// twice is harmless.
    pub fn teardown(&self) {
        {
            // Taken so no ramp_to is mid-flight when the flag flips
            let _config = self.config.write().unwrap_or_else(|e| e.into_inner());
            if self.torn_down.swap(true, Ordering::AcqRel) {
                return;
            }
        }

        for lane in PlaybackLane::ALL {
            self.lanes.ramp(lane, GainRamp::unity(std::time::Duration::ZERO));
        }
        self.lanes.release_all();
        self.cache.clear();
        info!("Loudness normalizer torn down");
    }

    /// Schedule the gain for `measurement` on `lane`
    ///
    /// Holds the config read lock across the ramp, so a concurrent disable or
    /// teardown either sees this ramp and resets it, or is seen here and the
    /// ramp is skipped (`None`).
    fn ramp_to(&self, lane: PlaybackLane, measurement: Option<&LoudnessMeasurement>) -> Option<f32> {
        let config = self.config.read().unwrap_or_else(|e| e.into_inner());
        if !config.enabled || self.is_torn_down() {
            debug!(lane = %lane, "Normalization disabled meanwhile, not ramping");
            return None;
        }

        let target_lufs = config.target_lufs;
        let gain = self.settings.calculator().linear_gain(measurement, target_lufs) as f32;

        debug!(
            lane = %lane,
            gain,
            target_lufs,
            measured_lufs = measurement.map(|m| m.lufs),
            "Scheduling normalization gain"
        );
        self.lanes.ramp(lane, GainRamp::new(gain, self.settings.ramp()));
        Some(gain)
    }
}

impl std::fmt::Debug for LoudnessNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoudnessNormalizer")
            .field("config", &self.config())
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .field("lanes", &self.lanes)
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}
