//! Lane routing and per-lane bookkeeping

use crate::error::{NormalizerError, Result};
use serde::{Deserialize, Serialize};
use soul_core::{ContentId, GainLane, GainRamp, PlaybackLane};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Normalization progress of one lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneState {
    /// Nothing scheduled
    #[default]
    Idle,
    /// Measurement running, lane held at unity
    Analyzing,
    /// Normalization gain scheduled
    Applied,
    /// Last analysis failed, lane left at unity
    Failed,
}

#[derive(Debug, Default)]
struct SlotState {
    prepared: bool,
    content_id: Option<ContentId>,
    state: LaneState,
    last_target: Option<f32>,
}

struct LaneSlot {
    lane: Arc<dyn GainLane>,
    state: Mutex<SlotState>,
    /// Serializes `GainLane::prepare`; `state` is not held across it
    preparing: Mutex<()>,
}

/// Routes gain changes to the host's two playback lanes
pub struct LaneRouter {
    slots: [LaneSlot; 2],
}

impl LaneRouter {
    /// Wrap the host's lanes A and B
    pub fn new(lane_a: Arc<dyn GainLane>, lane_b: Arc<dyn GainLane>) -> Self {
        let slot = |lane| LaneSlot {
            lane,
            state: Mutex::new(SlotState::default()),
            preparing: Mutex::new(()),
        };
        Self {
            slots: [slot(lane_a), slot(lane_b)],
        }
    }

    /// Run the lane's one-time setup if it hasn't succeeded yet
    ///
    /// The host's `prepare` may query or ramp the router, but must not call
    /// `ensure_ready` for the same lane.
    ///
    /// # Errors
    /// Returns `NormalizerError::Lane` if the host's `prepare` fails; the
    /// next call tries again.
    pub fn ensure_ready(&self, lane: PlaybackLane) -> Result<()> {
        let slot = self.slot(lane);
        if lock(&slot.state).prepared {
            return Ok(());
        }

        let _preparing = lock(&slot.preparing);
        // Another caller may have finished while we waited
        if lock(&slot.state).prepared {
            return Ok(());
        }

        slot.lane.prepare().map_err(|e| {
            warn!(lane = %lane, error = %e, "Failed to prepare lane gain stage");
            NormalizerError::Lane(e.to_string())
        })?;
        lock(&slot.state).prepared = true;
        debug!(lane = %lane, "Lane gain stage prepared");
        Ok(())
    }

    /// Content the host currently has loaded in `lane`
    pub fn assigned_content_id(&self, lane: PlaybackLane) -> Option<ContentId> {
        self.slot(lane).lane.assigned_content_id()
    }

    /// Whether `lane` is still playing `content_id`
    pub fn is_assigned(&self, lane: PlaybackLane, content_id: &ContentId) -> bool {
        self.assigned_content_id(lane).as_ref() == Some(content_id)
    }

    /// Schedule a ramp on `lane`
    pub fn ramp(&self, lane: PlaybackLane, ramp: GainRamp) {
        let slot = self.slot(lane);
        lock(&slot.state).last_target = Some(ramp.target);
        slot.lane.ramp_gain(ramp);
    }

    /// Last gain target scheduled on `lane`
    pub fn last_target(&self, lane: PlaybackLane) -> Option<f32> {
        lock(&self.slot(lane).state).last_target
    }

    /// Normalization state of `lane`
    pub fn state(&self, lane: PlaybackLane) -> LaneState {
        lock(&self.slot(lane).state).state
    }

    /// Start tracking `content_id` on `lane` in `state`
    pub fn begin(&self, lane: PlaybackLane, content_id: &ContentId, state: LaneState) {
        let mut slot = lock(&self.slot(lane).state);
        slot.content_id = Some(content_id.clone());
        slot.state = state;
    }

    /// Move `lane` to `state` if it is still tracking `content_id`
    ///
    /// Returns `false` when a newer call has taken the lane over.
    pub fn transition(&self, lane: PlaybackLane, content_id: &ContentId, state: LaneState) -> bool {
        let mut slot = lock(&self.slot(lane).state);
        if slot.content_id.as_ref() != Some(content_id) {
            return false;
        }
        slot.state = state;
        true
    }

    /// Forget what `lane` was tracking
    pub fn reset(&self, lane: PlaybackLane) {
        let mut slot = lock(&self.slot(lane).state);
        slot.content_id = None;
        slot.state = LaneState::Idle;
    }

    /// Release both lanes' gain stages
    pub fn release_all(&self) {
        for lane in PlaybackLane::ALL {
            let slot = self.slot(lane);
            slot.lane.release();
            let mut state = lock(&slot.state);
            state.prepared = false;
            state.content_id = None;
            state.state = LaneState::Idle;
        }
    }

    fn slot(&self, lane: PlaybackLane) -> &LaneSlot {
        &self.slots[lane.index()]
    }
}

impl std::fmt::Debug for LaneRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaneRouter")
            .field("a", &*lock(&self.slots[0].state))
            .field("b", &*lock(&self.slots[1].state))
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gain_node::GainNode;
    use soul_core::SoulError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};
    use std::time::Duration;

    struct FlakyLane {
        attempts: AtomicUsize,
        fail_first: usize,
    }

    impl GainLane for FlakyLane {
        fn prepare(&self) -> soul_core::Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                Err(SoulError::lane("context suspended"))
            } else {
                Ok(())
            }
        }

        fn ramp_gain(&self, _ramp: GainRamp) {}

        fn assigned_content_id(&self) -> Option<ContentId> {
            None
        }
    }

    #[test]
    fn prepare_runs_once() {
        let flaky = Arc::new(FlakyLane {
            attempts: AtomicUsize::new(0),
            fail_first: 0,
        });
        let router = LaneRouter::new(flaky.clone(), Arc::new(GainNode::new()));

        router.ensure_ready(PlaybackLane::A).unwrap();
        router.ensure_ready(PlaybackLane::A).unwrap();
        assert_eq!(flaky.attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_prepare_is_retried() {
        let flaky = Arc::new(FlakyLane {
            attempts: AtomicUsize::new(0),
            fail_first: 1,
        });
        let router = LaneRouter::new(flaky.clone(), Arc::new(GainNode::new()));

        let err = router.ensure_ready(PlaybackLane::A).unwrap_err();
        assert!(matches!(err, NormalizerError::Lane(_)));

        router.ensure_ready(PlaybackLane::A).unwrap();
        assert_eq!(flaky.attempts.load(Ordering::SeqCst), 2);
    }

    /// Lane whose setup reads back through the router it belongs to
    struct InspectingLane {
        router: OnceLock<Weak<LaneRouter>>,
        seen_state: Mutex<Option<LaneState>>,
    }

    impl GainLane for InspectingLane {
        fn prepare(&self) -> soul_core::Result<()> {
            let router = self.router.get().and_then(Weak::upgrade);
            if let Some(router) = router {
                router.ramp(PlaybackLane::A, GainRamp::unity(Duration::ZERO));
                *self.seen_state.lock().unwrap() = Some(router.state(PlaybackLane::A));
            }
            Ok(())
        }

        fn ramp_gain(&self, _ramp: GainRamp) {}

        fn assigned_content_id(&self) -> Option<ContentId> {
            None
        }
    }

    #[test]
    fn prepare_may_call_back_into_router() {
        let lane = Arc::new(InspectingLane {
            router: OnceLock::new(),
            seen_state: Mutex::new(None),
        });
        let router = Arc::new(LaneRouter::new(lane.clone(), Arc::new(GainNode::new())));
        let _ = lane.router.set(Arc::downgrade(&router));

        router.ensure_ready(PlaybackLane::A).unwrap();

        assert_eq!(*lane.seen_state.lock().unwrap(), Some(LaneState::Idle));
        assert_eq!(router.last_target(PlaybackLane::A), Some(1.0));
    }

    #[test]
    fn ramps_reach_the_right_lane() {
        let a = Arc::new(GainNode::new());
        let b = Arc::new(GainNode::new());
        let router = LaneRouter::new(a.clone(), b.clone());

        router.ramp(PlaybackLane::B, GainRamp::new(0.5, Duration::ZERO));
        assert_eq!(a.gain(), 1.0);
        assert_eq!(b.gain(), 0.5);
        assert_eq!(router.last_target(PlaybackLane::B), Some(0.5));
        assert_eq!(router.last_target(PlaybackLane::A), None);
    }

    #[test]
    fn stale_transition_is_ignored() {
        let router = LaneRouter::new(Arc::new(GainNode::new()), Arc::new(GainNode::new()));
        let old = ContentId::new("old");
        let new = ContentId::new("new");

        router.begin(PlaybackLane::A, &old, LaneState::Analyzing);
        router.begin(PlaybackLane::A, &new, LaneState::Analyzing);

        assert!(!router.transition(PlaybackLane::A, &old, LaneState::Applied));
        assert_eq!(router.state(PlaybackLane::A), LaneState::Analyzing);
        assert!(router.transition(PlaybackLane::A, &new, LaneState::Applied));
        assert_eq!(router.state(PlaybackLane::A), LaneState::Applied);
    }

    #[test]
    fn assignment_comes_from_the_host_lane() {
        let a = Arc::new(GainNode::new());
        let router = LaneRouter::new(a.clone(), Arc::new(GainNode::new()));
        let id = ContentId::new("track");

        assert!(!router.is_assigned(PlaybackLane::A, &id));
        a.assign(Some(id.clone()));
        assert!(router.is_assigned(PlaybackLane::A, &id));
        assert!(!router.is_assigned(PlaybackLane::B, &id));
    }
}
