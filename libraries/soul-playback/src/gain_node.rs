//! Reference gain stage for a playback lane
//!
//! `GainNode` is the lane the normalizer drives when the host has no gain
//! primitive of its own: it holds the assigned content, follows scheduled
//! ramps with an exponential approach, and applies the current gain to
//! interleaved sample buffers on the audio path.

use soul_core::{ContentId, GainLane, GainRamp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Distance from the target below which the ramp snaps to it
const SETTLE_EPSILON: f32 = 1e-6;

#[derive(Debug)]
struct RampState {
    current: f32,
    target: f32,
    /// Exponential time constant in seconds (0 = jump)
    time_constant: f32,
}

/// Smoothed gain stage with content assignment
#[derive(Debug)]
pub struct GainNode {
    ramp: Mutex<RampState>,
    assigned: Mutex<Option<ContentId>>,
    prepared: AtomicBool,
    released: AtomicBool,
}

impl GainNode {
    /// Create a node at unity gain with nothing assigned
    pub fn new() -> Self {
        Self {
            ramp: Mutex::new(RampState {
                current: 1.0,
                target: 1.0,
                time_constant: 0.0,
            }),
            assigned: Mutex::new(None),
            prepared: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }
    }

    /// Record which content the lane is playing
    ///
    /// Hosts call this whenever they load new content into the lane, before
    /// asking the normalizer to analyze it.
    pub fn assign(&self, content_id: Option<ContentId>) {
        *lock(&self.assigned) = content_id;
    }

    /// Gain currently being applied
    pub fn gain(&self) -> f32 {
        lock(&self.ramp).current
    }

    /// Gain the node is ramping toward
    pub fn target_gain(&self) -> f32 {
        lock(&self.ramp).target
    }

    /// Whether `prepare` has run
    pub fn is_prepared(&self) -> bool {
        self.prepared.load(Ordering::Acquire)
    }

    /// Whether the node was released by teardown
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Advance the ramp by `frames` frames without touching audio
    pub fn advance(&self, frames: usize, sample_rate: u32) {
        let mut state = lock(&self.ramp);
        let coeff = step_coefficient(state.time_constant, sample_rate);
        for _ in 0..frames {
            step(&mut state, coeff);
        }
    }

    /// Apply the gain to an interleaved buffer (in-place)
    ///
    /// The gain moves once per frame, so every channel of a frame gets the
    /// same factor.
    pub fn process(&self, buffer: &mut [f32], channels: usize, sample_rate: u32) {
        if channels == 0 {
            return;
        }

        let mut state = lock(&self.ramp);

        // Settled at unity: nothing to do
        if state.current == state.target && state.current == 1.0 {
            return;
        }

        let coeff = step_coefficient(state.time_constant, sample_rate);
        for frame in buffer.chunks_mut(channels) {
            step(&mut state, coeff);
            let gain = state.current;
            for sample in frame.iter_mut() {
                *sample *= gain;
            }
        }
    }
}

impl Default for GainNode {
    fn default() -> Self {
        Self::new()
    }
}

impl GainLane for GainNode {
    fn prepare(&self) -> soul_core::Result<()> {
        self.prepared.store(true, Ordering::Release);
        Ok(())
    }

    fn ramp_gain(&self, ramp: GainRamp) {
        let mut state = lock(&self.ramp);
        state.target = ramp.target;
        state.time_constant = ramp.time_constant().as_secs_f32();
        if state.time_constant == 0.0 {
            state.current = ramp.target;
        }
    }

    fn assigned_content_id(&self) -> Option<ContentId> {
        lock(&self.assigned).clone()
    }

    fn release(&self) {
        let mut state = lock(&self.ramp);
        state.current = 1.0;
        state.target = 1.0;
        self.released.store(true, Ordering::Release);
    }
}

/// Per-frame smoothing factor for an exponential approach
fn step_coefficient(time_constant: f32, sample_rate: u32) -> f32 {
    if time_constant <= 0.0 || sample_rate == 0 {
        return 1.0;
    }
    1.0 - (-1.0 / (time_constant * sample_rate as f32)).exp()
}

fn step(state: &mut RampState, coeff: f32) {
    let delta = state.target - state.current;
    if delta.abs() < SETTLE_EPSILON {
        state.current = state.target;
    } else {
        state.current += delta * coeff;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
