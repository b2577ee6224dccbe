/// Playback lane types
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One of the two concurrently addressable playback lanes
///
/// Two lanes exist so an outgoing and an incoming track can overlap during
/// crossfade or gapless transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackLane {
    A,
    B,
}

impl PlaybackLane {
    /// Both lanes, in index order
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    /// Stable array index for per-lane storage
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    /// The opposite lane
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "a" => Some(Self::A),
            "b" => Some(Self::B),
            _ => None,
        }
    }
}

impl fmt::Display for PlaybackLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scheduled gain change on a lane
///
/// The lane approaches `target` exponentially with a time constant of one
/// third of `duration`, so it sits within ~5% of the target once `duration`
/// has elapsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainRamp {
    /// Linear gain to approach
    pub target: f32,
    /// Nominal length of the ramp
    pub duration: Duration,
}

impl GainRamp {
    /// Create a ramp toward `target` over `duration`
    pub fn new(target: f32, duration: Duration) -> Self {
        Self { target, duration }
    }

    /// Ramp back to unity gain
    pub fn unity(duration: Duration) -> Self {
        Self::new(1.0, duration)
    }

    /// Exponential time constant used while approaching the target
    pub fn time_constant(&self) -> Duration {
        self.duration / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_index_and_other() {
        assert_eq!(PlaybackLane::A.index(), 0);
        assert_eq!(PlaybackLane::B.index(), 1);
        assert_eq!(PlaybackLane::A.other(), PlaybackLane::B);
        assert_eq!(PlaybackLane::B.other(), PlaybackLane::A);
    }

    #[test]
    fn lane_string_round_trip() {
        for lane in PlaybackLane::ALL {
            assert_eq!(PlaybackLane::from_str(lane.as_str()), Some(lane));
        }
        assert_eq!(PlaybackLane::from_str("B"), Some(PlaybackLane::B));
        assert_eq!(PlaybackLane::from_str("c"), None);
    }

    #[test]
    fn ramp_time_constant_is_a_third() {
        let ramp = GainRamp::new(0.5, Duration::from_millis(400));
        assert_eq!(ramp.time_constant(), Duration::from_nanos(133_333_333));
        assert_eq!(GainRamp::unity(Duration::from_millis(300)).target, 1.0);
    }
}
