//! Target loudness presets

use crate::{EBU_R128_BROADCAST_LUFS, EBU_R128_STREAMING_LUFS, REPLAYGAIN_REFERENCE_LUFS};
use serde::{Deserialize, Serialize};

/// Lowest target accepted, in LUFS
pub const MIN_TARGET_LUFS: f64 = -70.0;

/// Highest target accepted, in LUFS
pub const MAX_TARGET_LUFS: f64 = 0.0;

/// Target loudness for normalized playback
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationTarget {
    /// Streaming platforms (-14 LUFS)
    #[default]
    Streaming,
    /// ReplayGain 2.0 reference (-18 LUFS)
    ReplayGain,
    /// EBU R128 broadcast (-23 LUFS)
    Broadcast,
    /// Any other level, in LUFS
    Custom(f64),
}

impl NormalizationTarget {
    /// Target level in LUFS, clamped to the accepted range
    pub fn lufs(&self) -> f64 {
        match self {
            Self::Streaming => EBU_R128_STREAMING_LUFS,
            Self::ReplayGain => REPLAYGAIN_REFERENCE_LUFS,
            Self::Broadcast => EBU_R128_BROADCAST_LUFS,
            Self::Custom(lufs) => lufs.clamp(MIN_TARGET_LUFS, MAX_TARGET_LUFS),
        }
    }

    /// Parse from string (for settings persistence)
    ///
    /// Accepts preset names or a plain number of LUFS.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "streaming" | "ebu_streaming" => Some(Self::Streaming),
            "replaygain" | "rg" => Some(Self::ReplayGain),
            "broadcast" | "ebu_r128" | "ebur128" => Some(Self::Broadcast),
            other => other
                .trim_end_matches("lufs")
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|lufs| lufs.is_finite())
                .map(Self::Custom),
        }
    }

    /// Convert to string for settings persistence
    pub fn as_string(&self) -> String {
        match self {
            Self::Streaming => "streaming".to_string(),
            Self::ReplayGain => "replaygain".to_string(),
            Self::Broadcast => "broadcast".to_string(),
            Self::Custom(lufs) => format!("{}", lufs),
        }
    }
}
