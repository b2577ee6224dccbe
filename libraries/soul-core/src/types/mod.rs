mod audio;
mod ids;
mod lane;

pub use audio::{AudioBuffer, SampleRate};
pub use ids::ContentId;
pub use lane::{GainRamp, PlaybackLane};
