//! Playback engine - replays simulation channels against a PassThru device

mod engine;
pub mod events;

pub use engine::{LoadReport, PlaybackEngine, PlaybackError, PlaybackState};
pub use events::{LoopErrorKind, PlaybackEvent};
