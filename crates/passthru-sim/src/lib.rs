//! PassThru session simulator
//!
//! Builds replayable simulation channels from extracted shim log
//! expressions and plays them back against a [`device::PassThruDevice`],
//! answering each recorded request with the responses captured for it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use passthru_expr::{ExpressionExtractor, PatternRegistry};
//! use passthru_sim::{ChannelAssembler, MockPassThruDevice, PlaybackEngine};
//!
//! let extractor = ExpressionExtractor::new(Arc::new(PatternRegistry::builtin()?))?;
//! let expressions = extractor.extract(&std::fs::read_to_string("session.txt")?)?;
//! let channels = ChannelAssembler::new().assemble(&expressions)?;
//!
//! let engine = PlaybackEngine::new(Arc::new(MockPassThruDevice::new()));
//! engine.load_channels(channels.into_values());
//! engine.initialize().await?;
//! engine.start().await?;
//! ```

pub mod assemble;
pub mod config;
pub mod device;
pub mod error;
pub mod playback;
pub mod simulation;

pub use assemble::ChannelAssembler;
pub use config::{PlaybackConfig, PresetTable, ReaderDefaults, SimulationPreset};
pub use device::{DeviceError, MockPassThruDevice, PassThruDevice};
pub use error::{AssemblyError, SimError, SimResult};
pub use playback::{
    LoadReport, LoopErrorKind, PlaybackEngine, PlaybackError, PlaybackEvent, PlaybackState,
};
pub use simulation::{SimulationChannel, SimulationMessagePair};
