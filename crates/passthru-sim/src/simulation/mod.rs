//! Simulation channels and their file format

mod channel;
pub mod file;

pub use channel::{SimulationChannel, SimulationMessagePair};
pub use file::{load_simulation, save_simulation, LoadedChannels, SIMULATION_EXTENSION};
