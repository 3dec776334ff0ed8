//! Command implementations for ptsim

pub mod build;
pub mod extract;
pub mod import;
pub mod presets;
pub mod selftest;

pub use build::build;
pub use extract::extract;
pub use import::import;
pub use presets::presets;
pub use selftest::selftest;
