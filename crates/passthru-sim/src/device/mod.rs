//! Device layer for playback
//!
//! The engine talks to hardware through [`PassThruDevice`]:
//! - native driver bindings live outside this crate
//! - [`mock::MockPassThruDevice`] replays injected traffic in memory

mod adapter;
pub mod error;
pub mod mock;

pub use adapter::PassThruDevice;
pub use error::DeviceError;
pub use mock::{DeviceCall, MockOp, MockPassThruDevice};
