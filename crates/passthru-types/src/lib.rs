//! passthru-types - J2534 value types
//!
//! Protocol ids, baud rates, status codes, flag bits, messages and filters as
//! they appear both in PassThru shim logs and on the wire to a device.
//!
//! Every enum parses from the forms a shim log prints (`"6:ISO15765"`,
//! `"ISO15765"`, `"6"`, `"0x06"`) and serializes by name.

#[macro_use]
mod macros;

pub mod codec;
pub mod enums;
pub mod error;
pub mod filter;
pub mod flags;
pub mod message;
pub mod protocol;

pub use enums::{ConfigParam, ConfigParamId, FilterType, IoctlId, J2534Status};
pub use error::{TypeError, TypeResult};
pub use filter::MessageFilter;
pub use message::PassThruMsg;
pub use protocol::{BaudRate, ProtocolId};
