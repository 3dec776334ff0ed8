//! PassThru shim log expressions
//!
//! Turns the text log written by a J2534 PassThru shim into typed
//! expressions, one per logged call.
//!
//! ```text
//! raw log ──► split at command times ──► spans
//!                                          │ (worker pool, order kept)
//!                                          ▼
//!             classify ──► bind fields ──► Expression
//!                                          │
//!                     .ptExp file ◄────────┴───► simulation builder
//! ```
//!
//! Patterns live in a [`PatternRegistry`]; a default registry is bundled
//! and a custom one can be loaded from YAML.

mod blocks;
pub mod command;
pub mod error;
pub mod expression;
pub mod extract;
pub mod field;
pub mod file;
pub mod registry;

pub use blocks::IoctlParameter;
pub use command::CommandType;
pub use error::{ExprError, ExprResult};
pub use expression::{Expression, ExpressionKind};
pub use extract::{ExpressionExtractor, LogSpan, ProgressObserver, ProgressUpdate};
pub use field::{Expectation, Field, FieldSpec};
pub use file::{import_expressions, save_expressions, EXPRESSIONS_EXTENSION};
pub use registry::{PatternDefinition, PatternRegistry};

/// Common imports for consumers
pub mod prelude {
    pub use crate::command::CommandType;
    pub use crate::error::{ExprError, ExprResult};
    pub use crate::expression::{Expression, ExpressionKind};
    pub use crate::extract::{ExpressionExtractor, ProgressUpdate};
    pub use crate::registry::PatternRegistry;
}

#[cfg(test)]
mod tests {
    use super::*;
    use passthru_types::{FilterType, ProtocolId};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const SAMPLE_LOG: &str = include_str!("../testdata/sample_shim.log");

    fn extract_sample() -> Vec<Expression> {
        let registry = Arc::new(PatternRegistry::builtin().unwrap());
        ExpressionExtractor::new(registry)
            .unwrap()
            .extract(SAMPLE_LOG)
            .unwrap()
    }

    #[test]
    fn test_sample_log_command_sequence() {
        let types: Vec<CommandType> = extract_sample().iter().map(|e| e.command_type()).collect();
        assert_eq!(
            types,
            vec![
                CommandType::Open,
                CommandType::Connect,
                CommandType::Ioctl,
                CommandType::StartMessageFilter,
                CommandType::WriteMessages,
                CommandType::ReadMessages,
                CommandType::WriteMessages,
                CommandType::ReadMessages,
                CommandType::Disconnect,
                CommandType::Close,
            ]
        );
    }

    #[test]
    fn test_sample_log_values() {
        let expressions = extract_sample();
        assert!(expressions.iter().all(Expression::passed));

        let connect = &expressions[1];
        assert_eq!(connect.field_value("Protocol ID"), Some("6:ISO15765"));
        assert_eq!(connect.channel_id(), Some(1));

        let filter = expressions[3].filter().unwrap();
        assert_eq!(filter.filter_type, FilterType::FlowControl);
        assert_eq!(filter.flow_control.as_deref(), Some(&[0x00, 0x00, 0x07, 0xE0][..]));

        let vin = &expressions[7].messages()[2];
        assert_eq!(vin.protocol_id, ProtocolId::Iso15765);
        assert_eq!(vin.data_bytes.len(), 24);
        assert_eq!(expressions[7].messages()[1].rx_status, 0x02);
    }
}
