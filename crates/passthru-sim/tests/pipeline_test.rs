//! Shim log to simulation file, end to end

use std::sync::Arc;

use passthru_expr::{import_expressions, save_expressions, ExpressionExtractor, PatternRegistry};
use passthru_sim::simulation::{load_simulation, save_simulation};
use passthru_sim::ChannelAssembler;
use passthru_types::flags::tx_flags;
use passthru_types::{BaudRate, FilterType, ProtocolId};
use pretty_assertions::assert_eq;

const SAMPLE_LOG: &str = include_str!("../../passthru-expr/testdata/sample_shim.log");

fn extractor() -> ExpressionExtractor {
    ExpressionExtractor::new(Arc::new(PatternRegistry::builtin().unwrap())).unwrap()
}

#[test]
fn test_sample_log_builds_one_channel() {
    let expressions = extractor().extract(SAMPLE_LOG).unwrap();
    let channels = ChannelAssembler::new().assemble(&expressions).unwrap();

    assert_eq!(channels.keys().copied().collect::<Vec<_>>(), vec![1]);
    let channel = &channels[&1];
    assert_eq!(channel.protocol, ProtocolId::Iso15765);
    assert_eq!(channel.baud_rate, BaudRate::Iso15765_500000);
    assert_eq!(channel.message_pairs.len(), 2);

    let filter = &channel.filters[0];
    assert_eq!(filter.filter_type, FilterType::FlowControl);
    assert_eq!(filter.pattern, vec![0x00, 0x00, 0x07, 0xE0]);
    assert_eq!(filter.flow_control, Some(vec![0x00, 0x00, 0x07, 0xE8]));
}

#[test]
fn test_sample_log_pairs() {
    let expressions = extractor().extract(SAMPLE_LOG).unwrap();
    let channels = ChannelAssembler::new().assemble(&expressions).unwrap();
    let pairs = &channels[&1].message_pairs;

    assert_eq!(pairs[0].message_read.data_bytes, vec![0x00, 0x00, 0x07, 0xE0, 0x01, 0x00]);
    assert_eq!(pairs[0].message_responses.len(), 1);
    assert_eq!(
        pairs[0].message_responses[0].data_bytes,
        vec![0x00, 0x00, 0x07, 0xE8, 0x41, 0x00, 0xBE, 0x3F, 0xA8, 0x13]
    );
    assert_eq!(pairs[0].message_responses[0].flags, tx_flags::ISO15765_FRAME_PAD);

    // Echo and start-of-message indications are not responses
    assert_eq!(pairs[1].message_responses.len(), 1);
    let vin = &pairs[1].message_responses[0];
    assert_eq!(vin.data_bytes.len(), 24);
    assert_eq!(vin.flags, tx_flags::NO_TX_FLAGS);
    assert_eq!(vin.rx_status, 0);
}

#[test]
fn test_simulation_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.ptSim");

    let expressions = extractor().extract(SAMPLE_LOG).unwrap();
    let channels = ChannelAssembler::new().assemble(&expressions).unwrap();
    save_simulation(&path, &channels).unwrap();

    let loaded = load_simulation(&path).unwrap();
    assert_eq!(loaded.skipped, 0);
    assert_eq!(loaded.channels, channels.into_values().collect::<Vec<_>>());
}

#[test]
fn test_expressions_file_builds_the_same_channels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.ptExp");
    let extractor = extractor();

    let expressions = extractor.extract(SAMPLE_LOG).unwrap();
    save_expressions(&path, &expressions).unwrap();
    let imported = import_expressions(&extractor, &path).unwrap();

    let assembler = ChannelAssembler::new();
    assert_eq!(
        assembler.assemble(&imported).unwrap(),
        assembler.assemble(&expressions).unwrap()
    );
}
