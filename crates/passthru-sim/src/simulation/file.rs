//! Simulation file (`.ptSim`)
//!
//! A JSON array of `{ "channelId": n, "channel": { ... } }` entries.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::SimulationChannel;
use crate::error::SimResult;

/// Default extension for simulation files
pub const SIMULATION_EXTENSION: &str = "ptSim";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelEntry {
    channel_id: u32,
    channel: SimulationChannel,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChannelEntryRef<'a> {
    channel_id: u32,
    channel: &'a SimulationChannel,
}

/// Channels read back from a simulation file
#[derive(Debug, Default)]
pub struct LoadedChannels {
    pub channels: Vec<SimulationChannel>,
    /// Entries that could not be parsed
    pub skipped: usize,
}

/// Serialize channels to simulation file JSON
pub fn to_json(channels: &BTreeMap<u32, SimulationChannel>) -> SimResult<String> {
    let entries: Vec<ChannelEntryRef<'_>> = channels
        .iter()
        .map(|(&channel_id, channel)| ChannelEntryRef {
            channel_id,
            channel,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

/// Parse simulation file JSON.
///
/// The document must be an array; individual bad entries are skipped.
pub fn from_json(json: &str) -> SimResult<LoadedChannels> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut loaded = LoadedChannels::default();

    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<ChannelEntry>(entry) {
            Ok(entry) => loaded.channels.push(entry.channel),
            Err(e) => {
                warn!(entry = index, error = %e, "Skipping simulation entry");
                loaded.skipped += 1;
            }
        }
    }
    Ok(loaded)
}

pub fn save_simulation(
    path: impl AsRef<Path>,
    channels: &BTreeMap<u32, SimulationChannel>,
) -> SimResult<()> {
    let path = path.as_ref();
    fs::write(path, to_json(channels)?)?;
    info!(path = %path.display(), channels = channels.len(), "Saved simulation file");
    Ok(())
}

pub fn load_simulation(path: impl AsRef<Path>) -> SimResult<LoadedChannels> {
    let path = path.as_ref();
    let loaded = from_json(&fs::read_to_string(path)?)?;
    info!(
        path = %path.display(),
        channels = loaded.channels.len(),
        skipped = loaded.skipped,
        "Loaded simulation file"
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimulationMessagePair;
    use passthru_types::{BaudRate, MessageFilter, PassThruMsg, ProtocolId};
    use pretty_assertions::assert_eq;

    fn sample() -> BTreeMap<u32, SimulationChannel> {
        let channel = SimulationChannel {
            channel_id: 1,
            protocol: ProtocolId::Iso15765,
            connect_flags: 0,
            baud_rate: BaudRate::Iso15765_500000,
            filters: vec![MessageFilter::flow_control(
                vec![0x00, 0x00, 0xFF, 0xFF],
                vec![0x00, 0x00, 0x07, 0xE0],
                vec![0x00, 0x00, 0x07, 0xE8],
                0x40,
            )],
            message_pairs: vec![SimulationMessagePair::new(
                PassThruMsg::new(ProtocolId::Iso15765, vec![0x00, 0x00, 0x07, 0xE0, 0x01, 0x00]),
                vec![PassThruMsg::new(ProtocolId::Iso15765, vec![0x00, 0x00, 0x07, 0xE8, 0x41, 0x00])
                    .with_flags(0x40)],
            )],
        };
        BTreeMap::from([(1, channel)])
    }

    #[test]
    fn test_json_shape() {
        let json = to_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["channelId"], 1);
        assert_eq!(value[0]["channel"]["protocol"], "ISO15765");
        assert_eq!(value[0]["channel"]["baudRate"], "ISO15765_500000");
        assert_eq!(
            value[0]["channel"]["messagePairs"][0]["messageRead"]["dataBytes"],
            "00 00 07 E0 01 00"
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("session.{}", SIMULATION_EXTENSION));
        let channels = sample();

        save_simulation(&path, &channels).unwrap();
        let loaded = load_simulation(&path).unwrap();
        assert_eq!(loaded.skipped, 0);
        assert_eq!(loaded.channels, channels.into_values().collect::<Vec<_>>());
    }

    #[test]
    fn test_numeric_protocol_and_bad_entry() {
        let json = r#"[
            {"channelId": 2, "channel": {"channelId": 2, "protocol": 5, "baudRate": "CAN_500000"}},
            {"channelId": 3, "channel": {"channelId": 3, "protocol": "FLEXRAY", "baudRate": "CAN_500000"}}
        ]"#;
        let loaded = from_json(json).unwrap();
        assert_eq!(loaded.channels.len(), 1);
        assert_eq!(loaded.channels[0].protocol, ProtocolId::Can);
        assert!(loaded.channels[0].message_pairs.is_empty());
        assert_eq!(loaded.skipped, 1);
    }

    #[test]
    fn test_not_an_array_fails() {
        assert!(from_json(r#"{"channelId": 1}"#).is_err());
    }
}
