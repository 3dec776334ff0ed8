//! Replayable channel types

use serde::{Deserialize, Serialize};

use passthru_types::{BaudRate, MessageFilter, PassThruMsg, ProtocolId};

/// One recorded stimulus and the responses the device sent for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationMessagePair {
    pub message_read: PassThruMsg,
    #[serde(default)]
    pub message_responses: Vec<PassThruMsg>,
}

impl SimulationMessagePair {
    pub fn new(message_read: PassThruMsg, message_responses: Vec<PassThruMsg>) -> Self {
        Self {
            message_read,
            message_responses,
        }
    }

    /// True if the recorded stimulus occurs inside `live`
    pub fn matches(&self, live: &PassThruMsg) -> bool {
        live.contains_data(&self.message_read.data_bytes)
    }
}

/// A recorded channel, ready to be replayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationChannel {
    pub channel_id: u32,
    pub protocol: ProtocolId,
    #[serde(default)]
    pub connect_flags: u32,
    pub baud_rate: BaudRate,
    #[serde(default)]
    pub filters: Vec<MessageFilter>,
    #[serde(default)]
    pub message_pairs: Vec<SimulationMessagePair>,
}

impl SimulationChannel {
    /// First pair whose stimulus occurs in `live`
    pub fn find_pair(&self, live: &PassThruMsg) -> Option<&SimulationMessagePair> {
        self.message_pairs.iter().find(|pair| pair.matches(live))
    }

    /// Filters to start when answering `pair`.
    ///
    /// If any filter's flow control bytes appear in the responses, only
    /// those filters and the ones without flow control apply. Otherwise
    /// every filter does.
    pub fn filters_for(&self, pair: &SimulationMessagePair) -> Vec<&MessageFilter> {
        let in_responses = |flow: &[u8]| {
            pair.message_responses
                .iter()
                .any(|response| response.contains_data(flow))
        };

        let flow_matched = self
            .filters
            .iter()
            .any(|f| f.flow_bytes().is_some_and(in_responses));
        if !flow_matched {
            return self.filters.iter().collect();
        }

        self.filters
            .iter()
            .filter(|f| f.flow_bytes().map_or(true, in_responses))
            .collect()
    }

    pub fn response_count(&self) -> usize {
        self.message_pairs
            .iter()
            .map(|p| p.message_responses.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn msg(data: &[u8]) -> PassThruMsg {
        PassThruMsg::new(ProtocolId::Iso15765, data.to_vec())
    }

    fn channel(filters: Vec<MessageFilter>) -> SimulationChannel {
        SimulationChannel {
            channel_id: 1,
            protocol: ProtocolId::Iso15765,
            connect_flags: 0,
            baud_rate: BaudRate::Iso15765_500000,
            filters,
            message_pairs: vec![
                SimulationMessagePair::new(msg(&[0x09, 0x02]), vec![msg(&[0x00, 0x00, 0x07, 0xE8, 0x49, 0x02])]),
                SimulationMessagePair::new(msg(&[0x01, 0x00]), vec![msg(&[0x00, 0x00, 0x07, 0xE9, 0x41, 0x00])]),
            ],
        }
    }

    fn flow_filter(pattern: u8, flow: u8) -> MessageFilter {
        MessageFilter::flow_control(
            vec![0x00, 0x00, 0xFF, 0xFF],
            vec![0x00, 0x00, 0x07, pattern],
            vec![0x00, 0x00, 0x07, flow],
            0x40,
        )
    }

    #[test]
    fn test_find_pair_by_containment() {
        let channel = channel(vec![]);
        let live = msg(&[0x00, 0x00, 0x07, 0xDF, 0x01, 0x00]);
        let pair = channel.find_pair(&live).unwrap();
        assert_eq!(pair.message_read.data_bytes, vec![0x01, 0x00]);
        assert!(channel.find_pair(&msg(&[0x01])).is_none());
    }

    #[test]
    fn test_empty_stimulus_never_matches() {
        let pair = SimulationMessagePair::new(msg(&[]), vec![]);
        assert!(!pair.matches(&msg(&[0x01, 0x02])));
    }

    #[test]
    fn test_filters_for_selects_by_flow_bytes() {
        let pass = MessageFilter::pass(vec![0; 4], vec![0; 4]);
        let channel = channel(vec![flow_filter(0xE0, 0xE8), flow_filter(0xE1, 0xE9), pass.clone()]);

        let first = channel.filters_for(&channel.message_pairs[0]);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].flow_control, Some(vec![0x00, 0x00, 0x07, 0xE8]));
        assert_eq!(first[1], &pass);

        let second = channel.filters_for(&channel.message_pairs[1]);
        assert_eq!(second[0].flow_control, Some(vec![0x00, 0x00, 0x07, 0xE9]));
    }

    #[test]
    fn test_filters_for_falls_back_to_all() {
        let channel = channel(vec![flow_filter(0xE0, 0xEA), flow_filter(0xE1, 0xEB)]);
        assert_eq!(channel.filters_for(&channel.message_pairs[0]).len(), 2);
    }
}
