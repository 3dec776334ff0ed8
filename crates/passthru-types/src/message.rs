//! PassThru message

use serde::{Deserialize, Serialize};

use crate::codec::{format_data, spaced_hex};
use crate::flags::{rx_status, tx_flags};
use crate::protocol::ProtocolId;

/// Largest ISO15765 payload (with the 4 byte CAN id) that still fits a single padded frame
const SINGLE_FRAME_LIMIT: usize = 12;

/// A message as read from or written to a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassThruMsg {
    pub protocol_id: ProtocolId,
    /// Transmit flags
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub rx_status: u32,
    /// Receive timestamp in microseconds
    #[serde(default)]
    pub timestamp: u32,
    #[serde(with = "spaced_hex")]
    pub data_bytes: Vec<u8>,
}

impl PassThruMsg {
    pub fn new(protocol_id: ProtocolId, data_bytes: Vec<u8>) -> Self {
        Self {
            protocol_id,
            flags: tx_flags::NO_TX_FLAGS,
            rx_status: rx_status::NO_RX_STATUS,
            timestamp: 0,
            data_bytes,
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_rx_status(mut self, rx_status: u32) -> Self {
        self.rx_status = rx_status;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Data as spaced uppercase hex
    pub fn data_hex(&self) -> String {
        format_data(&self.data_bytes)
    }

    /// Loopback echo of a message this side transmitted
    pub fn is_echo(&self) -> bool {
        self.rx_status & rx_status::TX_MSG_TYPE != 0
    }

    /// First-frame indication without payload
    pub fn is_start_of_message(&self) -> bool {
        self.rx_status & rx_status::START_OF_MESSAGE != 0
    }

    /// True if `needle` occurs as a contiguous run inside this message's data
    pub fn contains_data(&self, needle: &[u8]) -> bool {
        !needle.is_empty()
            && self
                .data_bytes
                .windows(needle.len())
                .any(|window| window == needle)
    }

    /// Turn a received message into one ready to be sent back out.
    ///
    /// Short ISO15765 messages get frame padding the way the tester saw them.
    pub fn into_response(self) -> Self {
        let flags = if self.protocol_id.is_iso15765() && self.data_bytes.len() <= SINGLE_FRAME_LIMIT {
            tx_flags::ISO15765_FRAME_PAD
        } else {
            self.flags
        };
        Self {
            flags,
            rx_status: rx_status::NO_RX_STATUS,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_contains_data() {
        let msg = PassThruMsg::new(ProtocolId::Iso15765, vec![0x00, 0x00, 0x07, 0xE0, 0x02, 0x01, 0x0D]);
        assert!(msg.contains_data(&[0x02, 0x01, 0x0D]));
        assert!(msg.contains_data(&[0x07, 0xE0]));
        assert!(!msg.contains_data(&[0x01, 0x02]));
        assert!(!msg.contains_data(&[]));
    }

    #[test]
    fn test_into_response_pads_short_iso15765() {
        let read = PassThruMsg::new(ProtocolId::Iso15765, vec![0x00, 0x00, 0x07, 0xE8, 0x41, 0x0D])
            .with_rx_status(rx_status::ISO15765_ADDR_TYPE);
        let response = read.into_response();
        assert_eq!(response.flags, tx_flags::ISO15765_FRAME_PAD);
        assert_eq!(response.rx_status, 0);
    }

    #[test]
    fn test_into_response_keeps_long_flags() {
        let read = PassThruMsg::new(ProtocolId::Iso15765, vec![0u8; 20]);
        assert_eq!(read.into_response().flags, tx_flags::NO_TX_FLAGS);
    }

    #[test]
    fn test_serde_shape() {
        let msg = PassThruMsg::new(ProtocolId::Can, vec![0x07, 0xDF, 0x02]).with_timestamp(1500);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "protocolId": "CAN",
                "flags": 0,
                "rxStatus": 0,
                "timestamp": 1500,
                "dataBytes": "07 DF 02"
            })
        );
        let back: PassThruMsg = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
