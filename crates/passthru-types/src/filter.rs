//! Message filter definition

use serde::{Deserialize, Serialize};

use crate::codec::{spaced_hex, spaced_hex_opt};
use crate::enums::FilterType;

/// A mask/pattern filter as started on a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFilter {
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    #[serde(with = "spaced_hex")]
    pub mask: Vec<u8>,
    #[serde(with = "spaced_hex")]
    pub pattern: Vec<u8>,
    #[serde(default, with = "spaced_hex_opt", skip_serializing_if = "Option::is_none")]
    pub flow_control: Option<Vec<u8>>,
    /// Transmit flags of the filter messages
    #[serde(default)]
    pub flags: u32,
}

impl MessageFilter {
    pub fn pass(mask: Vec<u8>, pattern: Vec<u8>) -> Self {
        Self {
            filter_type: FilterType::Pass,
            mask,
            pattern,
            flow_control: None,
            flags: 0,
        }
    }

    pub fn flow_control(mask: Vec<u8>, pattern: Vec<u8>, flow_control: Vec<u8>, flags: u32) -> Self {
        Self {
            filter_type: FilterType::FlowControl,
            mask,
            pattern,
            flow_control: Some(flow_control),
            flags,
        }
    }

    /// The same filter seen from the other end of the link.
    ///
    /// A flow control filter swaps pattern and flow control; pass and block
    /// filters are unchanged.
    pub fn inverted(&self) -> Self {
        match (&self.filter_type, &self.flow_control) {
            (FilterType::FlowControl, Some(flow)) => Self {
                pattern: flow.clone(),
                flow_control: Some(self.pattern.clone()),
                ..self.clone()
            },
            _ => self.clone(),
        }
    }

    /// Flow control bytes, if the filter has any
    pub fn flow_bytes(&self) -> Option<&[u8]> {
        self.flow_control.as_deref().filter(|flow| !flow.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inverted_flow_control() {
        let logged = MessageFilter::flow_control(
            vec![0x00, 0x00, 0xFF, 0xFF],
            vec![0x00, 0x00, 0x07, 0xE8],
            vec![0x00, 0x00, 0x07, 0xE0],
            0x40,
        );
        let inverted = logged.inverted();
        assert_eq!(inverted.pattern, vec![0x00, 0x00, 0x07, 0xE0]);
        assert_eq!(inverted.flow_control, Some(vec![0x00, 0x00, 0x07, 0xE8]));
        assert_eq!(inverted.mask, logged.mask);
    }

    #[test]
    fn test_inverted_pass_unchanged() {
        let logged = MessageFilter::pass(vec![0x00; 4], vec![0x00; 4]);
        assert_eq!(logged.inverted(), logged);
    }

    #[test]
    fn test_serde_without_flow() {
        let filter = MessageFilter::pass(vec![0xFF], vec![0x01]);
        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(json, r#"{"type":"PASS_FILTER","mask":"FF","pattern":"01","flags":0}"#);
        let back: MessageFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filter);
    }
}
