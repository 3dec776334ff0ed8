//! Text helpers for the number and byte formats used by shim logs

use crate::error::{TypeError, TypeResult};

/// Parse a decimal or `0x`-prefixed hex integer
pub fn parse_u32(s: &str) -> TypeResult<u32> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse::<u32>()
    };
    parsed.map_err(|_| TypeError::InvalidNumber(s.to_string()))
}

/// Format an integer the way shim logs print pointers and flags
pub fn format_u32(value: u32) -> String {
    format!("0x{:08X}", value)
}

/// Resolve a log token such as `6:ISO15765`, `ISO15765` or `6`.
///
/// With a `value:NAME` pair the name wins and the number is the fallback.
pub(crate) fn parse_log_token<T>(
    token: &str,
    by_name: impl Fn(&str) -> Option<T>,
    by_value: impl Fn(u32) -> Option<T>,
) -> Option<T> {
    let token = token.trim();
    if let Some((value, name)) = token.split_once(':') {
        return by_name(name).or_else(|| parse_u32(value).ok().and_then(&by_value));
    }
    by_name(token).or_else(|| parse_u32(token).ok().and_then(by_value))
}

/// Format data bytes as spaced uppercase hex (`00 00 07 E8`)
pub fn format_data(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex bytes, ignoring whitespace between them
pub fn parse_data(s: &str) -> TypeResult<Vec<u8>> {
    let compact: String = s.split_whitespace().collect();
    hex::decode(&compact).map_err(|_| TypeError::InvalidHex(s.trim().to_string()))
}

/// True for a token that is exactly one hex byte, e.g. `e8`
pub fn is_hex_byte(token: &str) -> bool {
    token.len() == 2 && token.chars().all(|c| c.is_ascii_hexdigit())
}

/// Serde adapter storing byte vectors as spaced hex strings
pub mod spaced_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_data(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_data(&s).map_err(serde::de::Error::custom)
    }
}

/// Same as [`spaced_hex`] for optional byte vectors
pub mod spaced_hex_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => serializer.serialize_some(&super::format_data(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if !s.trim().is_empty() => super::parse_data(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u32() {
        assert_eq!(parse_u32("500000").unwrap(), 500000);
        assert_eq!(parse_u32("0x00000040").unwrap(), 0x40);
        assert_eq!(parse_u32(" 0X1F ").unwrap(), 0x1F);
        assert!(parse_u32("?").is_err());
    }

    #[test]
    fn test_format_and_parse_data() {
        assert_eq!(format_data(&[0x00, 0x07, 0xe8]), "00 07 E8");
        assert_eq!(parse_data("00 00 07 e8").unwrap(), vec![0x00, 0x00, 0x07, 0xE8]);
        assert_eq!(parse_data("").unwrap(), Vec::<u8>::new());
        assert!(parse_data("0G").is_err());
    }

    #[test]
    fn test_is_hex_byte() {
        assert!(is_hex_byte("e8"));
        assert!(is_hex_byte("0F"));
        assert!(!is_hex_byte("0x"));
        assert!(!is_hex_byte("read"));
    }
}
