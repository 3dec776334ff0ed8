//! Message, filter and IOCTL parameter blocks inside a span

use passthru_types::codec::{self, is_hex_byte};
use passthru_types::{ConfigParam, ConfigParamId, FilterType, MessageFilter, PassThruMsg, ProtocolId};

use crate::command::CommandType;
use crate::error::ExprResult;
use crate::registry::{PatternMatch, PatternRegistry};

/// Marker a shim writes before the data bytes of a block
const DATA_PREFIX: &str = r"\__";

/// One `id:NAME = value` line of an IOCTL call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoctlParameter {
    pub name: String,
    pub value: String,
}

impl IoctlParameter {
    /// Typed form, when the name is a known configuration parameter
    pub fn as_config_param(&self) -> Option<ConfigParam> {
        let id = ConfigParamId::from_name(&self.name)?;
        let value = codec::parse_u32(&self.value).ok()?;
        Some(ConfigParam::new(id, value))
    }
}

/// Messages returned by a `PTReadMsgs` call
pub(crate) fn read_messages(registry: &PatternRegistry, span: &str) -> ExprResult<Vec<PassThruMsg>> {
    let headers = registry.require(CommandType::MessageReadInfo)?.find_all(span);
    blocks(span, &headers)
        .map(|(header, data)| -> ExprResult<PassThruMsg> {
            // index, timestamp, protocol, actual size, total size, rx status
            let protocol: ProtocolId = value(header, 2).parse()?;
            let rx_status = codec::parse_u32(value(header, 5))?;
            Ok(PassThruMsg::new(protocol, data)
                .with_rx_status(rx_status)
                .with_timestamp(parse_timestamp_us(value(header, 1))))
        })
        .collect()
}

/// Messages passed to a `PTWriteMsgs` call
pub(crate) fn written_messages(
    registry: &PatternRegistry,
    span: &str,
) -> ExprResult<Vec<PassThruMsg>> {
    let headers = registry.require(CommandType::MessageSentInfo)?.find_all(span);
    blocks(span, &headers)
        .map(|(header, data)| -> ExprResult<PassThruMsg> {
            // index, protocol, size, tx flags
            let protocol: ProtocolId = value(header, 1).parse()?;
            let flags = codec::parse_u32(value(header, 3))?;
            Ok(PassThruMsg::new(protocol, data).with_flags(flags))
        })
        .collect()
}

/// Filter started by a `PTStartMsgFilter` call, if mask and pattern were logged
pub(crate) fn started_filter(
    registry: &PatternRegistry,
    span: &str,
    filter_type: &str,
) -> ExprResult<Option<MessageFilter>> {
    let Ok(filter_type) = filter_type.parse::<FilterType>() else {
        return Ok(None);
    };

    let headers = registry.require(CommandType::MessageFilterInfo)?.find_all(span);
    let mut mask = None;
    let mut pattern = None;
    let mut flow_control = None;
    let mut flags = 0;

    for (header, data) in blocks(span, &headers) {
        // part, index, protocol, size, tx flags
        match value(header, 0) {
            "Mask" => {
                flags = codec::parse_u32(value(header, 4))?;
                mask = Some(data);
            }
            "Pattern" => pattern = Some(data),
            "FlowControl" => flow_control = Some(data),
            _ => {}
        }
    }

    Ok(match (mask, pattern) {
        (Some(mask), Some(pattern)) => Some(MessageFilter {
            filter_type,
            mask,
            pattern,
            flow_control,
            flags,
        }),
        _ => None,
    })
}

/// Parameters listed under a `PTIoctl` call
pub(crate) fn ioctl_parameters(
    registry: &PatternRegistry,
    span: &str,
) -> ExprResult<Vec<IoctlParameter>> {
    Ok(registry
        .require(CommandType::IoctlParameterInfo)?
        .find_all(span)
        .into_iter()
        .map(|found| IoctlParameter {
            name: value(&found, 0).to_string(),
            value: value(&found, 1).to_string(),
        })
        .collect())
}

/// Pair each header with the data bytes logged between it and the next header
fn blocks<'a>(
    span: &'a str,
    headers: &'a [PatternMatch],
) -> impl Iterator<Item = (&'a PatternMatch, Vec<u8>)> + 'a {
    headers.iter().enumerate().map(move |(i, header)| {
        let end = headers.get(i + 1).map_or(span.len(), |next| next.start);
        (header, data_bytes(&span[header.end..end]))
    })
}

/// Collect hex byte lines following a header until the first non-data line.
///
/// Lines may carry the `\__` marker; continuation lines are bare bytes.
fn data_bytes(block: &str) -> Vec<u8> {
    let mut data = Vec::new();
    for line in block.lines().skip(1) {
        let line = line.trim();
        let line = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if !tokens.iter().all(|t| is_hex_byte(t)) {
            break;
        }
        data.extend(tokens.iter().filter_map(|t| u8::from_str_radix(t, 16).ok()));
    }
    data
}

fn value(found: &PatternMatch, index: usize) -> &str {
    found.values.get(index).map(String::as_str).unwrap_or_default()
}

/// `4.015000` seconds to microseconds
///
/// Device timestamps are a 32-bit microsecond counter, so values past
/// `u32::MAX` wrap around like the hardware counter does.
fn parse_timestamp_us(seconds: &str) -> u32 {
    seconds
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| ((s * 1_000_000.0).round() as u64 % (1u64 << 32)) as u32)
        .unwrap_or_default()
}
