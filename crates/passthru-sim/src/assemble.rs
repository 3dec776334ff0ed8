//! Channel assembler - groups expressions by channel and builds replayable channels

use std::collections::BTreeMap;

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use passthru_expr::{CommandType, Expression};
use passthru_types::codec::parse_u32;
use passthru_types::{BaudRate, MessageFilter, PassThruMsg, ProtocolId};

use crate::error::AssemblyError;
use crate::simulation::{SimulationChannel, SimulationMessagePair};

/// Channel id given to expressions that name no channel
const UNASSIGNED_CHANNEL: u32 = 0;

/// Builds simulation channels from extracted expressions
#[derive(Debug, Default)]
pub struct ChannelAssembler;

impl ChannelAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build every channel found in `expressions`
    pub fn assemble(
        &self,
        expressions: &[Expression],
    ) -> Result<BTreeMap<u32, SimulationChannel>, AssemblyError> {
        self.assemble_into(BTreeMap::new(), expressions)
    }

    /// Build channels into an existing set.
    ///
    /// A channel id already present in `existing` is a hard failure.
    pub fn assemble_into(
        &self,
        existing: BTreeMap<u32, SimulationChannel>,
        expressions: &[Expression],
    ) -> Result<BTreeMap<u32, SimulationChannel>, AssemblyError> {
        let groups: Vec<(u32, Vec<&Expression>)> = group_by_channel(expressions).into_iter().collect();
        let output = Mutex::new(existing);

        groups.par_iter().try_for_each(|(channel_id, group)| {
            let Some(channel) = build_channel(*channel_id, group) else {
                return Ok(());
            };
            let mut output = output.lock();
            if output.contains_key(channel_id) {
                return Err(AssemblyError::DuplicateChannel(*channel_id));
            }
            output.insert(*channel_id, channel);
            Ok(())
        })?;

        let channels = output.into_inner();
        info!(channels = channels.len(), "Assembled simulation channels");
        Ok(channels)
    }
}

fn group_by_channel(expressions: &[Expression]) -> BTreeMap<u32, Vec<&Expression>> {
    let mut groups: BTreeMap<u32, Vec<&Expression>> = BTreeMap::new();
    for expression in expressions
        .iter()
        .filter(|e| e.command_type() != CommandType::None)
    {
        let channel_id = expression.channel_id().unwrap_or(UNASSIGNED_CHANNEL);
        groups.entry(channel_id).or_default().push(expression);
    }
    if let Some(unassigned) = groups.remove(&UNASSIGNED_CHANNEL) {
        debug!(expressions = unassigned.len(), "Ignoring expressions without a channel");
    }
    groups
}

fn build_channel(channel_id: u32, group: &[&Expression]) -> Option<SimulationChannel> {
    let Some(connect) = group
        .iter()
        .find(|e| e.command_type() == CommandType::Connect)
    else {
        warn!(channel_id, "Discarding channel without a connect call");
        return None;
    };

    let has = |command: CommandType| group.iter().any(|e| e.command_type() == command);
    if !has(CommandType::ReadMessages) || !has(CommandType::WriteMessages) {
        warn!(channel_id, "Discarding channel without both reads and writes");
        return None;
    }

    let (protocol, connect_flags, baud_rate) = match connection(connect) {
        Ok(connection) => connection,
        Err(reason) => {
            warn!(channel_id, reason = %reason, "Discarding channel with unusable connect call");
            return None;
        }
    };

    let message_pairs = build_pairs(group);
    if message_pairs.is_empty() {
        warn!(channel_id, "Discarding channel with no message pairs");
        return None;
    }

    let filters: Vec<MessageFilter> = group
        .iter()
        .filter_map(|e| e.filter())
        .map(MessageFilter::inverted)
        .collect();

    info!(
        channel_id,
        protocol = %protocol,
        baud_rate = %baud_rate,
        filters = filters.len(),
        pairs = message_pairs.len(),
        "Built simulation channel"
    );
    Some(SimulationChannel {
        channel_id,
        protocol,
        connect_flags,
        baud_rate,
        filters,
        message_pairs,
    })
}

fn connection(connect: &Expression) -> Result<(ProtocolId, u32, BaudRate), String> {
    let field = |name: &str| {
        connect
            .field_value(name)
            .ok_or_else(|| format!("missing {}", name))
    };

    let protocol: ProtocolId = field("Protocol ID")?.parse().map_err(|e| format!("{}", e))?;
    let connect_flags = parse_u32(field("Connect Flags")?).map_err(|e| format!("{}", e))?;
    let bps = parse_u32(field("BaudRate")?).map_err(|e| format!("{}", e))?;
    let baud_rate = BaudRate::for_protocol(protocol, bps)
        .ok_or_else(|| format!("no baud rate {}_{}", protocol.baud_family(), bps))?;
    Ok((protocol, connect_flags, baud_rate))
}

/// Pair each write with the reads that follow it, in log order
///
/// A write without a logged message closes the open pair, and the reads
/// after it are dropped until the next write.
fn build_pairs(group: &[&Expression]) -> Vec<SimulationMessagePair> {
    let mut pairs: Vec<SimulationMessagePair> = Vec::new();
    let mut open = false;

    for expression in group {
        match expression.command_type() {
            CommandType::WriteMessages => {
                open = match expression.messages().first() {
                    Some(stimulus) => {
                        pairs.push(SimulationMessagePair::new(stimulus.clone(), Vec::new()));
                        true
                    }
                    None => false,
                };
            }
            CommandType::ReadMessages => {
                if !open {
                    continue;
                }
                let Some(pair) = pairs.last_mut() else {
                    continue;
                };
                pair.message_responses.extend(
                    expression
                        .messages()
                        .iter()
                        .filter(|m| !m.is_echo() && !m.is_start_of_message())
                        .cloned()
                        .map(PassThruMsg::into_response),
                );
            }
            _ => {}
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use passthru_expr::{ExpressionExtractor, PatternRegistry};
    use passthru_types::flags::tx_flags;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const LOG: &str = r"2.558s ++ PTConnect(1, 6:ISO15765, 0x00000000, 500000, 0x0015F8F4)
   returning ChannelID: 1
2.563s   0:STATUS_NOERROR
3.001s ++ PTStartMsgFilter(1, 3:FLOW_CONTROL_FILTER, 0x0015F6A0, 0x0015F5F8, 0x0015F550, 0x0015F8FC)
  Mask[0]    | 6:ISO15765. 4 bytes. TxF=0x00000040
  \__ 00 00 ff ff
  Pattern[0] | 6:ISO15765. 4 bytes. TxF=0x00000040
  \__ 00 00 07 e8
  FlowControl[0] | 6:ISO15765. 4 bytes. TxF=0x00000040
  \__ 00 00 07 e0
   returning FilterID: 0
3.005s   0:STATUS_NOERROR
4.000s ++ PTWriteMsgs(1, 0x0015F050, 0x0015F8F8, 100)
  Msg[0] 6:ISO15765. 6 bytes. TxF=0x00000040
  \__ 00 00 07 e0 01 00
   sent 1 of 1 messages
4.010s   0:STATUS_NOERROR
4.020s ++ PTReadMsgs(1, 0x00153C48, 0x0015F8F8, 100)
  Msg[0] 4.015000s. 6:ISO15765. Actual data 6 of 6 bytes. RxS=0x00000009
  \__ 00 00 07 e0 01 00
  Msg[1] 4.018000s. 6:ISO15765. Actual data 10 of 10 bytes. RxS=0x00000000
  \__ 00 00 07 e8 41 00 be 3f a8 13
   read 2 of 2 messages
4.120s   0:STATUS_NOERROR
5.000s ++ PTWriteMsgs(1, 0x0015F050, 0x0015F8F8, 100)
  Msg[0] 6:ISO15765. 6 bytes. TxF=0x00000040
  \__ 00 00 07 e0 3e 00
   sent 1 of 1 messages
5.010s   0:STATUS_NOERROR
";

    fn expressions(log: &str) -> Vec<Expression> {
        let registry = Arc::new(PatternRegistry::builtin().unwrap());
        ExpressionExtractor::new(registry).unwrap().extract(log).unwrap()
    }

    #[test]
    fn test_assemble_channel() {
        let channels = ChannelAssembler::new().assemble(&expressions(LOG)).unwrap();
        assert_eq!(channels.len(), 1);

        let channel = &channels[&1];
        assert_eq!(channel.protocol, ProtocolId::Iso15765);
        assert_eq!(channel.baud_rate, BaudRate::Iso15765_500000);
        assert_eq!(channel.message_pairs.len(), 2);

        let first = &channel.message_pairs[0];
        assert_eq!(first.message_read.data_bytes, vec![0x00, 0x00, 0x07, 0xE0, 0x01, 0x00]);
        assert_eq!(first.message_responses.len(), 1);
        assert_eq!(first.message_responses[0].flags, tx_flags::ISO15765_FRAME_PAD);
        assert_eq!(first.message_responses[0].rx_status, 0);
        assert!(channel.message_pairs[1].message_responses.is_empty());
    }

    #[test]
    fn test_write_without_messages_closes_pair() {
        let failed_write = r"6.000s ++ PTWriteMsgs(1, 0x0015F050, 0x0015F8F8, 100)
   sent 0 of 1 messages
6.010s   7:ERR_FAILED
6.020s ++ PTReadMsgs(1, 0x00153C48, 0x0015F8F8, 100)
  Msg[0] 6.015000s. 6:ISO15765. Actual data 6 of 6 bytes. RxS=0x00000000
  \__ 00 00 07 e8 7f 09
   read 1 of 1 messages
6.120s   0:STATUS_NOERROR
";
        let log = format!("{}{}", LOG, failed_write);
        let exprs = expressions(&log);
        let failed = exprs
            .iter()
            .filter(|e| e.command_type() == CommandType::WriteMessages)
            .last()
            .unwrap();
        assert!(failed.messages().is_empty());

        let channels = ChannelAssembler::new().assemble(&exprs).unwrap();
        let pairs = &channels[&1].message_pairs;
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].message_responses.len(), 1);
        assert_eq!(
            pairs[0].message_responses[0].data_bytes,
            vec![0x00, 0x00, 0x07, 0xE8, 0x41, 0x00, 0xBE, 0x3F, 0xA8, 0x13]
        );
        assert!(pairs[1].message_responses.is_empty());
    }

    #[test]
    fn test_filters_are_inverted() {
        let channels = ChannelAssembler::new().assemble(&expressions(LOG)).unwrap();
        let filter = &channels[&1].filters[0];
        assert_eq!(filter.pattern, vec![0x00, 0x00, 0x07, 0xE0]);
        assert_eq!(filter.flow_control, Some(vec![0x00, 0x00, 0x07, 0xE8]));
    }

    #[test]
    fn test_channel_without_connect_is_discarded() {
        let without_connect = LOG.split_once("3.001s").map(|(_, rest)| format!("3.001s{}", rest)).unwrap();
        let channels = ChannelAssembler::new().assemble(&expressions(&without_connect)).unwrap();
        assert!(channels.is_empty());
    }

    #[test]
    fn test_unknown_baud_is_discarded() {
        let log = LOG.replace("500000", "333333");
        let channels = ChannelAssembler::new().assemble(&expressions(&log)).unwrap();
        assert!(channels.is_empty());
    }

    #[test]
    fn test_channel_zero_is_ignored() {
        let log = LOG.replace("(1,", "(0,").replace("ChannelID: 1", "ChannelID: 0");
        let channels = ChannelAssembler::new().assemble(&expressions(&log)).unwrap();
        assert!(channels.is_empty());
    }

    #[test]
    fn test_duplicate_channel_fails() {
        let assembler = ChannelAssembler::new();
        let expressions = expressions(LOG);
        let existing = assembler.assemble(&expressions).unwrap();
        let err = assembler.assemble_into(existing, &expressions).unwrap_err();
        assert_eq!(err, AssemblyError::DuplicateChannel(1));
    }
}
