//! Expression - the typed reconstruction of one logged PassThru call

use passthru_types::codec::{format_data, format_u32};
use passthru_types::{J2534Status, MessageFilter, PassThruMsg};

use crate::blocks::{self, IoctlParameter};
use crate::command::CommandType;
use crate::error::{ExprError, ExprResult};
use crate::field::{self, Field, FieldSpec};
use crate::registry::PatternRegistry;

/// Values longer than this are cut in rendered tables
const TRUNCATE_AT: usize = 60;
const TRUNCATED_LENGTH: usize = 49;

/// Marker written for read/write calls without messages
pub const NO_MESSAGES: &str = "No Messages Found!";
/// Marker written for IOCTL calls without parameters
pub const NO_PARAMETERS: &str = "No Parameters";

/// Span text meaning a read returned nothing
const ZERO_MESSAGES: &str = "Zero messages received";

/// Per-call payload beyond the bound fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionKind {
    None,
    Open,
    Close,
    Connect,
    Disconnect,
    StopMessageFilter,
    Ioctl { parameters: Vec<IoctlParameter> },
    ReadMessages { messages: Vec<PassThruMsg> },
    WriteMessages { messages: Vec<PassThruMsg> },
    StartMessageFilter { filter: Option<MessageFilter> },
}

impl ExpressionKind {
    pub fn command_type(&self) -> CommandType {
        match self {
            ExpressionKind::None => CommandType::None,
            ExpressionKind::Open => CommandType::Open,
            ExpressionKind::Close => CommandType::Close,
            ExpressionKind::Connect => CommandType::Connect,
            ExpressionKind::Disconnect => CommandType::Disconnect,
            ExpressionKind::StopMessageFilter => CommandType::StopMessageFilter,
            ExpressionKind::Ioctl { .. } => CommandType::Ioctl,
            ExpressionKind::ReadMessages { .. } => CommandType::ReadMessages,
            ExpressionKind::WriteMessages { .. } => CommandType::WriteMessages,
            ExpressionKind::StartMessageFilter { .. } => CommandType::StartMessageFilter,
        }
    }

    /// Declared fields, in binding order
    pub fn field_specs(&self) -> &'static [FieldSpec] {
        match self {
            ExpressionKind::None => &field::NONE_FIELDS,
            ExpressionKind::Open => &field::OPEN_FIELDS,
            ExpressionKind::Close => &field::CLOSE_FIELDS,
            ExpressionKind::Connect => &field::CONNECT_FIELDS,
            ExpressionKind::Disconnect => &field::DISCONNECT_FIELDS,
            ExpressionKind::StopMessageFilter => &field::STOP_FILTER_FIELDS,
            ExpressionKind::Ioctl { .. } => &field::IOCTL_FIELDS,
            ExpressionKind::ReadMessages { .. } => &field::READ_MESSAGES_FIELDS,
            ExpressionKind::WriteMessages { .. } => &field::WRITE_MESSAGES_FIELDS,
            ExpressionKind::StartMessageFilter { .. } => &field::START_FILTER_FIELDS,
        }
    }
}

/// One logged call with its fields bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    span_index: usize,
    raw_text: String,
    fields: Vec<Field>,
    kind: ExpressionKind,
}

impl Expression {
    /// Interpret a span. A span naming no known call becomes a NONE expression.
    pub fn parse(registry: &PatternRegistry, span_index: usize, span: &str) -> ExprResult<Self> {
        let command = CommandType::classify(span);
        let mut values = base_values(registry, span)?;

        let kind = match command {
            CommandType::Open => {
                values.extend(command_values(registry, command, span)?);
                values.push(returned_id(registry, CommandType::DeviceId, span)?);
                ExpressionKind::Open
            }
            CommandType::Close => {
                values.extend(command_values(registry, command, span)?);
                ExpressionKind::Close
            }
            CommandType::Connect => {
                values.extend(command_values(registry, command, span)?);
                values.push(returned_id(registry, CommandType::ChannelId, span)?);
                ExpressionKind::Connect
            }
            CommandType::Disconnect => {
                values.extend(command_values(registry, command, span)?);
                ExpressionKind::Disconnect
            }
            CommandType::StopMessageFilter => {
                values.extend(command_values(registry, command, span)?);
                ExpressionKind::StopMessageFilter
            }
            CommandType::ReadMessages => {
                values.extend(command_values(registry, command, span)?);
                values.extend(message_counts(registry, span)?);
                ExpressionKind::ReadMessages {
                    messages: blocks::read_messages(registry, span)?,
                }
            }
            CommandType::WriteMessages => {
                values.extend(command_values(registry, command, span)?);
                values.extend(message_counts(registry, span)?);
                ExpressionKind::WriteMessages {
                    messages: blocks::written_messages(registry, span)?,
                }
            }
            CommandType::StartMessageFilter => {
                let call = command_values(registry, command, span)?;
                // Command Line, Channel ID, Filter Type, ...
                let filter_type = call.get(2).cloned().unwrap_or_default();
                values.extend(call);
                values.push(returned_id(registry, CommandType::FilterId, span)?);
                ExpressionKind::StartMessageFilter {
                    filter: blocks::started_filter(registry, span, &filter_type)?,
                }
            }
            CommandType::Ioctl => {
                values.extend(command_values(registry, command, span)?);
                let parameters = blocks::ioctl_parameters(registry, span)?;
                values.push(match parameters.len() {
                    0 => NO_PARAMETERS.to_string(),
                    n => format!("{} Parameters", n),
                });
                ExpressionKind::Ioctl { parameters }
            }
            _ => ExpressionKind::None,
        };

        let fields = bind(kind.command_type(), kind.field_specs(), values)?;
        Ok(Self {
            span_index,
            raw_text: span.to_string(),
            fields,
            kind,
        })
    }

    pub fn command_type(&self) -> CommandType {
        self.kind.command_type()
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    /// Position of the originating span in the log
    pub fn span_index(&self) -> usize {
        self.span_index
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by name, ignoring case and whitespace
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_named(name))
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.field(name).map(Field::value)
    }

    /// True only if every field holds its expected value
    pub fn passed(&self) -> bool {
        self.fields.iter().all(Field::passed)
    }

    pub fn time_issued(&self) -> &str {
        self.fields.first().map(Field::value).unwrap_or_default()
    }

    pub fn status(&self) -> &str {
        self.fields.get(1).map(Field::value).unwrap_or_default()
    }

    /// Numeric channel id, when this call names one
    pub fn channel_id(&self) -> Option<u32> {
        self.field_value("Channel ID")?.parse().ok()
    }

    /// Messages read or written, empty for other calls
    pub fn messages(&self) -> &[PassThruMsg] {
        match &self.kind {
            ExpressionKind::ReadMessages { messages } | ExpressionKind::WriteMessages { messages } => {
                messages
            }
            _ => &[],
        }
    }

    pub fn filter(&self) -> Option<&MessageFilter> {
        match &self.kind {
            ExpressionKind::StartMessageFilter { filter } => filter.as_ref(),
            _ => None,
        }
    }

    pub fn parameters(&self) -> &[IoctlParameter] {
        match &self.kind {
            ExpressionKind::Ioctl { parameters } => parameters,
            _ => &[],
        }
    }

    /// Field table plus message/filter/parameter detail, one line per entry
    pub fn render_table(&self) -> Vec<String> {
        let mut lines = vec![
            table_row("Value Name", "Determined Value", "Value Status"),
            table_rule(),
        ];
        lines.extend(
            self.fields
                .iter()
                .map(|f| table_row(f.name(), f.value(), f.status_label())),
        );

        match &self.kind {
            ExpressionKind::ReadMessages { messages } | ExpressionKind::WriteMessages { messages } => {
                if messages.is_empty() {
                    lines.push(format!("   {}", NO_MESSAGES));
                }
                for (i, msg) in messages.iter().enumerate() {
                    lines.push(format!(
                        "| Msg[{}] | {} | RxS={} | TxF={} | {}",
                        i,
                        msg.protocol_id,
                        format_u32(msg.rx_status),
                        format_u32(msg.flags),
                        msg.data_hex()
                    ));
                }
            }
            ExpressionKind::StartMessageFilter { filter: Some(filter) } => {
                lines.push(format!("| Mask    | {}", format_data(&filter.mask)));
                lines.push(format!("| Pattern | {}", format_data(&filter.pattern)));
                if let Some(flow) = &filter.flow_control {
                    lines.push(format!("| Flow    | {}", format_data(flow)));
                }
            }
            ExpressionKind::Ioctl { parameters } => {
                if parameters.is_empty() {
                    lines.push(format!("   {}", NO_PARAMETERS));
                }
                for param in parameters {
                    lines.push(format!("| {} | {}", param.name, param.value));
                }
            }
            _ => {}
        }
        lines
    }
}

fn base_values(registry: &PatternRegistry, span: &str) -> ExprResult<Vec<String>> {
    let time = registry
        .require(CommandType::CommandTime)?
        .evaluate(span)
        .and_then(|v| v.into_iter().next())
        .unwrap_or_default();
    let status = registry
        .require(CommandType::CommandStatus)?
        .evaluate(span)
        .and_then(|v| v.into_iter().next())
        .unwrap_or_else(|| J2534Status::NoError.log_form());
    Ok(vec![time, status])
}

fn command_values(
    registry: &PatternRegistry,
    command: CommandType,
    span: &str,
) -> ExprResult<Vec<String>> {
    registry
        .require(command)?
        .evaluate(span)
        .ok_or(ExprError::PatternMismatch(command))
}

/// Id returned by the call, `-1` when the log shows none
fn returned_id(registry: &PatternRegistry, tag: CommandType, span: &str) -> ExprResult<String> {
    Ok(registry
        .require(tag)?
        .evaluate(span)
        .and_then(|v| v.into_iter().next())
        .unwrap_or_else(|| "-1".to_string()))
}

fn message_counts(registry: &PatternRegistry, span: &str) -> ExprResult<Vec<String>> {
    if let Some(counts) = registry.require(CommandType::MessageCount)?.evaluate(span) {
        return Ok(counts);
    }
    let fallback = if span.contains(ZERO_MESSAGES) { "0" } else { "?" };
    Ok(vec![fallback.to_string(), fallback.to_string()])
}

fn bind(
    command: CommandType,
    specs: &'static [FieldSpec],
    values: Vec<String>,
) -> ExprResult<Vec<Field>> {
    if specs.len() != values.len() {
        return Err(ExprError::FieldCount {
            command,
            expected: specs.len(),
            found: values.len(),
        });
    }
    Ok(specs
        .iter()
        .zip(values)
        .map(|(spec, value)| Field::new(spec, value))
        .collect())
}

fn truncate_value(value: &str) -> String {
    if value.chars().count() >= TRUNCATE_AT {
        let head: String = value.chars().take(TRUNCATED_LENGTH).collect();
        format!("{} (Truncated)", head)
    } else {
        value.to_string()
    }
}

fn table_row(name: &str, value: &str, status: &str) -> String {
    format!("| {:<24} | {:<61} | {:<18} |", name, truncate_value(value), status)
}

fn table_rule() -> String {
    format!("|{}|{}|{}|", "-".repeat(26), "-".repeat(63), "-".repeat(20))
}
