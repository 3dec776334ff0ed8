//! Command types recognized in shim logs

use std::fmt;

/// Closed set of tags a pattern or expression can carry.
///
/// The first block are PassThru calls that become expressions; the rest are
/// supporting patterns used while binding their fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandType {
    None,
    Open,
    Close,
    Ioctl,
    Connect,
    Disconnect,
    ReadMessages,
    WriteMessages,
    StartMessageFilter,
    StopMessageFilter,
    CommandTime,
    CommandStatus,
    MessageCount,
    DeviceId,
    ChannelId,
    FilterId,
    MessageReadInfo,
    MessageSentInfo,
    MessageFilterInfo,
    IoctlParameterInfo,
}

impl CommandType {
    /// PassThru calls in classification order
    pub const COMMANDS: [CommandType; 9] = [
        CommandType::Open,
        CommandType::Close,
        CommandType::Ioctl,
        CommandType::Connect,
        CommandType::Disconnect,
        CommandType::ReadMessages,
        CommandType::WriteMessages,
        CommandType::StartMessageFilter,
        CommandType::StopMessageFilter,
    ];

    /// Every type a registry must define
    pub const REGISTERED: [CommandType; 19] = [
        CommandType::Open,
        CommandType::Close,
        CommandType::Ioctl,
        CommandType::Connect,
        CommandType::Disconnect,
        CommandType::ReadMessages,
        CommandType::WriteMessages,
        CommandType::StartMessageFilter,
        CommandType::StopMessageFilter,
        CommandType::CommandTime,
        CommandType::CommandStatus,
        CommandType::MessageCount,
        CommandType::DeviceId,
        CommandType::ChannelId,
        CommandType::FilterId,
        CommandType::MessageReadInfo,
        CommandType::MessageSentInfo,
        CommandType::MessageFilterInfo,
        CommandType::IoctlParameterInfo,
    ];

    /// Key used by registry files
    pub fn registry_name(self) -> &'static str {
        match self {
            CommandType::None => "NONE",
            CommandType::Open => "PTOpen",
            CommandType::Close => "PTClose",
            CommandType::Ioctl => "PTIoctl",
            CommandType::Connect => "PTConnect",
            CommandType::Disconnect => "PTDisconnect",
            CommandType::ReadMessages => "PTReadMsgs",
            CommandType::WriteMessages => "PTWriteMsgs",
            CommandType::StartMessageFilter => "PTStartMsgFilter",
            CommandType::StopMessageFilter => "PTStopMsgFilter",
            CommandType::CommandTime => "CommandTime",
            CommandType::CommandStatus => "CommandStatus",
            CommandType::MessageCount => "MessageCount",
            CommandType::DeviceId => "DeviceID",
            CommandType::ChannelId => "ChannelID",
            CommandType::FilterId => "FilterID",
            CommandType::MessageReadInfo => "MessageReadInfo",
            CommandType::MessageSentInfo => "MessageSentInfo",
            CommandType::MessageFilterInfo => "MessageFilterInfo",
            CommandType::IoctlParameterInfo => "IoctlParameterInfo",
        }
    }

    /// Resolve a human readable registry name.
    ///
    /// `Regex`, spaces and dashes are dropped and `PassThru` reads as `PT`, so
    /// `"PassThru Connect Regex"` resolves to [`CommandType::Connect`].
    pub fn from_registry_name(name: &str) -> Option<Self> {
        let key: String = name
            .replace("Regex", "")
            .replace("PassThru", "PT")
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        Self::REGISTERED
            .iter()
            .copied()
            .find(|tag| tag.registry_name().eq_ignore_ascii_case(&key))
    }

    /// Name of the call as it appears in a log line, for PassThru calls
    pub fn log_tag(self) -> Option<&'static str> {
        Self::COMMANDS
            .contains(&self)
            .then(|| self.registry_name())
    }

    /// Classify a span: first call in [`Self::COMMANDS`] order whose log tag
    /// occurs in the text, or [`CommandType::None`]
    pub fn classify(span: &str) -> Self {
        Self::COMMANDS
            .iter()
            .copied()
            .find(|command| command.log_tag().is_some_and(|tag| span.contains(tag)))
            .unwrap_or(CommandType::None)
    }

    /// True for PassThru calls that survive extraction
    pub fn is_command(self) -> bool {
        Self::COMMANDS.contains(&self)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.registry_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0s ++ PTOpen(J2534, 0x0012FF00)", CommandType::Open)]
    #[case("1.0s ++ PTConnect(1, 6:ISO15765, 0x0, 500000, 0x1)", CommandType::Connect)]
    #[case("1.0s ++ PTDisconnect(1)", CommandType::Disconnect)]
    #[case("1.0s ++ PTReadMsgs(1, 0x1, 0x2, 100)", CommandType::ReadMessages)]
    #[case("1.0s ++ PTStopMsgFilter(1, 0)", CommandType::StopMessageFilter)]
    #[case("1.0s ** comment line", CommandType::None)]
    fn test_classify(#[case] span: &str, #[case] expected: CommandType) {
        assert_eq!(CommandType::classify(span), expected);
    }

    #[test]
    fn test_classify_first_match_wins() {
        // Close is declared before WriteMsgs, so a write span quoting PTClose classifies as Close
        let span = "1.0s ++ PTWriteMsgs(1, 0x1, 0x2, 100) after PTClose(1)";
        assert_eq!(CommandType::classify(span), CommandType::Close);
    }

    #[rstest]
    #[case("PassThru Connect Regex", CommandType::Connect)]
    #[case("PTReadMsgs", CommandType::ReadMessages)]
    #[case("Command Time Regex", CommandType::CommandTime)]
    #[case("Channel ID Regex", CommandType::ChannelId)]
    #[case("message-filter-info", CommandType::MessageFilterInfo)]
    fn test_from_registry_name(#[case] name: &str, #[case] expected: CommandType) {
        assert_eq!(CommandType::from_registry_name(name), Some(expected));
    }

    #[test]
    fn test_unknown_registry_name() {
        assert_eq!(CommandType::from_registry_name("PassThru Flash Regex"), None);
        assert_eq!(CommandType::from_registry_name("NONE"), None);
    }

    #[test]
    fn test_log_tag_only_for_commands() {
        assert_eq!(CommandType::Ioctl.log_tag(), Some("PTIoctl"));
        assert_eq!(CommandType::CommandTime.log_tag(), None);
        assert!(!CommandType::None.is_command());
    }
}
