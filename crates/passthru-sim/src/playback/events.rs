//! Events published by the playback engine

use std::fmt;

use passthru_types::PassThruMsg;

/// Which stage of the replay loop failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopErrorKind {
    /// Reading from or restoring the reader channel
    SetupReader,
    /// Connecting the channel a response is sent on
    GenerateResponseChannel,
    /// Writing a response
    MessageResponse,
}

impl LoopErrorKind {
    /// Fatal errors stop the loop
    pub fn is_fatal(self) -> bool {
        !matches!(self, LoopErrorKind::MessageResponse)
    }
}

impl fmt::Display for LoopErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopErrorKind::SetupReader => "setup reader",
            LoopErrorKind::GenerateResponseChannel => "generate response channel",
            LoopErrorKind::MessageResponse => "message response",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A response channel replaced the reader
    ChannelChanged {
        /// Recorded channel being answered
        simulation_channel: u32,
        /// Device channel id now live
        device_channel: u32,
    },
    /// A live message matched a recorded pair
    MessageProcessed {
        simulation_channel: u32,
        request: PassThruMsg,
        responses: usize,
        sent: bool,
    },
    LoopError {
        kind: LoopErrorKind,
        message: String,
    },
    /// The replay loop exited
    ReaderStopped,
}
