//! Bit flags carried by connect calls and messages

/// Flags for `PassThruConnect`
pub mod connect_flags {
    pub const NO_CONNECT_FLAGS: u32 = 0x0000;
    pub const CAN_29BIT_ID: u32 = 0x0100;
    pub const ISO9141_NO_CHECKSUM: u32 = 0x0200;
    pub const CAN_ID_BOTH: u32 = 0x0800;
    pub const ISO9141_K_LINE_ONLY: u32 = 0x1000;
}

/// Receive status bits of an inbound message
pub mod rx_status {
    pub const NO_RX_STATUS: u32 = 0x0000;
    pub const TX_MSG_TYPE: u32 = 0x0001;
    pub const START_OF_MESSAGE: u32 = 0x0002;
    pub const RX_BREAK: u32 = 0x0004;
    pub const TX_DONE: u32 = 0x0008;
    pub const ISO15765_PADDING_ERROR: u32 = 0x0010;
    pub const ISO15765_ADDR_TYPE: u32 = 0x0080;
    pub const CAN_29BIT_ID: u32 = 0x0100;
}

/// Transmit flags of an outbound message
pub mod tx_flags {
    pub const NO_TX_FLAGS: u32 = 0x0000;
    pub const ISO15765_FRAME_PAD: u32 = 0x0040;
    pub const ISO15765_ADDR_TYPE: u32 = 0x0080;
    pub const CAN_29BIT_ID: u32 = 0x0100;
    pub const WAIT_P3_MIN_ONLY: u32 = 0x0200;
}
