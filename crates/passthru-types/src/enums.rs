//! Status codes, filter types, IOCTL ids and configuration parameters

use serde::{Deserialize, Serialize};

j2534_enum! {
    /// Return code of a PassThru call
    J2534Status, "status" {
        NoError = 0x00 => "STATUS_NOERROR",
        NotSupported = 0x01 => "ERR_NOT_SUPPORTED",
        InvalidChannelId = 0x02 => "ERR_INVALID_CHANNEL_ID",
        InvalidProtocolId = 0x03 => "ERR_INVALID_PROTOCOL_ID",
        NullParameter = 0x04 => "ERR_NULL_PARAMETER",
        InvalidIoctlValue = 0x05 => "ERR_INVALID_IOCTL_VALUE",
        InvalidFlags = 0x06 => "ERR_INVALID_FLAGS",
        Failed = 0x07 => "ERR_FAILED",
        DeviceNotConnected = 0x08 => "ERR_DEVICE_NOT_CONNECTED",
        Timeout = 0x09 => "ERR_TIMEOUT",
        InvalidMsg = 0x0A => "ERR_INVALID_MSG",
        InvalidTimeInterval = 0x0B => "ERR_INVALID_TIME_INTERVAL",
        ExceededLimit = 0x0C => "ERR_EXCEEDED_LIMIT",
        InvalidMsgId = 0x0D => "ERR_INVALID_MSG_ID",
        DeviceInUse = 0x0E => "ERR_DEVICE_IN_USE",
        InvalidIoctlId = 0x0F => "ERR_INVALID_IOCTL_ID",
        BufferEmpty = 0x10 => "ERR_BUFFER_EMPTY",
        BufferFull = 0x11 => "ERR_BUFFER_FULL",
        BufferOverflow = 0x12 => "ERR_BUFFER_OVERFLOW",
        PinInvalid = 0x13 => "ERR_PIN_INVALID",
        ChannelInUse = 0x14 => "ERR_CHANNEL_IN_USE",
        MsgProtocolId = 0x15 => "ERR_MSG_PROTOCOL_ID",
        InvalidFilterId = 0x16 => "ERR_INVALID_FILTER_ID",
        NoFlowControl = 0x17 => "ERR_NO_FLOW_CONTROL",
        NotUnique = 0x18 => "ERR_NOT_UNIQUE",
        InvalidBaudrate = 0x19 => "ERR_INVALID_BAUDRATE",
        InvalidDeviceId = 0x1A => "ERR_INVALID_DEVICE_ID",
    }
}

impl J2534Status {
    /// Log form of the status, e.g. `0:STATUS_NOERROR`
    pub fn log_form(self) -> String {
        format!("{}:{}", self.value(), self.name())
    }
}

j2534_enum! {
    /// Kind of message filter
    FilterType, "filter type" {
        Pass = 0x01 => "PASS_FILTER",
        Block = 0x02 => "BLOCK_FILTER",
        FlowControl = 0x03 => "FLOW_CONTROL_FILTER",
    }
}

j2534_enum! {
    /// IOCTL operation ids
    IoctlId, "ioctl" {
        GetConfig = 0x01 => "GET_CONFIG",
        SetConfig = 0x02 => "SET_CONFIG",
        ReadVbatt = 0x03 => "READ_VBATT",
        FiveBaudInit = 0x04 => "FIVE_BAUD_INIT",
        FastInit = 0x05 => "FAST_INIT",
        ClearTxBuffer = 0x07 => "CLEAR_TX_BUFFER",
        ClearRxBuffer = 0x08 => "CLEAR_RX_BUFFER",
        ClearPeriodicMsgs = 0x09 => "CLEAR_PERIODIC_MSGS",
        ClearMsgFilters = 0x0A => "CLEAR_MSG_FILTERS",
        ClearFunctMsgLookupTable = 0x0B => "CLEAR_FUNCT_MSG_LOOKUP_TABLE",
        AddToFunctMsgLookupTable = 0x0C => "ADD_TO_FUNCT_MSG_LOOKUP_TABLE",
        DeleteFromFunctMsgLookupTable = 0x0D => "DELETE_FROM_FUNCT_MSG_LOOKUP_TABLE",
        ReadProgVoltage = 0x0E => "READ_PROG_VOLTAGE",
    }
}

j2534_enum! {
    /// Channel configuration parameters for GET_CONFIG / SET_CONFIG
    ConfigParamId, "config parameter" {
        DataRate = 0x01 => "DATA_RATE",
        Loopback = 0x03 => "LOOPBACK",
        NodeAddress = 0x04 => "NODE_ADDRESS",
        NetworkLine = 0x05 => "NETWORK_LINE",
        P1Min = 0x06 => "P1_MIN",
        P1Max = 0x07 => "P1_MAX",
        P2Min = 0x08 => "P2_MIN",
        P2Max = 0x09 => "P2_MAX",
        P3Min = 0x0A => "P3_MIN",
        P3Max = 0x0B => "P3_MAX",
        P4Min = 0x0C => "P4_MIN",
        P4Max = 0x0D => "P4_MAX",
        W1 = 0x0E => "W1",
        W2 = 0x0F => "W2",
        W3 = 0x10 => "W3",
        W4 = 0x11 => "W4",
        W5 = 0x12 => "W5",
        Tidle = 0x13 => "TIDLE",
        Tinil = 0x14 => "TINIL",
        Twup = 0x15 => "TWUP",
        Parity = 0x16 => "PARITY",
        BitSamplePoint = 0x17 => "BIT_SAMPLE_POINT",
        SyncJumpWidth = 0x18 => "SYNC_JUMP_WIDTH",
        W0 = 0x19 => "W0",
        T1Max = 0x1A => "T1_MAX",
        T2Max = 0x1B => "T2_MAX",
        T4Max = 0x1C => "T4_MAX",
        T5Max = 0x1D => "T5_MAX",
        Iso15765Bs = 0x1E => "ISO15765_BS",
        Iso15765Stmin = 0x1F => "ISO15765_STMIN",
        DataBits = 0x20 => "DATA_BITS",
        FiveBaudMod = 0x21 => "FIVE_BAUD_MOD",
        BsTx = 0x22 => "BS_TX",
        StminTx = 0x23 => "STMIN_TX",
        T3Max = 0x24 => "T3_MAX",
        Iso15765WftMax = 0x25 => "ISO15765_WFT_MAX",
        NBrMin = 0x2A => "N_BR_MIN",
        Iso15765PadValue = 0x2B => "ISO15765_PAD_VALUE",
        NAsMax = 0x2C => "N_AS_MAX",
        NArMax = 0x2D => "N_AR_MAX",
        NBsMax = 0x2E => "N_BS_MAX",
        NCrMax = 0x2F => "N_CR_MAX",
        NCsMin = 0x30 => "N_CS_MIN",
        CanMixedFormat = 0x8000 => "CAN_MIXED_FORMAT",
        J1962Pins = 0x8001 => "J1962_PINS",
        SwCanHsDataRate = 0x8010 => "SW_CAN_HS_DATA_RATE",
        SwCanSpeedchangeEnable = 0x8011 => "SW_CAN_SPEEDCHANGE_ENABLE",
        SwCanResSwitch = 0x8012 => "SW_CAN_RES_SWITCH",
    }
}

/// One SET_CONFIG entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigParam {
    pub id: ConfigParamId,
    pub value: u32,
}

impl ConfigParam {
    pub fn new(id: ConfigParamId, value: u32) -> Self {
        Self { id, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_log_form() {
        assert_eq!(J2534Status::NoError.log_form(), "0:STATUS_NOERROR");
        assert_eq!(
            "16:ERR_BUFFER_EMPTY".parse::<J2534Status>().unwrap(),
            J2534Status::BufferEmpty
        );
    }

    #[test]
    fn test_filter_type_from_log() {
        assert_eq!(
            "3:FLOW_CONTROL_FILTER".parse::<FilterType>().unwrap(),
            FilterType::FlowControl
        );
        assert_eq!("1".parse::<FilterType>().unwrap(), FilterType::Pass);
    }

    #[test]
    fn test_config_param_serde() {
        let param = ConfigParam::new(ConfigParamId::Iso15765Stmin, 0);
        let json = serde_json::to_string(&param).unwrap();
        assert_eq!(json, r#"{"id":"ISO15765_STMIN","value":0}"#);
        let back: ConfigParam = serde_json::from_str(&json).unwrap();
        assert_eq!(back, param);
    }
}
