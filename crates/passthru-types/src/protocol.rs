//! Protocol ids and baud rates

j2534_enum! {
    /// Protocol a channel is connected with
    ProtocolId, "protocol" {
        J1850Vpw = 0x01 => "J1850VPW",
        J1850Pwm = 0x02 => "J1850PWM",
        Iso9141 = 0x03 => "ISO9141",
        Iso14230 = 0x04 => "ISO14230",
        Can = 0x05 => "CAN",
        Iso15765 = 0x06 => "ISO15765",
        SciAEngine = 0x07 => "SCI_A_ENGINE",
        SciATrans = 0x08 => "SCI_A_TRANS",
        SciBEngine = 0x09 => "SCI_B_ENGINE",
        SciBTrans = 0x0A => "SCI_B_TRANS",
        J1850VpwPs = 0x8000 => "J1850VPW_PS",
        J1850PwmPs = 0x8001 => "J1850PWM_PS",
        Iso9141Ps = 0x8002 => "ISO9141_PS",
        Iso14230Ps = 0x8003 => "ISO14230_PS",
        CanPs = 0x8004 => "CAN_PS",
        Iso15765Ps = 0x8005 => "ISO15765_PS",
        J2610Ps = 0x8006 => "J2610_PS",
        SwIso15765Ps = 0x8007 => "SW_ISO15765_PS",
        SwCanPs = 0x8008 => "SW_CAN_PS",
        GmUartPs = 0x8009 => "GM_UART_PS",
    }
}

impl ProtocolId {
    /// Name of the baud rate family this protocol uses.
    ///
    /// The longest `_` separated part of the protocol name, so
    /// `SW_ISO15765_PS` maps to `ISO15765`.
    pub fn baud_family(self) -> &'static str {
        self.name()
            .split('_')
            .fold("", |best, part| if part.len() > best.len() { part } else { best })
    }

    /// ISO15765 and its pin-switched variants
    pub fn is_iso15765(self) -> bool {
        self.baud_family() == "ISO15765"
    }
}

j2534_enum! {
    /// Named baud rates, grouped by protocol family
    #[allow(non_camel_case_types)]
    BaudRate, "baud rate" {
        Iso9141_10400 = 10400 => "ISO9141_10400",
        Iso9141_10000 = 10000 => "ISO9141_10000",
        Iso14230_10400 = 10400 => "ISO14230_10400",
        Iso14230_10000 = 10000 => "ISO14230_10000",
        J1850Pwm_41600 = 41600 => "J1850PWM_41600",
        J1850Pwm_83300 = 83300 => "J1850PWM_83300",
        J1850Vpw_10400 = 10400 => "J1850VPW_10400",
        J1850Vpw_41600 = 41600 => "J1850VPW_41600",
        Can_125000 = 125000 => "CAN_125000",
        Can_250000 = 250000 => "CAN_250000",
        Can_500000 = 500000 => "CAN_500000",
        Iso15765_125000 = 125000 => "ISO15765_125000",
        Iso15765_250000 = 250000 => "ISO15765_250000",
        Iso15765_500000 = 500000 => "ISO15765_500000",
    }
}

impl BaudRate {
    /// Bits per second
    pub fn bits_per_second(self) -> u32 {
        self.value()
    }

    /// Resolve `<family>_<bps>` for a protocol, e.g. `ISO15765_500000`
    pub fn for_protocol(protocol: ProtocolId, bits_per_second: u32) -> Option<Self> {
        let name = format!("{}_{}", protocol.baud_family(), bits_per_second);
        Self::from_name(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("6:ISO15765", ProtocolId::Iso15765)]
    #[case("ISO15765", ProtocolId::Iso15765)]
    #[case("5", ProtocolId::Can)]
    #[case("0x8004", ProtocolId::CanPs)]
    #[case("32775:SW_ISO15765_PS", ProtocolId::SwIso15765Ps)]
    fn test_protocol_from_log_token(#[case] token: &str, #[case] expected: ProtocolId) {
        assert_eq!(token.parse::<ProtocolId>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_protocol() {
        assert!("FLEXRAY".parse::<ProtocolId>().is_err());
    }

    #[test]
    fn test_baud_family() {
        assert_eq!(ProtocolId::Iso15765.baud_family(), "ISO15765");
        assert_eq!(ProtocolId::SwIso15765Ps.baud_family(), "ISO15765");
        assert_eq!(ProtocolId::CanPs.baud_family(), "CAN");
        assert!(ProtocolId::Iso15765Ps.is_iso15765());
        assert!(!ProtocolId::Can.is_iso15765());
    }

    #[test]
    fn test_baud_for_protocol() {
        assert_eq!(
            BaudRate::for_protocol(ProtocolId::Iso15765, 500000),
            Some(BaudRate::Iso15765_500000)
        );
        assert_eq!(
            BaudRate::for_protocol(ProtocolId::CanPs, 250000),
            Some(BaudRate::Can_250000)
        );
        assert_eq!(BaudRate::for_protocol(ProtocolId::Can, 33333), None);
        assert_eq!(BaudRate::Iso15765_500000.bits_per_second(), 500000);
    }

    #[test]
    fn test_serde_by_name_or_value() {
        let json = serde_json::to_string(&ProtocolId::Iso15765).unwrap();
        assert_eq!(json, "\"ISO15765\"");
        let by_value: ProtocolId = serde_json::from_str("6").unwrap();
        assert_eq!(by_value, ProtocolId::Iso15765);
        let baud: BaudRate = serde_json::from_str("\"CAN_500000\"").unwrap();
        assert_eq!(baud, BaudRate::Can_500000);
    }
}
