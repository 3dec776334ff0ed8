//! Expression fields and the expectations they are checked against

/// What a healthy value looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Informational, always passes
    Any,
    NonEmpty,
    Equals(&'static str),
    NotEquals(&'static str),
}

impl Expectation {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Expectation::Any => true,
            Expectation::NonEmpty => !value.trim().is_empty(),
            Expectation::Equals(expected) => value == *expected,
            Expectation::NotEquals(rejected) => value != *rejected,
        }
    }
}

/// Compile-time declaration of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub expectation: Expectation,
    /// Status labels for a passing and a failing value
    pub labels: (&'static str, &'static str),
}

impl FieldSpec {
    pub const fn plain(name: &'static str) -> Self {
        Self {
            name,
            expectation: Expectation::Any,
            labels: ("N/A", "N/A"),
        }
    }

    pub const fn checked(
        name: &'static str,
        expectation: Expectation,
        passed: &'static str,
        failed: &'static str,
    ) -> Self {
        Self {
            name,
            expectation,
            labels: (passed, failed),
        }
    }
}

/// A field bound to the value extracted for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    spec: &'static FieldSpec,
    value: String,
}

impl Field {
    pub fn new(spec: &'static FieldSpec, value: impl Into<String>) -> Self {
        Self {
            spec,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn spec(&self) -> &'static FieldSpec {
        self.spec
    }

    pub fn passed(&self) -> bool {
        self.spec.expectation.accepts(&self.value)
    }

    /// Label for the value status column
    pub fn status_label(&self) -> &'static str {
        if self.passed() {
            self.spec.labels.0
        } else {
            self.spec.labels.1
        }
    }

    /// Field name compare ignoring case and whitespace
    pub fn is_named(&self, name: &str) -> bool {
        normalize_name(self.spec.name) == normalize_name(name)
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

// ============================================================================
// Field declarations
// ============================================================================

pub const TIME_ISSUED: FieldSpec = FieldSpec::checked(
    "Time Issued",
    Expectation::NonEmpty,
    "Timestamp Valid",
    "Invalid Timestamp",
);
pub const J2534_STATUS: FieldSpec = FieldSpec::checked(
    "J2534 Status",
    Expectation::Equals("0:STATUS_NOERROR"),
    "Command Passed",
    "Command Failed",
);

const COMMAND_LINE: FieldSpec = FieldSpec::plain("Command Line");

pub static NONE_FIELDS: [FieldSpec; 2] = [TIME_ISSUED, J2534_STATUS];

pub static OPEN_FIELDS: [FieldSpec; 6] = [
    TIME_ISSUED,
    J2534_STATUS,
    COMMAND_LINE,
    FieldSpec::plain("Device Name"),
    FieldSpec::plain("Device Pointer"),
    FieldSpec::checked(
        "Device ID",
        Expectation::NotEquals("-1"),
        "Device Opened",
        "Invalid Device ID!",
    ),
];

pub static CLOSE_FIELDS: [FieldSpec; 4] = [
    TIME_ISSUED,
    J2534_STATUS,
    COMMAND_LINE,
    FieldSpec::checked(
        "Device ID",
        Expectation::NotEquals("-1"),
        "Device Closed",
        "Device Invalid!",
    ),
];

pub static CONNECT_FIELDS: [FieldSpec; 9] = [
    TIME_ISSUED,
    J2534_STATUS,
    COMMAND_LINE,
    FieldSpec::plain("Device ID"),
    FieldSpec::plain("Protocol ID"),
    FieldSpec::plain("Connect Flags"),
    FieldSpec::plain("BaudRate"),
    FieldSpec::plain("Channel Pointer"),
    FieldSpec::checked(
        "Channel ID",
        Expectation::NotEquals("-1"),
        "Channel Opened",
        "Invalid Channel!",
    ),
];

pub static DISCONNECT_FIELDS: [FieldSpec; 4] = [
    TIME_ISSUED,
    J2534_STATUS,
    COMMAND_LINE,
    FieldSpec::checked(
        "Channel ID",
        Expectation::NotEquals("-1"),
        "Channel Closed",
        "Invalid Channel!",
    ),
];

pub static READ_MESSAGES_FIELDS: [FieldSpec; 9] = [
    TIME_ISSUED,
    J2534_STATUS,
    COMMAND_LINE,
    FieldSpec::plain("Channel ID"),
    FieldSpec::plain("Message Pointer"),
    FieldSpec::plain("Count Pointer"),
    FieldSpec::plain("Timeout"),
    FieldSpec::plain("Read Count"),
    FieldSpec::plain("Expected Count"),
];

pub static WRITE_MESSAGES_FIELDS: [FieldSpec; 9] = [
    TIME_ISSUED,
    J2534_STATUS,
    COMMAND_LINE,
    FieldSpec::plain("Channel ID"),
    FieldSpec::plain("Message Pointer"),
    FieldSpec::plain("Count Pointer"),
    FieldSpec::plain("Timeout"),
    FieldSpec::plain("Sent Count"),
    FieldSpec::plain("Expected Count"),
];

pub static START_FILTER_FIELDS: [FieldSpec; 10] = [
    TIME_ISSUED,
    J2534_STATUS,
    COMMAND_LINE,
    FieldSpec::plain("Channel ID"),
    FieldSpec::plain("Filter Type"),
    FieldSpec::plain("Mask Pointer"),
    FieldSpec::plain("Pattern Pointer"),
    FieldSpec::plain("Flow Control Pointer"),
    FieldSpec::plain("Filter Pointer (Struct)"),
    FieldSpec::checked(
        "Filter ID",
        Expectation::NotEquals("-1"),
        "Filter Started",
        "Invalid Filter!",
    ),
];

pub static STOP_FILTER_FIELDS: [FieldSpec; 5] = [
    TIME_ISSUED,
    J2534_STATUS,
    COMMAND_LINE,
    FieldSpec::plain("Channel ID"),
    FieldSpec::plain("Filter ID"),
];

pub static IOCTL_FIELDS: [FieldSpec; 8] = [
    TIME_ISSUED,
    J2534_STATUS,
    COMMAND_LINE,
    FieldSpec::plain("Channel ID"),
    FieldSpec::plain("IOCTL Type"),
    FieldSpec::plain("IOCTL Input"),
    FieldSpec::plain("IOCTL Output"),
    FieldSpec::plain("Parameter Count"),
];
