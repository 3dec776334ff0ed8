//! Playback configuration
//!
//! Reader timing, the default reader connection and the filters and IOCTL
//! configs applied to it. Loaded from TOML or taken from a built-in preset.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use passthru_types::{BaudRate, ConfigParam, MessageFilter, ProtocolId};

use crate::error::{SimError, SimResult};

/// Bundled preset table
pub const DEFAULT_PRESETS: &str = include_str!("../presets/default.toml");

// =============================================================================
// Playback Configuration
// =============================================================================

/// Settings for the playback engine's reader and responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Timeout for each read of the reader channel
    #[serde(default = "default_reader_timeout_ms")]
    pub reader_timeout_ms: u64,
    /// Messages requested per read
    #[serde(default = "default_reader_message_count")]
    pub reader_message_count: usize,
    /// Timeout for each response write
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Write attempts before a response is given up
    #[serde(default = "default_response_attempts")]
    pub response_attempts: u32,
    /// Reader connection, ISO15765 at 500k when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader: Option<ReaderDefaults>,
    /// Filters started on the reader channel
    #[serde(default)]
    pub filters: Vec<MessageFilter>,
    /// SET_CONFIG parameters applied to the reader channel
    #[serde(default)]
    pub configs: Vec<ConfigParam>,
}

fn default_reader_timeout_ms() -> u64 {
    100
}

fn default_reader_message_count() -> usize {
    10
}

fn default_response_timeout_ms() -> u64 {
    500
}

fn default_response_attempts() -> u32 {
    5
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            reader_timeout_ms: default_reader_timeout_ms(),
            reader_message_count: default_reader_message_count(),
            response_timeout_ms: default_response_timeout_ms(),
            response_attempts: default_response_attempts(),
            reader: None,
            filters: Vec::new(),
            configs: Vec::new(),
        }
    }
}

impl PlaybackConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn from_toml_str(toml: &str) -> SimResult<Self> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.reader_message_count == 0 {
            return Err(SimError::InvalidConfig(
                "reader_message_count must be at least 1".to_string(),
            ));
        }
        if self.response_attempts == 0 {
            return Err(SimError::InvalidConfig(
                "response_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reader_timeout(&self) -> Duration {
        Duration::from_millis(self.reader_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Connection used for the reader channel
    pub fn connection(&self) -> ReaderDefaults {
        self.reader.clone().unwrap_or_default()
    }
}

/// Protocol, flags and baud rate of the reader channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderDefaults {
    pub protocol: ProtocolId,
    #[serde(default)]
    pub connect_flags: u32,
    pub baud_rate: BaudRate,
}

impl Default for ReaderDefaults {
    fn default() -> Self {
        Self {
            protocol: ProtocolId::Iso15765,
            connect_flags: 0,
            baud_rate: BaudRate::Iso15765_500000,
        }
    }
}

// =============================================================================
// Presets
// =============================================================================

/// Named reader setup for a protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationPreset {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub protocol: ProtocolId,
    #[serde(default)]
    pub connect_flags: u32,
    pub baud_rate: BaudRate,
    #[serde(default = "default_reader_timeout_ms")]
    pub reader_timeout_ms: u64,
    #[serde(default = "default_reader_message_count")]
    pub reader_message_count: usize,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    #[serde(default = "default_response_attempts")]
    pub response_attempts: u32,
    #[serde(default)]
    pub filters: Vec<MessageFilter>,
    #[serde(default)]
    pub configs: Vec<ConfigParam>,
}

impl SimulationPreset {
    pub fn to_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            reader_timeout_ms: self.reader_timeout_ms,
            reader_message_count: self.reader_message_count,
            response_timeout_ms: self.response_timeout_ms,
            response_attempts: self.response_attempts,
            reader: Some(ReaderDefaults {
                protocol: self.protocol,
                connect_flags: self.connect_flags,
                baud_rate: self.baud_rate,
            }),
            filters: self.filters.clone(),
            configs: self.configs.clone(),
        }
    }
}

/// A set of presets, usually the bundled one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetTable {
    #[serde(default, rename = "preset")]
    presets: Vec<SimulationPreset>,
}

impl PresetTable {
    pub fn builtin() -> SimResult<Self> {
        Self::from_toml_str(DEFAULT_PRESETS)
    }

    pub fn from_toml_str(toml: &str) -> SimResult<Self> {
        Ok(toml::from_str(toml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Case-insensitive lookup by name
    pub fn by_name(&self, name: &str) -> Option<&SimulationPreset> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    /// First preset for a protocol
    pub fn by_protocol(&self, protocol: ProtocolId) -> Option<&SimulationPreset> {
        self.presets.iter().find(|p| p.protocol == protocol)
    }

    /// Resolve a name, falling back to a protocol name
    pub fn resolve(&self, name: &str) -> SimResult<&SimulationPreset> {
        self.by_name(name)
            .or_else(|| {
                name.parse::<ProtocolId>()
                    .ok()
                    .and_then(|protocol| self.by_protocol(protocol))
            })
            .ok_or_else(|| SimError::UnknownPreset(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimulationPreset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}
