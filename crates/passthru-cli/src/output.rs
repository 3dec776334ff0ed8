//! Output formatting for ptsim (table, json)

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        }
    }

    /// Parse a config file value, falling back to table
    pub fn from_config(value: &str) -> Self {
        <Self as ValueEnum>::from_str(value, true).unwrap_or_default()
    }
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    let table = Table::new(data).to_string();
                    println!("{}", table);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// Per-command totals for extract and import
#[derive(Debug, Tabled, Serialize)]
pub struct CommandSummaryRow {
    #[tabled(rename = "Command")]
    pub command: String,
    #[tabled(rename = "Count")]
    pub count: usize,
    #[tabled(rename = "Passed")]
    pub passed: usize,
    #[tabled(rename = "Failed")]
    pub failed: usize,
}

/// Channel display for build command
#[derive(Debug, Tabled, Serialize)]
pub struct ChannelRow {
    #[tabled(rename = "Channel")]
    pub channel: u32,
    #[tabled(rename = "Protocol")]
    pub protocol: String,
    #[tabled(rename = "Baud Rate")]
    pub baud_rate: String,
    #[tabled(rename = "Filters")]
    pub filters: usize,
    #[tabled(rename = "Pairs")]
    pub pairs: usize,
    #[tabled(rename = "Responses")]
    pub responses: usize,
}

/// One replayed pair for selftest
#[derive(Debug, Tabled, Serialize)]
pub struct SelftestRow {
    #[tabled(rename = "Channel")]
    pub channel: u32,
    #[tabled(rename = "Pair")]
    pub pair: usize,
    #[tabled(rename = "Request")]
    pub request: String,
    #[tabled(rename = "Responses")]
    pub responses: usize,
    #[tabled(rename = "Result")]
    pub result: String,
}

/// Preset display for presets command
#[derive(Debug, Tabled, Serialize)]
pub struct PresetRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Protocol")]
    pub protocol: String,
    #[tabled(rename = "Baud Rate")]
    pub baud_rate: String,
    #[tabled(rename = "Filters")]
    pub filters: usize,
    #[tabled(rename = "Configs")]
    pub configs: usize,
    #[tabled(rename = "Description")]
    pub description: String,
}
