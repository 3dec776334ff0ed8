//! Build command - logs or expressions files to a simulation file

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use passthru_expr::file::recover_log_text;
use passthru_expr::{PatternRegistry, EXPRESSIONS_EXTENSION};
use passthru_sim::simulation::{save_simulation, SIMULATION_EXTENSION};
use passthru_sim::{ChannelAssembler, SimulationChannel};

use super::extract::extract_with_progress;
use crate::output::{ChannelRow, OutputContext};

/// Assemble every input into one simulation file
pub fn build(
    registry: Arc<PatternRegistry>,
    inputs: &[PathBuf],
    out: Option<&Path>,
    ctx: &OutputContext,
) -> Result<()> {
    let first = inputs.first().context("No input files given")?;
    let assembler = ChannelAssembler::new();
    let mut channels: BTreeMap<u32, SimulationChannel> = BTreeMap::new();

    for input in inputs {
        let contents = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read input file: {}", input.display()))?;
        let raw_log = if is_expressions_file(input) {
            recover_log_text(&contents)
        } else {
            contents
        };

        let expressions = extract_with_progress(registry.clone(), &raw_log, ctx)?;
        channels = assembler
            .assemble_into(channels, &expressions)
            .with_context(|| format!("Failed to assemble channels from {}", input.display()))?;
        ctx.info(&format!(
            "{}: {} expressions",
            input.display(),
            expressions.len()
        ));
    }

    if channels.is_empty() {
        ctx.warn("No replayable channels found");
    }

    let out_path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| first.with_extension(SIMULATION_EXTENSION));
    save_simulation(&out_path, &channels)
        .with_context(|| format!("Failed to write simulation file: {}", out_path.display()))?;

    ctx.success(&format!(
        "Wrote {} channels to {}",
        channels.len(),
        out_path.display()
    ));
    ctx.print(&channel_rows(&channels));
    Ok(())
}

fn is_expressions_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXPRESSIONS_EXTENSION))
}

fn channel_rows(channels: &BTreeMap<u32, SimulationChannel>) -> Vec<ChannelRow> {
    channels
        .values()
        .map(|channel| ChannelRow {
            channel: channel.channel_id,
            protocol: channel.protocol.to_string(),
            baud_rate: channel.baud_rate.to_string(),
            filters: channel.filters.len(),
            pairs: channel.message_pairs.len(),
            responses: channel.response_count(),
        })
        .collect()
}
