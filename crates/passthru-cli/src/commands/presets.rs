//! Presets command - list built-in playback presets

use anyhow::{Context, Result};

use passthru_sim::PresetTable;

use crate::output::{OutputContext, PresetRow};

/// List the bundled presets
pub fn presets(ctx: &OutputContext) -> Result<()> {
    let table = PresetTable::builtin().context("Failed to load bundled presets")?;

    let rows: Vec<PresetRow> = table
        .iter()
        .map(|preset| PresetRow {
            name: preset.name.clone(),
            protocol: preset.protocol.to_string(),
            baud_rate: preset.baud_rate.to_string(),
            filters: preset.filters.len(),
            configs: preset.configs.len(),
            description: preset.description.clone().unwrap_or_default(),
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}
