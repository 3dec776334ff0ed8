//! Import command - re-read an expressions file

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use passthru_expr::file::recover_log_text;
use passthru_expr::PatternRegistry;

use super::extract::{extract_with_progress, summary_rows};
use crate::output::OutputContext;

/// Re-extract the calls stored in an expressions file
pub fn import(registry: Arc<PatternRegistry>, path: &Path, ctx: &OutputContext) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read expressions file: {}", path.display()))?;

    let expressions = extract_with_progress(registry, &recover_log_text(&contents), ctx)?;
    if expressions.is_empty() {
        ctx.warn(&format!("No expressions found in {}", path.display()));
    } else {
        ctx.success(&format!(
            "Imported {} expressions from {}",
            expressions.len(),
            path.display()
        ));
    }
    ctx.print(&summary_rows(&expressions));
    Ok(())
}
