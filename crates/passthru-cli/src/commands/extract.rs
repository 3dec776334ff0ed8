//! Extract command - shim log to expressions file

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use passthru_expr::{
    save_expressions, CommandType, Expression, ExpressionExtractor, PatternRegistry,
    ProgressUpdate, EXPRESSIONS_EXTENSION,
};

use crate::output::{CommandSummaryRow, OutputContext};

/// Extract a log and write its expressions file
pub fn extract(
    registry: Arc<PatternRegistry>,
    log_path: &Path,
    out: Option<&Path>,
    ctx: &OutputContext,
) -> Result<()> {
    let raw_log = std::fs::read_to_string(log_path)
        .with_context(|| format!("Failed to read log file: {}", log_path.display()))?;

    let expressions = extract_with_progress(registry, &raw_log, ctx)?;

    let out_path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| log_path.with_extension(EXPRESSIONS_EXTENSION));
    save_expressions(&out_path, &expressions)
        .with_context(|| format!("Failed to write expressions file: {}", out_path.display()))?;

    ctx.success(&format!(
        "Extracted {} expressions to {}",
        expressions.len(),
        out_path.display()
    ));
    ctx.print(&summary_rows(&expressions));
    Ok(())
}

/// Run the extractor with a progress bar on stderr
pub fn extract_with_progress(
    registry: Arc<PatternRegistry>,
    raw_log: &str,
    ctx: &OutputContext,
) -> Result<Vec<Expression>> {
    let pb = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} spans {msg}")
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );

    let observer = {
        let pb = pb.clone();
        move |update: ProgressUpdate| {
            pb.set_length(update.total as u64);
            pb.set_position(update.current as u64);
        }
    };
    let extractor = ExpressionExtractor::new(registry)
        .context("Failed to start extraction workers")?
        .with_observer(Arc::new(observer));

    let expressions = extractor.extract(raw_log).context("Extraction failed")?;
    pb.finish_and_clear();
    Ok(expressions)
}

/// Count expressions per command type
pub fn summary_rows(expressions: &[Expression]) -> Vec<CommandSummaryRow> {
    let mut counts: BTreeMap<CommandType, (usize, usize)> = BTreeMap::new();
    for expression in expressions {
        let entry = counts.entry(expression.command_type()).or_default();
        if expression.passed() {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    counts
        .into_iter()
        .map(|(command, (passed, failed))| CommandSummaryRow {
            command: command.to_string(),
            count: passed + failed,
            passed,
            failed,
        })
        .collect()
}
