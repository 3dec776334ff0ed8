//! Expressions file (`.ptExp`) - human readable dump of extracted calls
//!
//! Every expression is written as a framed block: the raw span lines
//! indented by three spaces, followed by the rendered field table. The raw
//! log can be recovered from that text and re-extracted.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::command::CommandType;
use crate::error::ExprResult;
use crate::expression::{Expression, NO_MESSAGES, NO_PARAMETERS};
use crate::extract::ExpressionExtractor;

/// Default extension for expressions files
pub const EXPRESSIONS_EXTENSION: &str = "ptExp";

const INDENT: &str = "   ";

fn separator() -> String {
    "=".repeat(100)
}

/// Render expressions as framed text blocks. NONE expressions are skipped.
pub fn render_expressions(expressions: &[Expression]) -> String {
    let rule = separator();
    let mut out = String::new();

    for expression in expressions
        .iter()
        .filter(|e| e.command_type() != CommandType::None)
    {
        out.push_str(&rule);
        out.push('\n');
        for line in expression.raw_text().lines() {
            if line.trim().is_empty() {
                continue;
            }
            out.push_str(INDENT);
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        for line in expression.render_table() {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str(&rule);
        out.push_str("\n\n");
    }
    out
}

/// Write an expressions file
pub fn save_expressions(path: impl AsRef<Path>, expressions: &[Expression]) -> ExprResult<()> {
    let path = path.as_ref();
    fs::write(path, render_expressions(expressions))?;
    info!(path = %path.display(), count = expressions.len(), "Saved expressions file");
    Ok(())
}

/// Recover the raw log lines embedded in an expressions file
pub fn recover_log_text(contents: &str) -> String {
    let rule = separator();
    contents
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            trimmed != rule
                && !trimmed.starts_with('|')
                && line.len() > INDENT.len()
                && !line.contains(NO_MESSAGES)
                && !line.contains(NO_PARAMETERS)
        })
        .map(|line| line.strip_prefix(INDENT).unwrap_or(line))
        .fold(String::new(), |mut out, line| {
            out.push_str(line);
            out.push('\n');
            out
        })
}

/// Re-extract the expressions stored in an expressions file
pub fn import_expressions(
    extractor: &ExpressionExtractor,
    path: impl AsRef<Path>,
) -> ExprResult<Vec<Expression>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let expressions = extractor.extract(&recover_log_text(&contents))?;
    info!(path = %path.display(), count = expressions.len(), "Imported expressions file");
    Ok(expressions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PatternRegistry;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const LOG: &str = r"1.107s ++ PTOpen(CarDAQ, 0x0015F8B0)
   returning DeviceID 1
1.112s   0:STATUS_NOERROR
2.570s ++ PTIoctl(1, 7:CLEAR_TX_BUFFER, NULL, NULL)
2.571s   0:STATUS_NOERROR
4.000s ++ PTWriteMsgs(1, 0x0015F050, 0x0015F8F8, 100)
  Msg[0] 6:ISO15765. 6 bytes. TxF=0x00000040
  \__ 00 00 07 e0 01 00
   sent 1 of 1 messages
4.010s   0:STATUS_NOERROR
";

    fn extractor() -> ExpressionExtractor {
        ExpressionExtractor::new(Arc::new(PatternRegistry::builtin().unwrap())).unwrap()
    }

    #[test]
    fn test_render_frames_each_block() {
        let expressions = extractor().extract(LOG).unwrap();
        let text = render_expressions(&expressions);
        let rules = text.lines().filter(|l| *l == separator()).count();
        assert_eq!(rules, expressions.len() * 2);
        assert!(text.contains("   1.107s ++ PTOpen(CarDAQ, 0x0015F8B0)"));
        assert!(text.contains("| Device ID"));
        assert!(text.contains(NO_PARAMETERS));
    }

    #[test]
    fn test_recovered_text_extracts_the_same_calls() {
        let extractor = extractor();
        let original = extractor.extract(LOG).unwrap();
        let recovered = recover_log_text(&render_expressions(&original));
        let again = extractor.extract(&recovered).unwrap();

        assert_eq!(again.len(), original.len());
        for (a, b) in original.iter().zip(&again) {
            assert_eq!(a.command_type(), b.command_type());
            assert_eq!(a.fields(), b.fields());
            assert_eq!(a.messages(), b.messages());
        }
    }

    #[test]
    fn test_save_and_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("session.{}", EXPRESSIONS_EXTENSION));
        let extractor = extractor();

        let expressions = extractor.extract(LOG).unwrap();
        save_expressions(&path, &expressions).unwrap();
        let imported = import_expressions(&extractor, &path).unwrap();
        assert_eq!(imported.len(), 3);
        assert_eq!(imported[2].messages()[0].data_bytes[3], 0xE0);
    }

    #[test]
    fn test_import_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = import_expressions(&extractor(), dir.path().join("missing.ptExp"));
        assert!(result.is_err());
    }
}
