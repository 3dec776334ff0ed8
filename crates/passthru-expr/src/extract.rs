//! Expression extractor - splits a log into spans and interprets each one
//!
//! Spans are processed on a small dedicated worker pool. Results are
//! collected through an indexed parallel iterator, so every span's result
//! lands in the slot matching its position and output order equals log order
//! without any locking.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, warn};

use crate::command::CommandType;
use crate::error::ExprResult;
use crate::expression::Expression;
use crate::registry::PatternRegistry;

/// Default worker count
pub const DEFAULT_WORKERS: usize = 3;

/// Administrative spans that never become expressions
const SKIP_MARKERS: [&str; 2] = ["BUFFER_EMPTY", "PTReadMsgs() complete"];

/// Extraction progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub current: usize,
    pub total: usize,
    pub percent: u8,
}

impl ProgressUpdate {
    fn new(current: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((current * 100) / total) as u8
        };
        Self {
            current,
            total,
            percent,
        }
    }
}

/// Receives progress while spans are processed
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: ProgressUpdate);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// One span of the raw log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSpan<'a> {
    pub index: usize,
    /// Byte offset into the log
    pub start: usize,
    pub text: &'a str,
}

impl LogSpan<'_> {
    /// Blank or administrative spans produce no expression
    pub fn is_skipped(&self) -> bool {
        self.text.trim().is_empty() || SKIP_MARKERS.iter().any(|m| self.text.contains(m))
    }
}

/// Turns raw shim log text into expressions
pub struct ExpressionExtractor {
    registry: Arc<PatternRegistry>,
    pool: ThreadPool,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ExpressionExtractor {
    pub fn new(registry: Arc<PatternRegistry>) -> ExprResult<Self> {
        Self::with_workers(registry, DEFAULT_WORKERS)
    }

    pub fn with_workers(registry: Arc<PatternRegistry>, workers: usize) -> ExprResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("ptsim-extract-{}", i))
            .build()?;
        Ok(Self {
            registry,
            pool,
            observer: None,
        })
    }

    /// Report progress to `observer` on every finished span
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Split a log at every command time match.
    ///
    /// Each span runs to the next match; the last one runs to the end of the
    /// text. Text before the first match belongs to no span.
    pub fn split_spans<'a>(&self, raw_log: &'a str) -> ExprResult<Vec<LogSpan<'a>>> {
        let starts = self
            .registry
            .require(CommandType::CommandTime)?
            .match_starts(raw_log);

        Ok(starts
            .iter()
            .enumerate()
            .map(|(index, &start)| {
                let end = starts.get(index + 1).copied().unwrap_or(raw_log.len());
                LogSpan {
                    index,
                    start,
                    text: &raw_log[start..end],
                }
            })
            .collect())
    }

    /// Extract every command expression from a log, in log order.
    ///
    /// Spans that fail to bind are logged and dropped; NONE expressions are
    /// never returned.
    pub fn extract(&self, raw_log: &str) -> ExprResult<Vec<Expression>> {
        let spans = self.split_spans(raw_log)?;
        let total = spans.len();
        let finished = AtomicUsize::new(0);
        info!(spans = total, "Extracting expressions");

        let slots: Vec<Option<Expression>> = self.pool.install(|| {
            spans
                .par_iter()
                .map(|span| {
                    let result = self.extract_span(span);
                    let current = finished.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(observer) = &self.observer {
                        observer.on_progress(ProgressUpdate::new(current, total));
                    }
                    result
                })
                .collect()
        });

        let expressions: Vec<Expression> = slots
            .into_iter()
            .flatten()
            .filter(|e| e.command_type() != CommandType::None)
            .collect();
        info!(
            spans = total,
            expressions = expressions.len(),
            "Extraction complete"
        );
        Ok(expressions)
    }

    fn extract_span(&self, span: &LogSpan<'_>) -> Option<Expression> {
        if span.is_skipped() {
            debug!(span = span.index, "Skipping administrative span");
            return None;
        }
        match Expression::parse(&self.registry, span.index, span.text) {
            Ok(expression) => Some(expression),
            Err(e) => {
                warn!(span = span.index, offset = span.start, error = %e, "Dropping log span");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Records every progress update
    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressUpdate>>);

    impl ProgressObserver for Recorder {
        fn on_progress(&self, update: ProgressUpdate) {
            self.0.lock().unwrap().push(update);
        }
    }

    const LOG: &str = "0.000s ** shim log opened
1.107s ++ PTOpen(CarDAQ, 0x0015F8B0)
   returning DeviceID 1
1.112s   0:STATUS_NOERROR
2.558s ++ PTConnect(1, 6:ISO15765, 0x00000000, 500000, 0x0015F8F4)
   returning ChannelID: 1
2.563s   0:STATUS_NOERROR
4.200s ++ PTReadMsgs(1, 0x00153C48, 0x0015F8F8, 100)
   read 0 of 1 messages
4.300s   16:ERR_BUFFER_EMPTY
6.000s ++ PTDisconnect(1)
6.005s   0:STATUS_NOERROR
6.100s ++ PTClose(1)
6.105s   0:STATUS_NOERROR
";

    fn extractor() -> ExpressionExtractor {
        ExpressionExtractor::new(Arc::new(PatternRegistry::builtin().unwrap())).unwrap()
    }

    #[test]
    fn test_spans_cover_the_log() {
        let extractor = extractor();
        let spans = extractor.split_spans(LOG).unwrap();
        assert_eq!(spans.len(), 6);
        let joined: String = spans.iter().map(|s| s.text).collect();
        assert_eq!(joined, LOG);
    }

    #[test]
    fn test_preamble_is_not_a_span() {
        let log = format!("header text\n{}", LOG);
        let spans = extractor().split_spans(&log).unwrap();
        assert_eq!(spans.len(), 6);
        assert_eq!(spans[0].start, "header text\n".len());
    }

    #[test]
    fn test_extract_skips_and_prunes() {
        let expressions = extractor().extract(LOG).unwrap();
        let types: Vec<CommandType> = expressions.iter().map(|e| e.command_type()).collect();
        assert_eq!(
            types,
            vec![
                CommandType::Open,
                CommandType::Connect,
                CommandType::Disconnect,
                CommandType::Close
            ]
        );
    }

    #[test]
    fn test_order_preserved_across_workers() {
        let mut log = String::new();
        for i in 0..200 {
            log.push_str(&format!("{}.000s ++ PTDisconnect({})\n{}.001s   0:STATUS_NOERROR\n", i, i + 1, i));
        }
        let expressions = extractor().extract(&log).unwrap();
        assert_eq!(expressions.len(), 200);
        assert!(expressions.windows(2).all(|w| w[0].span_index() < w[1].span_index()));
        assert_eq!(expressions[199].channel_id(), Some(200));
    }

    #[test]
    fn test_bad_span_is_dropped() {
        let log = "1.0s ++ PTConnect(broken)\n2.0s ++ PTClose(1)\n2.1s   0:STATUS_NOERROR\n";
        let expressions = extractor().extract(log).unwrap();
        assert_eq!(expressions.len(), 1);
        assert_eq!(expressions[0].command_type(), CommandType::Close);
        assert_eq!(expressions[0].span_index(), 1);
    }

    #[test]
    fn test_progress_reaches_total() {
        let recorder = Arc::new(Recorder::default());
        let extractor = extractor().with_observer(recorder.clone());
        extractor.extract(LOG).unwrap();

        let updates = recorder.0.lock().unwrap();
        assert_eq!(updates.len(), 6);
        assert!(updates.iter().all(|u| u.total == 6));
        assert!(updates.iter().any(|u| u.current == 6 && u.percent == 100));
    }
}
