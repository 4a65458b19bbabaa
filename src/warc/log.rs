//! Sink for recoverable parse problems

use std::sync::Mutex;

/// Receives parse problems the parser recovered from.
///
/// When a parser runs without a sink, the first such problem is fatal instead.
pub trait ParseLog: Send + Sync {
    /// Input was skipped while looking for the next record
    fn chunk_skipped(&self, chunk: &str);

    /// A record was dropped because it could not be parsed
    fn error_encountered(&self, message: &str);
}

/// Forwards parse problems to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingParseLog;

impl ParseLog for TracingParseLog {
    fn chunk_skipped(&self, chunk: &str) {
        tracing::warn!("Skipped chunk: {}", truncate(chunk, 200));
    }

    fn error_encountered(&self, message: &str) {
        tracing::warn!("Dropped record: {}", message);
    }
}

/// Keeps every reported problem in memory
#[derive(Debug, Default)]
pub struct RecordingParseLog {
    skipped: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingParseLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipped(&self) -> Vec<String> {
        self.skipped.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ParseLog for RecordingParseLog {
    fn chunk_skipped(&self, chunk: &str) {
        self.skipped
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(chunk.to_string());
    }

    fn error_encountered(&self, message: &str) {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
