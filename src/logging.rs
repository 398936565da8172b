//! Injectable logging collaborator.
//!
//! Every component that reports something (a substituted color, a skipped icon,
//! a rejected batch payload) takes a `&dyn Logger` instead of writing to a
//! process-wide sink. Production code passes [`TracingLogger`], which forwards
//! to `tracing`; tests pass [`MemoryLogger`] and assert on the captured records.

use std::fmt;
use std::sync::Mutex;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        };
        f.write_str(name)
    }
}

/// Sink for log records.
///
/// `Sync` so a single logger can be shared across rayon workers when a batch
/// runs in parallel.
pub trait Logger: Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Forwards records to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "qrsmith", "{message}"),
            Level::Info => tracing::info!(target: "qrsmith", "{message}"),
            Level::Warn => tracing::warn!(target: "qrsmith", "{message}"),
            Level::Error => tracing::error!(target: "qrsmith", "{message}"),
        }
    }
}

/// A captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
}

/// Logger that keeps every record in memory.
///
/// Uses `Mutex` (not `RefCell`) so it satisfies the `Sync` bound.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records captured so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Records at exactly `level`.
    pub fn at(&self, level: Level) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .collect()
    }

    /// True if any record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.at(level).iter().any(|r| r.message.contains(needle))
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord {
                level,
                message: message.to_string(),
            });
        }
    }
}
