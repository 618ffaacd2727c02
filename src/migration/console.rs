//! Log Console Model
//!
//! Append-only, ordered buffer of log records. Every append notifies each
//! subscriber exactly once so a view can re-render and scroll to the newest
//! line.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

/// Marker that tags a line as an error
pub const ERROR_MARKER: &str = "[ERROR]";

/// One line of the execution log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub sequence: u64,
    pub text: String,
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    fn new(sequence: u64, text: String) -> Self {
        Self {
            sequence,
            is_error: text.contains(ERROR_MARKER),
            text,
            timestamp: Utc::now(),
        }
    }
}

/// Change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleEvent {
    Appended { sequence: u64 },
    Cleared,
}

#[derive(Debug, Default)]
pub struct LogConsole {
    records: Vec<LogRecord>,
    next_sequence: u64,
    subscribers: Vec<mpsc::UnboundedSender<ConsoleEvent>>,
}

impl LogConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register for change notifications
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConsoleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Append a record and return it
    pub fn append(&mut self, text: impl Into<String>) -> &LogRecord {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.records.push(LogRecord::new(sequence, text.into()));
        self.notify(ConsoleEvent::Appended { sequence });

        &self.records[self.records.len() - 1]
    }

    /// Drop every record. Sequences restart at zero.
    pub fn reset(&mut self) {
        self.records.clear();
        self.next_sequence = 0;
        self.notify(ConsoleEvent::Cleared);
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&LogRecord> {
        self.records.last()
    }

    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_error).count()
    }

    fn notify(&mut self, event: ConsoleEvent) {
        // Dropped receivers are pruned here
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}
