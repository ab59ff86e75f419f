//! The run log: one human-readable outcome per document path, collection id or page.
//!
//! The log is owned by the caller and handed to each reconciliation stage, so every
//! write is visible at the call site.

use std::fmt;

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Skipped,
    NoAction,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub key: String,
    pub outcome: Outcome,
    pub message: String,
}

/// Insertion-ordered map from key to outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome for `key`, replacing any earlier entry for it in place.
    pub fn record(&mut self, key: impl Into<String>, outcome: Outcome, message: impl Into<String>) {
        let key = key.into();
        let message = message.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(existing) => {
                existing.outcome = outcome;
                existing.message = message;
            }
            None => self.entries.push(LogEntry {
                key,
                outcome,
                message,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&LogEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(Outcome::Failed) > 0
    }

    /// Writes every entry through tracing.
    pub fn emit(&self) {
        info!(
            entries = self.len(),
            created = self.count(Outcome::Created),
            updated = self.count(Outcome::Updated),
            failed = self.count(Outcome::Failed),
            "[SYNC] Run log"
        );
        for entry in &self.entries {
            info!(key = %entry.key, outcome = ?entry.outcome, "{}", entry.message);
        }
    }
}

impl fmt::Display for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===LOG OUTPUT START====")?;
        for entry in &self.entries {
            writeln!(f, "{}: {}", entry.key, entry.message)?;
        }
        write!(f, "===LOG OUTPUT END======")
    }
}
