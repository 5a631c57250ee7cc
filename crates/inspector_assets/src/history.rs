//! The in-memory session history of patch operations.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Ring capacity. Older entries fall off the front.
const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryOperation {
    Draft,
    Publish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub filename: String,
    pub base_asset_path: String,
    pub timestamp: i64,
    pub operation: HistoryOperation,
}

/// A bounded ring of draft/publish operations for this server session.
#[derive(Debug, Default)]
pub struct SessionHistory {
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl SessionHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        filename: impl Into<String>,
        base_asset_path: impl Into<String>,
        operation: HistoryOperation,
    ) {
        let mut entries = self.entries.lock();
        entries.push_back(HistoryEntry {
            filename: filename.into(),
            base_asset_path: base_asset_path.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            operation,
        });
        while entries.len() > MAX_ENTRIES {
            entries.pop_front();
        }
    }

    /// All retained entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
