//! Mutation journal
//!
//! A bounded, timestamped log of published mutations. Diagnostics and
//! replay tooling read it; it never feeds back into the snapshot.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::service::CanvasMutation;

pub const DEFAULT_JOURNAL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub mutation: CanvasMutation,
}

/// Ring buffer of recent mutations, oldest first.
#[derive(Debug)]
pub struct MutationJournal {
    entries: VecDeque<JournalEntry>,
    capacity: usize,
}

impl Default for MutationJournal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl MutationJournal {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, mutation: CanvasMutation) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(JournalEntry {
            at: Utc::now(),
            mutation,
        });
    }

    /// Entries with a version strictly greater than `version`.
    pub fn since(&self, version: u64) -> impl Iterator<Item = &JournalEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.mutation.version > version)
    }

    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the log for export.
    pub fn export(&self) -> Result<String, crate::StateError> {
        let entries: Vec<&JournalEntry> = self.entries.iter().collect();
        Ok(serde_json::to_string(&entries)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{MutationKind, MutationSource};

    fn mutation(version: u64) -> CanvasMutation {
        CanvasMutation {
            kind: MutationKind::Position,
            source: MutationSource::Engine,
            node_guid: Some("n".into()),
            payload: None,
            version,
        }
    }

    #[test]
    fn test_since_filters_by_version() {
        let mut journal = MutationJournal::default();
        for v in 1..=5 {
            journal.record(mutation(v));
        }
        let versions: Vec<u64> = journal.since(3).map(|e| e.mutation.version).collect();
        assert_eq!(versions, vec![4, 5]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut journal = MutationJournal::with_capacity(3);
        for v in 1..=5 {
            journal.record(mutation(v));
        }
        assert_eq!(journal.len(), 3);
        let versions: Vec<u64> = journal.entries().map(|e| e.mutation.version).collect();
        assert_eq!(versions, vec![3, 4, 5]);
    }

    #[test]
    fn test_export_is_json_array() {
        let mut journal = MutationJournal::default();
        journal.record(mutation(1));
        let payload = journal.export().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["type"], "position");
    }
}
