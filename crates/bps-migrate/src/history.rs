//! Bounded per-document version history
//!
//! Each document id owns a FIFO queue of at most `capacity` entries. All
//! writes for an id go through the id's [`DashMap`] entry, so the
//! read-previous, build, push, evict sequence is atomic per document while
//! different documents never contend beyond their shard.

use crate::diff::{changes_to_value, VersionChange};
use crate::rule::MigrationRuleSet;
use bps_core::{Checksum, SchemaVersion};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// Default number of entries kept per document
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Immutable audit record of one version a document reached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionHistoryEntry {
    pub id: Uuid,
    pub document_id: String,
    pub version: SchemaVersion,
    pub previous_version: Option<SchemaVersion>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub changes: Vec<VersionChange>,
    /// Label of the rule that produced this version
    pub migration_applied: Option<String>,
    pub rollback_available: bool,
    /// Byte length of the encoded change set
    pub size: usize,
    pub checksum: Checksum,
}

impl VersionHistoryEntry {
    /// Recompute the checksum from `changes` and compare
    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        Checksum::of_value(&changes_to_value(&self.changes)) == self.checksum
    }
}

/// Input for one appended entry
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryDraft {
    pub version: SchemaVersion,
    pub changes: Vec<VersionChange>,
    pub migration_applied: Option<String>,
}

impl HistoryDraft {
    /// Draft with no migration label
    #[inline]
    #[must_use]
    pub fn new(version: SchemaVersion, changes: Vec<VersionChange>) -> Self {
        Self {
            version,
            changes,
            migration_applied: None,
        }
    }

    /// Record the rule that produced the version
    #[must_use]
    pub fn migration_applied(mut self, label: impl Into<String>) -> Self {
        self.migration_applied = Some(label.into());
        self
    }
}

/// Append-only, capacity-bounded history keyed by document id
#[derive(Debug)]
pub struct VersionHistoryStore {
    rules: Arc<MigrationRuleSet>,
    capacity: usize,
    entries: DashMap<String, VecDeque<VersionHistoryEntry>>,
}

impl VersionHistoryStore {
    /// Create store; a zero capacity is raised to one
    #[must_use]
    pub fn new(rules: Arc<MigrationRuleSet>, capacity: usize) -> Self {
        Self {
            rules,
            capacity: capacity.max(1),
            entries: DashMap::new(),
        }
    }

    /// Entries kept per document
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one entry
    ///
    /// `previous_version` is the version of the current latest entry.
    pub fn append(&self, document_id: &str, draft: HistoryDraft, author: &str) -> VersionHistoryEntry {
        let mut queue = self.entries.entry(document_id.to_string()).or_default();
        self.push(&mut queue, document_id, draft, author)
    }

    /// Append a chain of entries atomically
    ///
    /// If the newest entry is not at `baseline` (no history yet, or the
    /// migrated copy was older than the recorded one), an entry for
    /// `baseline` is recorded first. The first draft's previous version is
    /// then always the version the migration started from.
    pub fn record_transition(
        &self,
        document_id: &str,
        baseline: &SchemaVersion,
        drafts: Vec<HistoryDraft>,
        author: &str,
    ) -> Vec<VersionHistoryEntry> {
        let mut queue = self.entries.entry(document_id.to_string()).or_default();
        let at_baseline = queue.back().is_some_and(|entry| &entry.version == baseline);
        if !at_baseline && !drafts.is_empty() {
            let seed = HistoryDraft::new(baseline.clone(), Vec::new());
            self.push(&mut queue, document_id, seed, author);
        }
        drafts
            .into_iter()
            .map(|draft| self.push(&mut queue, document_id, draft, author))
            .collect()
    }

    /// All entries for a document, oldest first
    #[must_use]
    pub fn get(&self, document_id: &str) -> Vec<VersionHistoryEntry> {
        self.entries
            .get(document_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Newest entry recorded at `version`
    #[must_use]
    pub fn get_version(&self, document_id: &str, version: &str) -> Option<VersionHistoryEntry> {
        self.entries.get(document_id).and_then(|queue| {
            queue
                .iter()
                .rev()
                .find(|entry| entry.version.as_str() == version)
                .cloned()
        })
    }

    /// Most recent entry
    #[must_use]
    pub fn latest(&self, document_id: &str) -> Option<VersionHistoryEntry> {
        self.entries
            .get(document_id)
            .and_then(|queue| queue.back().cloned())
    }

    /// Check if `version` is still reachable from the retained history
    #[must_use]
    pub fn contains_version(&self, document_id: &str, version: &str) -> bool {
        self.entries.get(document_id).is_some_and(|queue| {
            queue.iter().any(|entry| {
                entry.version.as_str() == version
                    || entry
                        .previous_version
                        .as_ref()
                        .is_some_and(|prev| prev.as_str() == version)
            })
        })
    }

    /// Number of entries for a document
    #[must_use]
    pub fn len(&self, document_id: &str) -> usize {
        self.entries.get(document_id).map_or(0, |queue| queue.len())
    }

    /// Number of documents with history
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.entries.len()
    }

    fn push(
        &self,
        queue: &mut VecDeque<VersionHistoryEntry>,
        document_id: &str,
        draft: HistoryDraft,
        author: &str,
    ) -> VersionHistoryEntry {
        let previous_version = queue.back().map(|entry| entry.version.clone());
        let rollback_available = previous_version
            .as_ref()
            .and_then(|prev| self.rules.find(prev.as_str(), draft.version.as_str()))
            .is_some_and(|rule| rule.has_inverse());

        let encoded = changes_to_value(&draft.changes);
        let entry = VersionHistoryEntry {
            id: Uuid::new_v4(),
            document_id: document_id.to_string(),
            version: draft.version,
            previous_version,
            created_at: Utc::now(),
            created_by: author.to_string(),
            changes: draft.changes,
            migration_applied: draft.migration_applied,
            rollback_available,
            size: encoded.to_string().len(),
            checksum: Checksum::of_value(&encoded),
        };

        queue.push_back(entry.clone());
        while queue.len() > self.capacity {
            if let Some(evicted) = queue.pop_front() {
                tracing::debug!(
                    document_id,
                    version = %evicted.version,
                    capacity = self.capacity,
                    "evicted oldest history entry"
                );
            }
        }
        entry
    }
}
