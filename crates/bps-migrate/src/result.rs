//! Migration options and results

use crate::diff::VersionChange;
use crate::error::MigrationError;
use crate::estimate::PerformanceEstimate;
use crate::resolver::PathStep;
use bps_core::{Document, SchemaVersion};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Per-call migration switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Plan and estimate only
    pub dry_run: bool,
    /// Keep a copy of the input in the result
    pub create_backup: bool,
    /// Run each rule's validator after it applies
    pub validate_after_each: bool,
    /// Id used for cache tags and history
    pub document_id: Option<String>,
    /// Author recorded in history
    pub author: Option<String>,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            create_backup: true,
            validate_after_each: true,
            document_id: None,
            author: None,
        }
    }
}

impl MigrationOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan only
    #[inline]
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Skip the input snapshot
    #[inline]
    #[must_use]
    pub fn without_backup(mut self) -> Self {
        self.create_backup = false;
        self
    }

    /// Skip per-rule validators; the final detection check still runs
    #[inline]
    #[must_use]
    pub fn skip_step_validation(mut self) -> Self {
        self.validate_after_each = false;
        self
    }

    /// Attach a document id
    #[inline]
    #[must_use]
    pub fn for_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// Attach an author
    #[inline]
    #[must_use]
    pub fn by(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Wall-clock timing of one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationTiming {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub avg_per_record: Duration,
    /// Duration of each applied rule, in order
    pub steps: Vec<Duration>,
}

/// One rule application that took effect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedStep {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    pub description: String,
    pub duration: Duration,
    pub changes: Vec<VersionChange>,
}

impl AppliedStep {
    /// `"from -> to"` label
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }
}

/// Outcome of a migrate or rollback call
///
/// Failures are reported here rather than as `Err`; check
/// [`success`](Self::success) before using [`document`](Self::document).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationResult {
    pub success: bool,
    pub dry_run: bool,
    /// Detected version of the input
    pub from_version: String,
    /// Requested version
    pub to_version: String,
    /// Version of [`document`](Self::document)
    pub reached_version: String,
    /// Rules fully applied
    pub records_processed: usize,
    pub errors: Vec<MigrationError>,
    pub warnings: Vec<String>,
    pub performance: MigrationTiming,
    /// Rules on the resolved path
    pub plan: Vec<PathStep>,
    /// Cost of the resolved path for one record
    pub estimate: Option<PerformanceEstimate>,
    pub applied: Vec<AppliedStep>,
    /// Copy of the input taken before the first rule ran
    pub rollback_snapshot: Option<Document>,
    /// Output document; the untouched input when nothing was applied
    pub document: Option<Document>,
}

impl MigrationResult {
    /// First reported error
    #[inline]
    #[must_use]
    pub fn first_error(&self) -> Option<&MigrationError> {
        self.errors.first()
    }

    /// Check if any rule took effect
    #[inline]
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// In-flight result with its clock
pub(crate) struct ResultBuilder {
    result: MigrationResult,
    clock: Instant,
}

impl ResultBuilder {
    pub(crate) fn start(from: &str, to: &str, dry_run: bool, document: Option<Document>) -> Self {
        let now = Utc::now();
        Self {
            result: MigrationResult {
                success: false,
                dry_run,
                from_version: from.to_string(),
                to_version: to.to_string(),
                reached_version: from.to_string(),
                records_processed: 0,
                errors: Vec::new(),
                warnings: Vec::new(),
                performance: MigrationTiming {
                    started_at: now,
                    finished_at: now,
                    duration: Duration::ZERO,
                    avg_per_record: Duration::ZERO,
                    steps: Vec::new(),
                },
                plan: Vec::new(),
                estimate: None,
                applied: Vec::new(),
                rollback_snapshot: None,
                document,
            },
            clock: Instant::now(),
        }
    }

    pub(crate) fn result_mut(&mut self) -> &mut MigrationResult {
        &mut self.result
    }

    pub(crate) fn set_from(&mut self, from: &str) {
        self.result.from_version = from.to_string();
        self.result.reached_version = from.to_string();
    }

    pub(crate) fn warn(&mut self, warning: impl Into<String>) {
        self.result.warnings.push(warning.into());
    }

    pub(crate) fn push_step(&mut self, step: AppliedStep) {
        self.result.performance.steps.push(step.duration);
        self.result.reached_version = step.to.to_string();
        self.result.records_processed += 1;
        self.result.applied.push(step);
    }

    /// Finish as failed with `error`
    pub(crate) fn fail(mut self, error: MigrationError) -> MigrationResult {
        self.result.success = false;
        self.result.errors.push(error);
        self.finish()
    }

    /// Finish as successful
    pub(crate) fn succeed(mut self) -> MigrationResult {
        self.result.success = true;
        self.finish()
    }

    fn finish(mut self) -> MigrationResult {
        let timing = &mut self.result.performance;
        timing.finished_at = Utc::now();
        timing.duration = self.clock.elapsed();
        let records = u32::try_from(self.result.records_processed)
            .unwrap_or(u32::MAX)
            .max(1);
        timing.avg_per_record = timing.duration / records;
        self.result
    }
}
