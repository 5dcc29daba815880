//! Single-hop rollback
//!
//! [`RollbackEngine`] undoes the last forward migration of a stored
//! document by applying the inverse of the rule that produced its current
//! version. It never walks multi-hop paths: the target must be the source
//! version of that rule and must still be present in the retained history.

use crate::collaborators::{CacheInvalidator, DocumentSource};
use crate::config::EngineConfig;
use crate::detector::VersionDetector;
use crate::diff::DiffGenerator;
use crate::error::MigrationError;
use crate::history::VersionHistoryStore;
use crate::registry::SchemaRegistry;
use crate::result::{AppliedStep, MigrationResult, ResultBuilder};
use std::sync::Arc;
use std::time::Instant;

/// Applies declared inverses to stored documents
#[derive(Debug, Clone)]
pub struct RollbackEngine {
    registry: Arc<SchemaRegistry>,
    detector: Arc<VersionDetector>,
    diff: DiffGenerator,
    history: Arc<VersionHistoryStore>,
    source: Arc<dyn DocumentSource>,
    invalidator: Arc<dyn CacheInvalidator>,
    config: Arc<EngineConfig>,
}

impl RollbackEngine {
    /// Create engine
    #[must_use]
    pub fn new(
        registry: Arc<SchemaRegistry>,
        detector: Arc<VersionDetector>,
        history: Arc<VersionHistoryStore>,
        source: Arc<dyn DocumentSource>,
        invalidator: Arc<dyn CacheInvalidator>,
        config: Arc<EngineConfig>,
    ) -> Self {
        let diff = registry.diff_generator();
        Self {
            registry,
            detector,
            diff,
            history,
            source,
            invalidator,
            config,
        }
    }

    /// Roll the stored document `document_id` back to `target`
    ///
    /// Either the inverse applies and validates, or the result carries the
    /// loaded document unchanged.
    #[must_use]
    pub fn rollback(&self, document_id: &str, target: &str) -> MigrationResult {
        let span = tracing::info_span!("rollback", document_id, to = target);
        let _guard = span.enter();

        let mut builder = ResultBuilder::start("", target, false, None);

        if !self.registry.versions().is_supported(target) {
            return builder.fail(MigrationError::unsupported(target));
        }

        let Some(latest) = self.history.latest(document_id) else {
            tracing::warn!("No history recorded for {}", document_id);
            return builder.fail(MigrationError::HistoryNotFound {
                document_id: document_id.to_string(),
                version: None,
            });
        };
        let current = latest.version;
        builder.set_from(current.as_str());

        let Some(doc) = self.source.load(document_id) else {
            return builder.fail(MigrationError::DocumentNotFound {
                document_id: document_id.to_string(),
            });
        };
        builder.result_mut().document = Some(doc.clone());

        let detected = self.detector.detect(&doc);
        if detected != current {
            builder.warn(format!(
                "stored document detects as {detected} but history records {current}"
            ));
        }

        if current.as_str() == target {
            builder.warn(format!("no rollback needed: document is already at version {target}"));
            return builder.succeed();
        }

        let producers = self.registry.rules().producing(current.as_str());
        let rule = match producers.iter().find(|r| r.from_version() == target) {
            Some(rule) if rule.has_inverse() => Arc::clone(rule),
            Some(rule) => {
                return builder.fail(MigrationError::rollback_unsupported(
                    current.as_str(),
                    target,
                    format!("rule {} declares no inverse", rule.label()),
                ))
            }
            None => {
                let reason = if producers.is_empty() {
                    format!("no rule produces version {current}")
                } else if let Some(rule) = producers.iter().find(|r| !r.has_inverse()) {
                    format!("rule {} declares no inverse", rule.label())
                } else {
                    format!("{target} is not one step before {current}")
                };
                return builder.fail(MigrationError::rollback_unsupported(
                    current.as_str(),
                    target,
                    reason,
                ));
            }
        };

        if !self.history.contains_version(document_id, target) {
            return builder.fail(MigrationError::HistoryNotFound {
                document_id: document_id.to_string(),
                version: Some(target.to_string()),
            });
        }

        builder.result_mut().rollback_snapshot = Some(doc.clone());

        let clock = Instant::now();
        let reverted = match rule.invert(&doc) {
            Ok(reverted) => reverted,
            Err(e) => {
                tracing::error!("Inverse of {} failed: {}", rule.label(), e);
                return builder.fail(MigrationError::TransformFailure {
                    from: current.to_string(),
                    to: target.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if !rule.validate_inverse(&reverted) {
            return builder.fail(MigrationError::validation(
                target,
                format!("inverse of rule {} failed validation", rule.label()),
            ));
        }

        let reached = self.detector.detect(&reverted);
        if reached.as_str() != target {
            return builder.fail(MigrationError::validation(
                target,
                format!("rolled back document detects as version {reached}"),
            ));
        }

        let changes = self.diff.diff(&doc, &reverted);
        builder.push_step(AppliedStep {
            from: current.clone(),
            to: rule.from_version().clone(),
            description: format!("Rollback: {}", rule.description()),
            duration: clock.elapsed(),
            changes,
        });
        builder.result_mut().document = Some(reverted);

        let invalidated = self
            .invalidator
            .invalidate_by_tags(&self.config.cache_tags(document_id));
        tracing::info!(
            "Rolled back {} from {} to {} ({} cache entries invalidated)",
            document_id,
            current,
            target,
            invalidated
        );
        builder.succeed()
    }
}
