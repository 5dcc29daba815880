//! Forward migration
//!
//! [`MigrationExecutor`] detects the input's version, resolves a path and
//! applies it rule by rule on a working copy. The caller's document is
//! never modified; the result carries the output, the applied steps and
//! any errors.

use crate::collaborators::CacheInvalidator;
use crate::config::EngineConfig;
use crate::detector::VersionDetector;
use crate::diff::DiffGenerator;
use crate::error::MigrationError;
use crate::estimate::estimate_path;
use crate::registry::SchemaRegistry;
use crate::resolver::{PathResolver, PathStep};
use crate::result::{AppliedStep, MigrationOptions, MigrationResult, ResultBuilder};
use bps_core::Document;
use std::sync::Arc;
use std::time::Instant;

/// Applies resolved paths to documents
#[derive(Debug, Clone)]
pub struct MigrationExecutor {
    registry: Arc<SchemaRegistry>,
    detector: Arc<VersionDetector>,
    diff: DiffGenerator,
    invalidator: Arc<dyn CacheInvalidator>,
    config: Arc<EngineConfig>,
}

impl MigrationExecutor {
    /// Create executor
    #[must_use]
    pub fn new(
        registry: Arc<SchemaRegistry>,
        detector: Arc<VersionDetector>,
        invalidator: Arc<dyn CacheInvalidator>,
        config: Arc<EngineConfig>,
    ) -> Self {
        let diff = registry.diff_generator();
        Self {
            registry,
            detector,
            diff,
            invalidator,
            config,
        }
    }

    /// Migrate `doc` to `target`
    ///
    /// Path errors are reported before any rule runs and leave
    /// `result.document` equal to the input. A failing rule stops the walk
    /// and the result holds the last validated document. A final detection
    /// mismatch discards every step and returns the input.
    #[must_use]
    pub fn migrate(&self, doc: &Document, target: &str, options: &MigrationOptions) -> MigrationResult {
        let detected = self.detector.detect(doc);
        let document_id = options.document_id.as_deref().unwrap_or("-");
        let span = tracing::info_span!(
            "migrate",
            document_id,
            from = %detected,
            to = target,
            dry_run = options.dry_run
        );
        let _guard = span.enter();

        let mut builder =
            ResultBuilder::start(detected.as_str(), target, options.dry_run, Some(doc.clone()));

        if !self.registry.versions().is_supported(target) {
            tracing::warn!("Target version {} is not registered", target);
            return builder.fail(MigrationError::unsupported(target));
        }

        if let Some(notice) = self
            .registry
            .versions()
            .get_info(detected.as_str())
            .and_then(|info| info.deprecated.as_deref())
        {
            builder.warn(format!("version {detected} is deprecated: {notice}"));
        }

        if detected.as_str() == target {
            builder.warn(format!(
                "no migration needed: document is already at version {target}"
            ));
            return builder.succeed();
        }

        let path = match PathResolver::new(self.registry.rules())
            .with_max_hops(self.config.max_path_hops)
            .resolve(detected.as_str(), target)
        {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Path resolution failed: {}", e);
                return builder.fail(e);
            }
        };

        {
            let result = builder.result_mut();
            result.plan = path.iter().map(|rule| PathStep::from(rule.as_ref())).collect();
            result.estimate = Some(estimate_path(&path, 1));
        }

        if options.dry_run {
            tracing::info!("Dry run planned {} step(s)", path.len());
            return builder.succeed();
        }

        if options.create_backup {
            builder.result_mut().rollback_snapshot = Some(doc.clone());
        }

        tracing::info!("Migrating from {} to {} in {} step(s)", detected, target, path.len());

        let mut working = doc.clone();
        for rule in &path {
            let clock = Instant::now();
            let next = match rule.apply(&working) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!("Rule {} failed: {}", rule.label(), e);
                    builder.result_mut().document = Some(working);
                    return builder.fail(MigrationError::TransformFailure {
                        from: rule.from_version().to_string(),
                        to: rule.to_version().to_string(),
                        reason: e.to_string(),
                    });
                }
            };

            if options.validate_after_each && !rule.validate(&next) {
                tracing::error!("Rule {} produced an invalid document", rule.label());
                builder.result_mut().document = Some(working);
                return builder.fail(MigrationError::validation(
                    rule.to_version().as_str(),
                    format!("output of rule {} failed validation", rule.label()),
                ));
            }

            let changes = self.diff.diff(&working, &next);
            builder.push_step(AppliedStep {
                from: rule.from_version().clone(),
                to: rule.to_version().clone(),
                description: rule.description().to_string(),
                duration: clock.elapsed(),
                changes,
            });
            tracing::debug!("Applied rule {}", rule.label());
            working = next;
        }

        let reached = self.detector.detect(&working);
        if reached.as_str() != target {
            tracing::error!("Migrated document detects as {} instead of {}", reached, target);
            let result = builder.result_mut();
            result.applied.clear();
            result.performance.steps.clear();
            result.records_processed = 0;
            result.reached_version = detected.to_string();
            return builder.fail(MigrationError::validation(
                target,
                format!("migrated document detects as version {reached}"),
            ));
        }

        builder.result_mut().document = Some(working);
        if let Some(id) = options.document_id.as_deref() {
            let invalidated = self.invalidator.invalidate_by_tags(&self.config.cache_tags(id));
            tracing::debug!("Invalidated {} cache entries for {}", invalidated, id);
        }

        let result = builder.succeed();
        tracing::info!(
            "Migration completed: {} rule(s) in {:?}",
            result.records_processed,
            result.performance.duration
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::NoopInvalidator;
    use crate::detector::StructuralMarker;
    use crate::error::TransformError;
    use crate::rule::{FnTransformation, MigrationRule};
    use bps_core::{FieldPath, SchemaVersion, VersionDescriptor};
    use chrono::NaiveDate;
    use serde_json::json;

    fn v(s: &str) -> SchemaVersion {
        SchemaVersion::parse(s).unwrap()
    }

    fn descriptor(version: &str) -> VersionDescriptor {
        VersionDescriptor::new(v(version), format!("urn:t:{version}"), NaiveDate::default())
    }

    fn bump(to: &'static str) -> FnTransformation {
        FnTransformation::new(
            format!("bump to {to}"),
            move |doc: &Document| {
                let mut out = doc.clone();
                out.set_version(to)?;
                Ok(out)
            },
            move |doc| doc.version() == Some(to),
        )
    }

    fn executor(rules: Vec<MigrationRule>) -> MigrationExecutor {
        let mut builder = SchemaRegistry::builder()
            .version(descriptor("1.0").deprecated("old"))
            .version(descriptor("1.1"))
            .version(descriptor("2.0"))
            .marker(StructuralMarker::new(FieldPath::single("extra"), v("2.0")));
        for rule in rules {
            builder = builder.rule(rule);
        }
        let registry = Arc::new(builder.build().unwrap());
        let detector = Arc::new(registry.detector());
        MigrationExecutor::new(
            registry,
            detector,
            Arc::new(NoopInvalidator),
            Arc::new(EngineConfig::default()),
        )
    }

    fn chain() -> Vec<MigrationRule> {
        vec![
            MigrationRule::new(v("1.0"), v("1.1"), bump("1.1")),
            MigrationRule::new(v("1.1"), v("2.0"), bump("2.0")),
        ]
    }

    #[test]
    fn migrates_along_chain() {
        let exec = executor(chain());
        let doc = Document::new(json!({"version": "1.0"}));
        let result = exec.migrate(&doc, "2.0", &MigrationOptions::new());
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.records_processed, 2);
        assert_eq!(result.reached_version, "2.0");
        assert_eq!(result.document.unwrap().version(), Some("2.0"));
        assert_eq!(result.rollback_snapshot, Some(doc));
        assert_eq!(result.plan.len(), 2);
        assert_eq!(result.applied.len(), 2);
        assert!(result.warnings.iter().any(|w| w.contains("deprecated")));
    }

    #[test]
    fn same_version_is_noop() {
        let exec = executor(chain());
        let doc = Document::new(json!({"version": "1.1"}));
        let result = exec.migrate(&doc, "1.1", &MigrationOptions::new());
        assert!(result.success);
        assert_eq!(result.records_processed, 0);
        assert!(result.warnings.iter().any(|w| w.contains("no migration needed")));
        assert_eq!(result.document, Some(doc));
    }

    #[test]
    fn unsupported_target() {
        let exec = executor(chain());
        let doc = Document::new(json!({"version": "1.0"}));
        let result = exec.migrate(&doc, "9.9", &MigrationOptions::new());
        assert!(!result.success);
        assert_eq!(result.first_error().unwrap().kind(), "unsupported_version");
    }

    #[test]
    fn backwards_target_has_no_path() {
        let exec = executor(chain());
        let doc = Document::new(json!({"version": "2.0"}));
        let result = exec.migrate(&doc, "1.0", &MigrationOptions::new());
        assert!(!result.success);
        assert_eq!(result.first_error().unwrap().kind(), "no_migration_path");
        assert_eq!(result.document, Some(doc));
        assert!(result.rollback_snapshot.is_none());
    }

    #[test]
    fn dry_run_plans_without_applying() {
        let exec = executor(chain());
        let doc = Document::new(json!({"version": "1.0"}));
        let result = exec.migrate(&doc, "2.0", &MigrationOptions::new().dry_run());
        assert!(result.success);
        assert!(result.dry_run);
        assert_eq!(result.records_processed, 0);
        assert_eq!(result.plan.len(), 2);
        assert_eq!(result.estimate.unwrap().steps, 2);
        assert!(result.rollback_snapshot.is_none());
        assert_eq!(result.document, Some(doc));
    }

    #[test]
    fn failing_validator_keeps_last_good_document() {
        let broken = FnTransformation::new(
            "broken",
            |doc: &Document| {
                let mut out = doc.clone();
                out.set_version("2.0")?;
                Ok(out)
            },
            |_| false,
        );
        let exec = executor(vec![
            MigrationRule::new(v("1.0"), v("1.1"), bump("1.1")),
            MigrationRule::new(v("1.1"), v("2.0"), broken),
        ]);
        let doc = Document::new(json!({"version": "1.0"}));
        let result = exec.migrate(&doc, "2.0", &MigrationOptions::new());
        assert!(!result.success);
        assert_eq!(result.records_processed, 1);
        assert_eq!(result.reached_version, "1.1");
        assert_eq!(result.document.as_ref().unwrap().version(), Some("1.1"));
        assert_eq!(result.first_error().unwrap().kind(), "validation_failure");
    }

    #[test]
    fn transform_error_is_reported() {
        let failing = FnTransformation::new(
            "fails",
            |_: &Document| Err(TransformError::Failed("boom".into())),
            |_| true,
        );
        let exec = executor(vec![MigrationRule::new(v("1.0"), v("1.1"), failing)]);
        let doc = Document::new(json!({"version": "1.0"}));
        let result = exec.migrate(&doc, "1.1", &MigrationOptions::new());
        assert!(!result.success);
        assert_eq!(result.records_processed, 0);
        assert_eq!(result.document, Some(doc));
        assert!(matches!(
            result.first_error(),
            Some(MigrationError::TransformFailure { reason, .. }) if reason == "boom"
        ));
    }

    #[test]
    fn detection_mismatch_discards_output() {
        let liar = FnTransformation::new("liar", |doc: &Document| Ok(doc.clone()), |_| true);
        let exec = executor(vec![MigrationRule::new(v("1.0"), v("1.1"), liar)]);
        let doc = Document::new(json!({"version": "1.0"}));
        let result = exec.migrate(&doc, "1.1", &MigrationOptions::new());
        assert!(!result.success);
        assert_eq!(result.records_processed, 0);
        assert!(result.applied.is_empty());
        assert_eq!(result.document, Some(doc));
        assert_eq!(result.first_error().unwrap().kind(), "validation_failure");
    }

    #[test]
    fn skipping_step_validation_still_checks_detection() {
        let unvalidated = FnTransformation::new(
            "unvalidated",
            |doc: &Document| {
                let mut out = doc.clone();
                out.set_version("1.1")?;
                Ok(out)
            },
            |_| false,
        );
        let exec = executor(vec![MigrationRule::new(v("1.0"), v("1.1"), unvalidated)]);
        let doc = Document::new(json!({"version": "1.0"}));
        let result = exec.migrate(
            &doc,
            "1.1",
            &MigrationOptions::new().skip_step_validation().without_backup(),
        );
        assert!(result.success);
        assert!(result.rollback_snapshot.is_none());
    }
}
