//! Library facade
//!
//! [`SchemaEngine`] wires the registry, detector, executor, rollback engine
//! and history store together and records history for every successful
//! write. It is `Send + Sync`; share it behind an `Arc`.

use crate::collaborators::{CacheInvalidator, DocumentSource, NoDocumentSource, NoopInvalidator};
use crate::config::EngineConfig;
use crate::detector::VersionDetector;
use crate::diff::{DiffGenerator, VersionChange};
use crate::error::MigrationError;
use crate::estimate::{PerformanceEstimate, PerformanceEstimator};
use crate::executor::MigrationExecutor;
use crate::history::{HistoryDraft, VersionHistoryEntry, VersionHistoryStore};
use crate::registry::SchemaRegistry;
use crate::resolver::{PathResolver, PathStep};
use crate::result::{MigrationOptions, MigrationResult};
use crate::rollback::RollbackEngine;
use crate::rules::brand_profile_builder;
use bps_core::{compare_versions, Document, SchemaVersion, VersionDescriptor};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;

/// Schema version and migration engine
#[derive(Debug, Clone)]
pub struct SchemaEngine {
    registry: Arc<SchemaRegistry>,
    detector: Arc<VersionDetector>,
    executor: MigrationExecutor,
    rollback: RollbackEngine,
    history: Arc<VersionHistoryStore>,
    diff: DiffGenerator,
    config: Arc<EngineConfig>,
}

impl SchemaEngine {
    /// Start building an engine
    #[inline]
    #[must_use]
    pub fn builder() -> SchemaEngineBuilder {
        SchemaEngineBuilder::default()
    }

    /// Engine over the built-in brand profile table with default settings
    ///
    /// # Errors
    /// Returns error if the built-in table fails validation
    pub fn brand_profile() -> Result<Self, MigrationError> {
        Self::builder().build()
    }

    /// Detected version of a document
    #[must_use]
    pub fn detect_version(&self, doc: &Document) -> SchemaVersion {
        self.detector.detect(doc)
    }

    /// Check if a document is older than the current version
    #[must_use]
    pub fn needs_migration(&self, doc: &Document) -> bool {
        let detected = self.detect_version(doc);
        detected.compare(self.current_version()) == Ordering::Less
    }

    /// Rules between two registered versions
    ///
    /// # Errors
    /// - [`MigrationError::UnsupportedVersion`] if either version is unknown
    /// - the resolver's error if no unambiguous path exists
    pub fn get_migration_path(&self, from: &str, to: &str) -> Result<Vec<PathStep>, MigrationError> {
        self.ensure_supported(from)?;
        self.ensure_supported(to)?;
        let path = self.resolver().resolve(from, to)?;
        Ok(path.iter().map(|rule| PathStep::from(rule.as_ref())).collect())
    }

    /// Migrate one document
    ///
    /// On success with a document id, each applied step is appended to the
    /// document's history.
    #[must_use]
    pub fn migrate(&self, doc: &Document, target: &str, options: &MigrationOptions) -> MigrationResult {
        let result = self.executor.migrate(doc, target, options);
        if result.success && !result.dry_run && result.changed() {
            if let Some(id) = options.document_id.as_deref() {
                self.record(id, &result, options.author.as_deref());
            }
        }
        result
    }

    /// Migrate one document to the current version
    #[must_use]
    pub fn migrate_to_current(&self, doc: &Document, options: &MigrationOptions) -> MigrationResult {
        let target = self.current_version().as_str().to_string();
        self.migrate(doc, &target, options)
    }

    /// Migrate independent documents in parallel
    ///
    /// Each `(id, document)` runs with `options` plus its own id. Results
    /// are returned in input order; one failure does not stop the others.
    #[must_use]
    pub fn migrate_batch(
        &self,
        documents: &[(String, Document)],
        target: &str,
        options: &MigrationOptions,
    ) -> Vec<MigrationResult> {
        tracing::info!("Migrating batch of {} documents to {}", documents.len(), target);
        let results: Vec<MigrationResult> = documents
            .par_iter()
            .map(|(id, doc)| {
                let options = options.clone().for_document(id.as_str());
                self.migrate(doc, target, &options)
            })
            .collect();
        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            tracing::warn!("{} of {} batch migrations failed", failed, results.len());
        }
        results
    }

    /// Undo the last migration of a stored document
    #[must_use]
    pub fn rollback(&self, document_id: &str, target: &str) -> MigrationResult {
        let result = self.rollback.rollback(document_id, target);
        if result.success && result.changed() {
            self.record(document_id, &result, None);
        }
        result
    }

    /// Append a history entry directly
    ///
    /// # Errors
    /// Returns [`MigrationError::UnsupportedVersion`] if `version` is not registered
    pub fn append_history(
        &self,
        document_id: &str,
        version: &str,
        changes: Vec<VersionChange>,
        author: &str,
        migration_applied: Option<&str>,
    ) -> Result<VersionHistoryEntry, MigrationError> {
        let descriptor = self
            .registry
            .versions()
            .get_info(version)
            .ok_or_else(|| MigrationError::unsupported(version))?;
        let mut draft = HistoryDraft::new(descriptor.version.clone(), changes);
        if let Some(label) = migration_applied {
            draft = draft.migration_applied(label);
        }
        Ok(self.history.append(document_id, draft, author))
    }

    /// History of a document, oldest first
    #[must_use]
    pub fn get_history(&self, document_id: &str) -> Vec<VersionHistoryEntry> {
        self.history.get(document_id)
    }

    /// Newest history entry at `version`
    #[must_use]
    pub fn get_history_version(&self, document_id: &str, version: &str) -> Option<VersionHistoryEntry> {
        self.history.get_version(document_id, version)
    }

    /// Order two version strings
    #[inline]
    #[must_use]
    pub fn compare_versions(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }

    /// Tracked changes between two snapshots
    #[must_use]
    pub fn diff(&self, old: &Document, new: &Document) -> Vec<VersionChange> {
        self.diff.diff(old, new)
    }

    /// Cost of migrating `record_count` documents
    ///
    /// # Errors
    /// Returns the resolver's error if no unambiguous path exists
    pub fn estimate_performance(
        &self,
        from: &str,
        to: &str,
        record_count: u32,
    ) -> Result<PerformanceEstimate, MigrationError> {
        PerformanceEstimator::new(self.resolver()).estimate(from, to, record_count)
    }

    /// Descriptor for a version
    #[inline]
    #[must_use]
    pub fn get_version_info(&self, version: &str) -> Option<&VersionDescriptor> {
        self.registry.versions().get_info(version)
    }

    /// All registered versions, oldest first
    #[inline]
    #[must_use]
    pub fn get_supported_versions(&self) -> &[VersionDescriptor] {
        self.registry.versions().list()
    }

    /// Newest registered version
    #[inline]
    #[must_use]
    pub fn current_version(&self) -> &SchemaVersion {
        self.registry.versions().current()
    }

    /// Schema tables
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(self.registry.rules()).with_max_hops(self.config.max_path_hops)
    }

    fn ensure_supported(&self, version: &str) -> Result<(), MigrationError> {
        if self.registry.versions().is_supported(version) {
            Ok(())
        } else {
            Err(MigrationError::unsupported(version))
        }
    }

    fn record(&self, document_id: &str, result: &MigrationResult, author: Option<&str>) {
        let Some(first) = result.applied.first() else {
            return;
        };
        let drafts = result
            .applied
            .iter()
            .map(|step| {
                HistoryDraft::new(step.to.clone(), step.changes.clone()).migration_applied(step.label())
            })
            .collect();
        let author = author.unwrap_or(self.config.default_author.as_str());
        let entries = self
            .history
            .record_transition(document_id, &first.from, drafts, author);
        tracing::debug!("Recorded {} history entries for {}", entries.len(), document_id);
    }
}

/// Builder for [`SchemaEngine`]
#[derive(Debug, Default)]
pub struct SchemaEngineBuilder {
    registry: Option<SchemaRegistry>,
    config: EngineConfig,
    invalidator: Option<Arc<dyn CacheInvalidator>>,
    source: Option<Arc<dyn DocumentSource>>,
}

impl SchemaEngineBuilder {
    /// Use a custom schema table instead of the brand profile table
    #[must_use]
    pub fn registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a configuration
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Cache collaborator
    #[must_use]
    pub fn invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    /// Document accessor used by rollback
    #[must_use]
    pub fn document_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the engine
    ///
    /// # Errors
    /// - [`MigrationError::Config`] if the configuration is invalid
    /// - [`MigrationError::AmbiguousPath`] if `strict_rules` is set and the
    ///   rule table is ambiguous
    pub fn build(self) -> Result<SchemaEngine, MigrationError> {
        self.config.validate()?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => brand_profile_builder().strict(self.config.strict_rules).build()?,
        };
        if self.config.strict_rules {
            registry.rules().check_chain()?;
        }

        let registry = Arc::new(registry);
        let config = Arc::new(self.config);
        let detector = Arc::new(registry.detector());
        let history = Arc::new(VersionHistoryStore::new(
            Arc::clone(registry.rules()),
            config.history_capacity,
        ));
        let invalidator: Arc<dyn CacheInvalidator> = match self.invalidator {
            Some(invalidator) => invalidator,
            None => Arc::new(NoopInvalidator),
        };
        let source: Arc<dyn DocumentSource> = match self.source {
            Some(source) => source,
            None => Arc::new(NoDocumentSource),
        };

        let executor = MigrationExecutor::new(
            Arc::clone(&registry),
            Arc::clone(&detector),
            Arc::clone(&invalidator),
            Arc::clone(&config),
        );
        let rollback = RollbackEngine::new(
            Arc::clone(&registry),
            Arc::clone(&detector),
            Arc::clone(&history),
            source,
            invalidator,
            Arc::clone(&config),
        );

        tracing::info!(
            "Schema engine ready: {} versions, current {}",
            registry.versions().len(),
            registry.versions().current()
        );

        Ok(SchemaEngine {
            diff: registry.diff_generator(),
            registry,
            detector,
            executor,
            rollback,
            history,
            config,
        })
    }
}
