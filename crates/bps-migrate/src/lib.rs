//! Brand Profile Schema migration engine
//!
//! Detects which schema version a brand profile document is at, resolves
//! the rule chain to a target version, applies it with per-step validation
//! and records an auditable, bounded version history with single-hop
//! rollback.
//!
//! # Core Concepts
//!
//! - [`SchemaRegistry`]: Immutable versions, rules, markers and diff sections
//! - [`MigrationRule`]: Forward [`Transformation`] with optional inverse
//! - [`VersionDetector`]: Ordered [`DetectionStrategy`] list
//! - [`PathResolver`]: Deterministic forward walk over the rule table
//! - [`MigrationExecutor`] / [`RollbackEngine`]: Apply rules, report a [`MigrationResult`]
//! - [`VersionHistoryStore`]: Bounded per-document audit log
//! - [`SchemaEngine`]: Facade exposing the library surface
//!
//! # Example
//!
//! ```rust,ignore
//! use bps_migrate::{MigrationOptions, SchemaEngine};
//! use bps_core::Document;
//!
//! let engine = SchemaEngine::brand_profile()?;
//! let doc = Document::new(serde_json::json!({ "version": "1.0", "metadata": {} }));
//!
//! let result = engine.migrate(&doc, "2.0", &MigrationOptions::new().for_document("acme"));
//! assert!(result.success);
//! assert_eq!(engine.get_history("acme").len(), 3);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod collaborators;
mod config;
mod detector;
mod diff;
mod engine;
mod error;
mod estimate;
mod executor;
mod history;
mod registry;
mod resolver;
mod result;
mod rollback;
mod rule;
pub mod rules;

pub use collaborators::{CacheInvalidator, DocumentSource, NoDocumentSource, NoopInvalidator};
pub use config::EngineConfig;
pub use detector::{
    Detection, DetectionStrategy, ExplicitVersionField, OldestVersionFallback,
    SchemaIdentifierMatch, StructuralMarker, StructuralMarkers, VersionDetector,
};
pub use diff::{changes_to_value, ChangeType, DiffGenerator, TrackedSection, VersionChange};
pub use engine::{SchemaEngine, SchemaEngineBuilder};
pub use error::{MigrationError, TransformError};
pub use estimate::{estimate_path, PerformanceEstimate, PerformanceEstimator};
pub use executor::MigrationExecutor;
pub use history::{HistoryDraft, VersionHistoryEntry, VersionHistoryStore, DEFAULT_HISTORY_CAPACITY};
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};
pub use resolver::{PathResolver, PathStep, DEFAULT_MAX_HOPS};
pub use result::{AppliedStep, MigrationOptions, MigrationResult, MigrationTiming};
pub use rollback::RollbackEngine;
pub use rule::{
    Complexity, FnTransformation, MigrationRule, MigrationRuleSet, PerformanceProfile,
    Transformation,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
