//! Error types for the migration engine
//!
//! [`MigrationError`] is the failure taxonomy reported in
//! [`MigrationResult::errors`](crate::MigrationResult). It is `Clone` and
//! serializable so results can be stored and shipped to callers as-is.
//!
//! [`TransformError`] is what a rule's transformation returns when it cannot
//! produce an output document.

use bps_core::DocumentError;
use serde::Serialize;

/// Migration engine errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationError {
    /// Version is not in the registry
    #[error("unsupported version: {version}")]
    UnsupportedVersion { version: String },

    /// No rule chain connects the two versions
    #[error("no migration path from {from} to {to}: {reason}")]
    NoMigrationPath {
        from: String,
        to: String,
        reason: String,
    },

    /// More than one rule leaves the same version
    #[error("ambiguous migration path: {count} rules start at version {version}")]
    AmbiguousPath { version: String, count: usize },

    /// A rule's transformation returned an error
    #[error("transform {from} -> {to} failed: {reason}")]
    TransformFailure {
        from: String,
        to: String,
        reason: String,
    },

    /// Output did not pass validation for the version it claims
    #[error("validation failed for version {version}: {reason}")]
    ValidationFailure { version: String, reason: String },

    /// The rule that produced the current version has no usable inverse
    #[error("rollback from {from} to {to} is not supported: {reason}")]
    RollbackUnsupported {
        from: String,
        to: String,
        reason: String,
    },

    /// Nothing recorded for the document (or for the requested version)
    #[error("no version history for document {document_id}{}", .version.as_deref().map(|v| format!(" at version {v}")).unwrap_or_default())]
    HistoryNotFound {
        document_id: String,
        version: Option<String>,
    },

    /// The injected document source has no document for the id
    #[error("document not found: {document_id}")]
    DocumentNotFound { document_id: String },

    /// Invalid engine configuration or schema table
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl MigrationError {
    /// Check if the error was raised before any transformation ran
    ///
    /// Such failures leave the caller's document untouched.
    #[inline]
    #[must_use]
    pub fn is_pre_mutation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion { .. }
                | Self::NoMigrationPath { .. }
                | Self::AmbiguousPath { .. }
                | Self::HistoryNotFound { .. }
                | Self::DocumentNotFound { .. }
                | Self::RollbackUnsupported { .. }
                | Self::Config { .. }
        )
    }

    /// Check if retrying the same call could succeed
    ///
    /// Only a missing document may appear later; every other failure is a
    /// property of the document or the rule table.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DocumentNotFound { .. })
    }

    /// Stable machine-readable kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedVersion { .. } => "unsupported_version",
            Self::NoMigrationPath { .. } => "no_migration_path",
            Self::AmbiguousPath { .. } => "ambiguous_path",
            Self::TransformFailure { .. } => "transform_failure",
            Self::ValidationFailure { .. } => "validation_failure",
            Self::RollbackUnsupported { .. } => "rollback_unsupported",
            Self::HistoryNotFound { .. } => "history_not_found",
            Self::DocumentNotFound { .. } => "document_not_found",
            Self::Config { .. } => "config",
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(version: impl Into<String>) -> Self {
        Self::UnsupportedVersion {
            version: version.into(),
        }
    }

    pub(crate) fn no_path(
        from: impl Into<String>,
        to: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::NoMigrationPath {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationFailure {
            version: version.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn rollback_unsupported(
        from: impl Into<String>,
        to: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::RollbackUnsupported {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by a rule's transformation
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Generic failure
    #[error("{0}")]
    Failed(String),

    /// Input document lacks something the transformation needs
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Document edit failed
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Rule declares no inverse
    #[error("transformation is not reversible")]
    NotReversible,
}
