//! Registry of supported schema versions
//!
//! Provides [`VersionRegistry`], an immutable table of [`VersionDescriptor`]s
//! built once at startup. Lookups never fail loudly: an unknown version is
//! reported as `None` / `false`.

use crate::version::{compare_versions, SchemaVersion, VersionError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Descriptor of one supported schema version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    /// Dotted version string
    pub version: SchemaVersion,
    /// Schema URL documents at this version may declare in `$schema`
    pub schema_identifier: String,
    /// Release date of the version
    pub release_date: NaiveDate,
    /// Whether moving to this version drops or restructures data
    pub breaking: bool,
    /// Whether documents at the previous version must be migrated
    pub migration_required: bool,
    /// Deprecation notice, if deprecated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    /// Date after which the version is no longer supported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_ends_at: Option<NaiveDate>,
}

impl VersionDescriptor {
    /// Create a non-breaking descriptor
    #[must_use]
    pub fn new(
        version: SchemaVersion,
        schema_identifier: impl Into<String>,
        release_date: NaiveDate,
    ) -> Self {
        Self {
            version,
            schema_identifier: schema_identifier.into(),
            release_date,
            breaking: false,
            migration_required: false,
            deprecated: None,
            support_ends_at: None,
        }
    }

    /// Mark as breaking
    #[inline]
    #[must_use]
    pub fn breaking(mut self) -> Self {
        self.breaking = true;
        self
    }

    /// Mark as requiring migration
    #[inline]
    #[must_use]
    pub fn migration_required(mut self) -> Self {
        self.migration_required = true;
        self
    }

    /// Mark as deprecated
    #[inline]
    #[must_use]
    pub fn deprecated(mut self, notice: impl Into<String>) -> Self {
        self.deprecated = Some(notice.into());
        self
    }

    /// Set end of support
    #[inline]
    #[must_use]
    pub fn support_ends_at(mut self, date: NaiveDate) -> Self {
        self.support_ends_at = Some(date);
        self
    }

    /// Check if deprecated
    #[inline]
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.deprecated.is_some()
    }
}

/// Immutable table of supported versions, ordered oldest first
#[derive(Debug, Clone)]
pub struct VersionRegistry {
    descriptors: Vec<VersionDescriptor>,
}

impl VersionRegistry {
    /// Build registry from descriptors
    ///
    /// # Errors
    /// Returns error if the table is empty or lists a version twice
    pub fn new(mut descriptors: Vec<VersionDescriptor>) -> Result<Self, VersionError> {
        if descriptors.is_empty() {
            return Err(VersionError::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.version.as_str().to_string()) {
                return Err(VersionError::DuplicateVersion(descriptor.version.to_string()));
            }
        }

        descriptors.sort_by(|a, b| compare_versions(a.version.as_str(), b.version.as_str()));
        Ok(Self { descriptors })
    }

    /// Check if version is registered
    #[inline]
    #[must_use]
    pub fn is_supported(&self, version: &str) -> bool {
        self.get_info(version).is_some()
    }

    /// Descriptor for a version
    #[must_use]
    pub fn get_info(&self, version: &str) -> Option<&VersionDescriptor> {
        self.descriptors.iter().find(|d| d.version == version)
    }

    /// All descriptors, oldest first
    #[inline]
    #[must_use]
    pub fn list(&self) -> &[VersionDescriptor] {
        &self.descriptors
    }

    /// Newest registered version
    #[must_use]
    pub fn current(&self) -> &SchemaVersion {
        // non-empty by construction
        &self.descriptors[self.descriptors.len() - 1].version
    }

    /// Oldest registered version
    #[must_use]
    pub fn oldest(&self) -> &SchemaVersion {
        &self.descriptors[0].version
    }

    /// Descriptor whose schema identifier equals `identifier`
    #[must_use]
    pub fn by_schema_identifier(&self, identifier: &str) -> Option<&VersionDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.schema_identifier == identifier)
    }

    /// Number of registered versions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Always false; kept for API symmetry with collections
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
