//! Immutable schema tables
//!
//! A [`SchemaRegistry`] bundles everything the engine treats as static:
//! registered versions, the rule table, detector markers and the sections
//! the diff tracks. It is built once, validated, and shared by reference.

use crate::detector::{StructuralMarker, VersionDetector};
use crate::diff::{DiffGenerator, TrackedSection};
use crate::error::MigrationError;
use crate::rule::{MigrationRule, MigrationRuleSet};
use bps_core::{VersionDescriptor, VersionRegistry};
use std::cmp::Ordering;
use std::sync::Arc;

/// Versions, rules, markers and tracked sections
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    versions: VersionRegistry,
    rules: Arc<MigrationRuleSet>,
    markers: Vec<StructuralMarker>,
    sections: Vec<TrackedSection>,
}

impl SchemaRegistry {
    /// Start a new table
    #[inline]
    #[must_use]
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Registered versions
    #[inline]
    #[must_use]
    pub fn versions(&self) -> &VersionRegistry {
        &self.versions
    }

    /// Rule table
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &Arc<MigrationRuleSet> {
        &self.rules
    }

    /// Structural markers
    #[inline]
    #[must_use]
    pub fn markers(&self) -> &[StructuralMarker] {
        &self.markers
    }

    /// Diff sections
    #[inline]
    #[must_use]
    pub fn tracked_sections(&self) -> &[TrackedSection] {
        &self.sections
    }

    /// Detector with the standard strategy order over this table
    #[must_use]
    pub fn detector(&self) -> VersionDetector {
        VersionDetector::standard(self.versions.clone(), self.markers.clone())
    }

    /// Diff generator over the tracked sections
    #[must_use]
    pub fn diff_generator(&self) -> DiffGenerator {
        DiffGenerator::new(self.sections.clone())
    }
}

/// Builder for [`SchemaRegistry`]
#[derive(Debug)]
pub struct SchemaRegistryBuilder {
    versions: Vec<VersionDescriptor>,
    rules: Vec<MigrationRule>,
    markers: Vec<StructuralMarker>,
    sections: Vec<TrackedSection>,
    strict: bool,
}

impl Default for SchemaRegistryBuilder {
    fn default() -> Self {
        Self {
            versions: Vec::new(),
            rules: Vec::new(),
            markers: Vec::new(),
            sections: Vec::new(),
            strict: true,
        }
    }
}

impl SchemaRegistryBuilder {
    /// Register a version
    #[must_use]
    pub fn version(mut self, descriptor: VersionDescriptor) -> Self {
        self.versions.push(descriptor);
        self
    }

    /// Register a rule
    #[must_use]
    pub fn rule(mut self, rule: MigrationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Register a structural marker
    #[must_use]
    pub fn marker(mut self, marker: StructuralMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Track a diff section
    #[must_use]
    pub fn track(mut self, section: TrackedSection) -> Self {
        self.sections.push(section);
        self
    }

    /// Reject tables where a version has more than one outgoing rule
    #[inline]
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validate and freeze the table
    ///
    /// # Errors
    /// - [`MigrationError::Config`] if the version table is empty or has
    ///   duplicates, a rule or marker names an unregistered version, or a
    ///   rule does not move forward
    /// - [`MigrationError::AmbiguousPath`] in strict mode if two rules
    ///   leave the same version
    pub fn build(self) -> Result<SchemaRegistry, MigrationError> {
        let versions =
            VersionRegistry::new(self.versions).map_err(|e| MigrationError::config(e.to_string()))?;

        for rule in &self.rules {
            for end in [rule.from_version(), rule.to_version()] {
                if !versions.is_supported(end.as_str()) {
                    return Err(MigrationError::config(format!(
                        "rule {} references unregistered version {end}",
                        rule.label()
                    )));
                }
            }
            if rule.from_version().compare(rule.to_version()) != Ordering::Less {
                return Err(MigrationError::config(format!(
                    "rule {} does not move to a newer version",
                    rule.label()
                )));
            }
        }

        if let Some(marker) = self
            .markers
            .iter()
            .find(|m| !versions.is_supported(m.version.as_str()))
        {
            return Err(MigrationError::config(format!(
                "marker {} references unregistered version {}",
                marker.path, marker.version
            )));
        }

        let rules = MigrationRuleSet::new(self.rules);
        if self.strict {
            rules.check_chain()?;
        }

        tracing::debug!(
            versions = versions.len(),
            rules = rules.len(),
            current = %versions.current(),
            "schema registry built"
        );

        Ok(SchemaRegistry {
            versions,
            rules: Arc::new(rules),
            markers: self.markers,
            sections: self.sections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::FnTransformation;
    use bps_core::{Document, FieldPath, SchemaVersion};
    use chrono::NaiveDate;

    fn v(s: &str) -> SchemaVersion {
        SchemaVersion::parse(s).unwrap()
    }

    fn descriptor(version: &str) -> VersionDescriptor {
        VersionDescriptor::new(
            v(version),
            format!("urn:test:{version}"),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    fn rule(from: &str, to: &str) -> MigrationRule {
        MigrationRule::new(
            v(from),
            v(to),
            FnTransformation::new("noop", |doc: &Document| Ok(doc.clone()), |_| true),
        )
    }

    fn base() -> SchemaRegistryBuilder {
        SchemaRegistry::builder()
            .version(descriptor("1.0"))
            .version(descriptor("1.1"))
            .version(descriptor("2.0"))
    }

    #[test]
    fn builds_valid_table() {
        let registry = base()
            .rule(rule("1.0", "1.1"))
            .rule(rule("1.1", "2.0"))
            .marker(StructuralMarker::new(FieldPath::single("extra"), v("1.1")))
            .track(TrackedSection::new("brand"))
            .build()
            .unwrap();
        assert_eq!(registry.versions().current(), "2.0");
        assert_eq!(registry.rules().len(), 2);
        assert_eq!(registry.markers().len(), 1);
        assert_eq!(registry.tracked_sections().len(), 1);
    }

    #[test]
    fn rejects_empty_versions() {
        let err = SchemaRegistry::builder().build().unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn rejects_unregistered_rule_version() {
        let err = base().rule(rule("2.0", "3.0")).build().unwrap_err();
        assert!(err.to_string().contains("unregistered version 3.0"));
    }

    #[test]
    fn rejects_backward_rule() {
        let err = base().rule(rule("2.0", "1.0")).build().unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn rejects_unregistered_marker() {
        let err = base()
            .marker(StructuralMarker::new(FieldPath::single("x"), v("9.0")))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn strict_mode_rejects_ambiguity() {
        let err = base()
            .rule(rule("1.0", "1.1"))
            .rule(rule("1.0", "2.0"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MigrationError::AmbiguousPath {
                version: "1.0".into(),
                count: 2
            }
        );
    }

    #[test]
    fn lenient_mode_keeps_ambiguity() {
        let registry = base()
            .rule(rule("1.0", "1.1"))
            .rule(rule("1.0", "2.0"))
            .strict(false)
            .build()
            .unwrap();
        assert_eq!(registry.rules().outgoing("1.0").len(), 2);
    }
}
