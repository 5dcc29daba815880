//! Version detection
//!
//! [`VersionDetector`] runs an ordered list of [`DetectionStrategy`]s and
//! returns the first answer. The standard order is:
//!
//! 1. explicit `version` field, if registered
//! 2. `$schema` identifier matched against known schema URLs
//! 3. structural markers introduced by later versions
//! 4. the oldest registered version

use bps_core::{Document, FieldPath, SchemaVersion, VersionRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Debug;

/// One way of inferring a document's version
pub trait DetectionStrategy: Send + Sync + Debug {
    /// Version this strategy recognises, if any
    fn detect(&self, doc: &Document, versions: &VersionRegistry) -> Option<SchemaVersion>;

    /// Strategy name for diagnostics
    fn name(&self) -> &'static str;
}

/// Trusts the `version` field when it names a registered version
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitVersionField;

impl DetectionStrategy for ExplicitVersionField {
    fn detect(&self, doc: &Document, versions: &VersionRegistry) -> Option<SchemaVersion> {
        let declared = doc.version()?;
        versions.get_info(declared).map(|d| d.version.clone())
    }

    fn name(&self) -> &'static str {
        "explicit_version"
    }
}

static SCHEMA_VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    // `/v1.1/` style segment inside a schema URL
    Regex::new(r"(?:^|[/:])v(\d+(?:\.\d+)*)(?:[/#]|$)").expect("schema version pattern is valid")
});

/// Matches `$schema` against the registry's schema identifiers
///
/// Exact identifier matches win; otherwise a `/vX.Y/` segment in the URL is
/// extracted and looked up.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaIdentifierMatch;

impl DetectionStrategy for SchemaIdentifierMatch {
    fn detect(&self, doc: &Document, versions: &VersionRegistry) -> Option<SchemaVersion> {
        let identifier = doc.schema_identifier()?;
        if let Some(descriptor) = versions.by_schema_identifier(identifier) {
            return Some(descriptor.version.clone());
        }

        let captures = SCHEMA_VERSION_PATTERN.captures(identifier)?;
        let candidate = captures.get(1)?.as_str();
        versions.get_info(candidate).map(|d| d.version.clone())
    }

    fn name(&self) -> &'static str {
        "schema_identifier"
    }
}

/// Field whose presence implies a minimum version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralMarker {
    /// Field introduced by a migration
    pub path: FieldPath,
    /// Version that introduced it
    pub version: SchemaVersion,
}

impl StructuralMarker {
    /// Create marker
    #[inline]
    #[must_use]
    pub fn new(path: FieldPath, version: SchemaVersion) -> Self {
        Self { path, version }
    }
}

/// Looks for fields that only later versions carry
///
/// Markers are checked newest version first.
#[derive(Debug, Clone, Default)]
pub struct StructuralMarkers {
    markers: Vec<StructuralMarker>,
}

impl StructuralMarkers {
    /// Create strategy; markers are reordered newest version first
    #[must_use]
    pub fn new(mut markers: Vec<StructuralMarker>) -> Self {
        markers.sort_by(|a, b| b.version.compare(&a.version));
        Self { markers }
    }
}

impl DetectionStrategy for StructuralMarkers {
    fn detect(&self, doc: &Document, versions: &VersionRegistry) -> Option<SchemaVersion> {
        self.markers
            .iter()
            .filter(|m| versions.is_supported(m.version.as_str()))
            .find(|m| doc.contains(&m.path))
            .map(|m| m.version.clone())
    }

    fn name(&self) -> &'static str {
        "structural_markers"
    }
}

/// Always answers with the oldest registered version
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestVersionFallback;

impl DetectionStrategy for OldestVersionFallback {
    fn detect(&self, _doc: &Document, versions: &VersionRegistry) -> Option<SchemaVersion> {
        Some(versions.oldest().clone())
    }

    fn name(&self) -> &'static str {
        "oldest_fallback"
    }
}

/// Detected version plus the strategy that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub version: SchemaVersion,
    pub strategy: &'static str,
}

/// Ordered strategy list over a version registry
#[derive(Debug)]
pub struct VersionDetector {
    versions: VersionRegistry,
    strategies: Vec<Box<dyn DetectionStrategy>>,
}

impl VersionDetector {
    /// Detector with a custom strategy order
    #[must_use]
    pub fn new(versions: VersionRegistry, strategies: Vec<Box<dyn DetectionStrategy>>) -> Self {
        Self {
            versions,
            strategies,
        }
    }

    /// Detector with the standard four-step order
    #[must_use]
    pub fn standard(versions: VersionRegistry, markers: Vec<StructuralMarker>) -> Self {
        Self::new(
            versions,
            vec![
                Box::new(ExplicitVersionField),
                Box::new(SchemaIdentifierMatch),
                Box::new(StructuralMarkers::new(markers)),
                Box::new(OldestVersionFallback),
            ],
        )
    }

    /// Detect the document's version
    #[must_use]
    pub fn detect(&self, doc: &Document) -> SchemaVersion {
        self.detect_with_source(doc).version
    }

    /// Detect the version and report which strategy matched
    #[must_use]
    pub fn detect_with_source(&self, doc: &Document) -> Detection {
        for strategy in &self.strategies {
            if let Some(version) = strategy.detect(doc, &self.versions) {
                tracing::trace!(strategy = strategy.name(), %version, "version detected");
                return Detection {
                    version,
                    strategy: strategy.name(),
                };
            }
        }

        Detection {
            version: self.versions.oldest().clone(),
            strategy: OldestVersionFallback.name(),
        }
    }

    /// Strategy names in evaluation order
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bps_core::VersionDescriptor;
    use chrono::NaiveDate;
    use serde_json::json;

    fn v(s: &str) -> SchemaVersion {
        SchemaVersion::parse(s).unwrap()
    }

    fn registry() -> VersionRegistry {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        VersionRegistry::new(
            ["1.0", "1.1", "2.0"]
                .into_iter()
                .map(|ver| {
                    VersionDescriptor::new(
                        v(ver),
                        format!("https://schemas.test/v{ver}/profile.json"),
                        date,
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn markers() -> Vec<StructuralMarker> {
        vec![
            StructuralMarker::new("metadata.enhanced_tracking".parse().unwrap(), v("1.1")),
            StructuralMarker::new("ai_configuration".parse().unwrap(), v("2.0")),
        ]
    }

    fn detector() -> VersionDetector {
        VersionDetector::standard(registry(), markers())
    }

    #[test]
    fn explicit_field_wins() {
        let doc = Document::new(json!({"version": "1.0", "ai_configuration": {}}));
        let detection = detector().detect_with_source(&doc);
        assert_eq!(detection.version, "1.0");
        assert_eq!(detection.strategy, "explicit_version");
    }

    #[test]
    fn unregistered_version_falls_through() {
        let doc = Document::new(json!({
            "version": "9.9",
            "$schema": "https://schemas.test/v1.1/profile.json"
        }));
        let detection = detector().detect_with_source(&doc);
        assert_eq!(detection.version, "1.1");
        assert_eq!(detection.strategy, "schema_identifier");
    }

    #[test]
    fn schema_pattern_extracts_version() {
        let doc = Document::new(json!({"$schema": "https://elsewhere.test/brand/v2.0/schema"}));
        let found = SchemaIdentifierMatch.detect(&doc, &registry());
        assert_eq!(found, Some(v("2.0")));
    }

    #[test]
    fn schema_pattern_ignores_unknown_versions() {
        let doc = Document::new(json!({"$schema": "https://elsewhere.test/brand/v7.0/schema"}));
        assert_eq!(SchemaIdentifierMatch.detect(&doc, &registry()), None);
    }

    #[test]
    fn markers_prefer_newest_version() {
        let doc = Document::new(json!({
            "metadata": {"enhanced_tracking": {}},
            "ai_configuration": {}
        }));
        let detection = detector().detect_with_source(&doc);
        assert_eq!(detection.version, "2.0");
        assert_eq!(detection.strategy, "structural_markers");
    }

    #[test]
    fn bare_document_falls_back_to_oldest() {
        let doc = Document::new(json!({"brand": {"name": "Acme"}}));
        let detection = detector().detect_with_source(&doc);
        assert_eq!(detection.version, "1.0");
        assert_eq!(detection.strategy, "oldest_fallback");
    }

    #[test]
    fn strategy_order_is_explicit() {
        assert_eq!(
            detector().strategy_names(),
            vec![
                "explicit_version",
                "schema_identifier",
                "structural_markers",
                "oldest_fallback"
            ]
        );
    }

    #[test]
    fn custom_order_changes_precedence() {
        let detector = VersionDetector::new(
            registry(),
            vec![
                Box::new(StructuralMarkers::new(markers())),
                Box::new(ExplicitVersionField),
            ],
        );
        let doc = Document::new(json!({"version": "1.0", "ai_configuration": {}}));
        assert_eq!(detector.detect(&doc), "2.0");
    }
}
