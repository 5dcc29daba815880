//! Brand profile schema, versions 1.0 through 2.0
//!
//! - `1.0 -> 1.1` adds usage tracking under `metadata.enhanced_tracking`
//!   and can be undone.
//! - `1.1 -> 2.0` folds the flat tone fields into a persona and adds
//!   `ai_configuration`. It has no inverse.

use super::{fill_defaults, rewrite_schema};
use crate::detector::StructuralMarker;
use crate::diff::TrackedSection;
use crate::error::{MigrationError, TransformError};
use crate::registry::{SchemaRegistry, SchemaRegistryBuilder};
use crate::rule::{Complexity, MigrationRule, PerformanceProfile, Transformation};
use bps_core::{Document, FieldPath, SchemaVersion, VersionDescriptor};
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

const V1_0: &str = "1.0";
const V1_1: &str = "1.1";
const V2_0: &str = "2.0";

/// Set inside the tracking block when the forward rule created `metadata`
const METADATA_CREATED: &str = "metadata_created";

/// Schema URL for a brand profile version
#[must_use]
pub fn schema_identifier(version: &str) -> String {
    format!("https://schemas.brandprofile.dev/v{version}/brand-profile.json")
}

fn path(segments: &[&str]) -> FieldPath {
    FieldPath::from(segments)
}

fn version(raw: &'static str) -> SchemaVersion {
    SchemaVersion::from_static(raw)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn is_object_at(doc: &Document, at: &FieldPath) -> bool {
    doc.get(at).is_some_and(Value::is_object)
}

/// Adds `metadata.enhanced_tracking`
#[derive(Debug, Clone, Copy, Default)]
pub struct AddEnhancedTracking;

impl Transformation for AddEnhancedTracking {
    fn apply(&self, doc: &Document) -> Result<Document, TransformError> {
        let tracking = path(&["metadata", "enhanced_tracking"]);
        let defaults = json!({
            "usage_analytics": {
                "content_generated": 0,
                "last_generated_at": null,
                "platforms_used": []
            },
            "quality_history": []
        });

        let mut merged = match doc.get(&tracking) {
            None => defaults,
            Some(existing @ Value::Object(_)) => {
                let mut merged = existing.clone();
                fill_defaults(&mut merged, &defaults);
                merged
            }
            Some(_) => {
                return Err(TransformError::InvalidInput(format!(
                    "{tracking} is not an object"
                )))
            }
        };

        if doc.get(&path(&["metadata"])).is_none() {
            if let Value::Object(block) = &mut merged {
                block.insert(METADATA_CREATED.to_string(), Value::Bool(true));
            }
        }

        let mut out = doc.clone();
        out.set(&tracking, merged)?;
        out.set_version(V1_1)?;
        rewrite_schema(&mut out, schema_identifier(V1_1))?;
        Ok(out)
    }

    fn validate(&self, doc: &Document) -> bool {
        doc.version() == Some(V1_1)
            && is_object_at(doc, &path(&["metadata", "enhanced_tracking", "usage_analytics"]))
    }

    fn describe(&self) -> String {
        "Add enhanced usage tracking to metadata".to_string()
    }
}

/// Removes `metadata.enhanced_tracking`, undoing [`AddEnhancedTracking`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveEnhancedTracking;

impl Transformation for RemoveEnhancedTracking {
    fn apply(&self, doc: &Document) -> Result<Document, TransformError> {
        let mut out = doc.clone();
        let removed = out.remove(&path(&["metadata", "enhanced_tracking"]));
        let created_metadata = removed
            .as_ref()
            .and_then(|block| block.get(METADATA_CREATED))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let metadata = path(&["metadata"]);
        if created_metadata
            && out
                .get(&metadata)
                .and_then(Value::as_object)
                .is_some_and(Map::is_empty)
        {
            out.remove(&metadata);
        }

        out.set_version(V1_0)?;
        rewrite_schema(&mut out, schema_identifier(V1_0))?;
        Ok(out)
    }

    fn validate(&self, doc: &Document) -> bool {
        doc.version() == Some(V1_0) && !doc.contains(&path(&["metadata", "enhanced_tracking"]))
    }

    fn describe(&self) -> String {
        "Remove enhanced usage tracking from metadata".to_string()
    }
}

/// Moves tone fields into `voice_and_tone.persona` and adds `ai_configuration`
#[derive(Debug, Clone, Copy, Default)]
pub struct AdoptPersonaModel;

impl AdoptPersonaModel {
    const DEFAULT_TONE: &'static str = "professional";
    const DEFAULT_FORMALITY: &'static str = "neutral";
}

impl Transformation for AdoptPersonaModel {
    fn apply(&self, doc: &Document) -> Result<Document, TransformError> {
        let mut voice = match doc.get(&path(&["voice_and_tone"])) {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(TransformError::InvalidInput(
                    "voice_and_tone is not an object".to_string(),
                ))
            }
        };

        let tone = voice
            .remove("tone")
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| Value::String(Self::DEFAULT_TONE.to_string()));
        let formality = voice
            .remove("formality")
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| Value::String(Self::DEFAULT_FORMALITY.to_string()));

        let mut persona = voice
            .remove("persona")
            .filter(Value::is_object)
            .unwrap_or_else(|| Value::Object(Map::new()));
        fill_defaults(
            &mut persona,
            &json!({
                "primary_tone": tone,
                "secondary_tones": [],
                "formality": formality
            }),
        );
        voice.insert("persona".to_string(), persona);

        let ai_config = path(&["ai_configuration"]);
        let mut ai = match doc.get(&ai_config) {
            None => Value::Object(Map::new()),
            Some(existing @ Value::Object(_)) => existing.clone(),
            Some(_) => {
                return Err(TransformError::InvalidInput(
                    "ai_configuration is not an object".to_string(),
                ))
            }
        };
        fill_defaults(
            &mut ai,
            &json!({
                "model_preferences": {},
                "generation_settings": {
                    "temperature": 0.7,
                    "max_length": 2000
                },
                "content_filters": []
            }),
        );

        let mut out = doc.clone();
        out.set(&path(&["voice_and_tone"]), Value::Object(voice))?;
        out.set(&ai_config, ai)?;
        out.set_version(V2_0)?;
        rewrite_schema(&mut out, schema_identifier(V2_0))?;
        Ok(out)
    }

    fn validate(&self, doc: &Document) -> bool {
        doc.version() == Some(V2_0)
            && is_object_at(doc, &path(&["ai_configuration"]))
            && is_object_at(doc, &path(&["voice_and_tone", "persona"]))
    }

    fn describe(&self) -> String {
        "Restructure voice and tone into persona model, add AI configuration".to_string()
    }
}

/// Builder preloaded with the brand profile table
///
/// Callers may add further versions and rules before building.
#[must_use]
pub fn brand_profile_builder() -> SchemaRegistryBuilder {
    SchemaRegistry::builder()
        .version(
            VersionDescriptor::new(version(V1_0), schema_identifier(V1_0), date(2024, 1, 1))
                .deprecated("Version 1.0 is deprecated; migrate to 2.0")
                .support_ends_at(date(2025, 6, 1)),
        )
        .version(
            VersionDescriptor::new(version(V1_1), schema_identifier(V1_1), date(2024, 3, 15))
                .migration_required(),
        )
        .version(
            VersionDescriptor::new(version(V2_0), schema_identifier(V2_0), date(2024, 6, 1))
                .breaking()
                .migration_required(),
        )
        .rule(
            MigrationRule::new(version(V1_0), version(V1_1), AddEnhancedTracking)
                .with_inverse(RemoveEnhancedTracking)
                .with_performance(PerformanceProfile::from_millis(1, Complexity::Low)),
        )
        .rule(
            MigrationRule::new(version(V1_1), version(V2_0), AdoptPersonaModel)
                .with_performance(PerformanceProfile::from_millis(5, Complexity::High)),
        )
        .marker(StructuralMarker::new(path(&["ai_configuration"]), version(V2_0)))
        .marker(StructuralMarker::new(path(&["voice_and_tone", "persona"]), version(V2_0)))
        .marker(StructuralMarker::new(
            path(&["metadata", "enhanced_tracking"]),
            version(V1_1),
        ))
        .track(TrackedSection::new("brand"))
        .track(TrackedSection::new("voice_and_tone").with_nested("persona"))
        .track(TrackedSection::new("target_audience"))
        .track(TrackedSection::new("content_guidelines"))
        .track(TrackedSection::new("metadata").with_nested("enhanced_tracking"))
        .track(TrackedSection::new("ai_configuration").with_nested("generation_settings"))
}

/// The built-in brand profile table
///
/// # Errors
/// Returns the builder's validation error; the built-in table is valid
pub fn brand_profile() -> Result<SchemaRegistry, MigrationError> {
    brand_profile_builder().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v1_0() -> Document {
        Document::new(json!({
            "$schema": schema_identifier("1.0"),
            "version": "1.0",
            "brand": {"name": "Acme"},
            "voice_and_tone": {"tone": "friendly", "formality": "casual"},
            "metadata": {"owner": "marketing"}
        }))
    }

    #[test]
    fn add_tracking_fills_defaults() {
        let out = AddEnhancedTracking.apply(&v1_0()).unwrap();
        assert!(AddEnhancedTracking.validate(&out));
        assert_eq!(out.version(), Some("1.1"));
        assert_eq!(out.schema_identifier(), Some(schema_identifier("1.1").as_str()));
        assert_eq!(
            out.as_value()["metadata"]["enhanced_tracking"]["usage_analytics"]["content_generated"],
            json!(0)
        );
        assert_eq!(out.as_value()["metadata"]["owner"], "marketing");
    }

    #[test]
    fn add_tracking_preserves_existing_counts() {
        let mut doc = v1_0();
        doc.set(
            &path(&["metadata", "enhanced_tracking", "usage_analytics", "content_generated"]),
            json!(42),
        )
        .unwrap();
        let out = AddEnhancedTracking.apply(&doc).unwrap();
        let analytics = &out.as_value()["metadata"]["enhanced_tracking"]["usage_analytics"];
        assert_eq!(analytics["content_generated"], json!(42));
        assert_eq!(analytics["platforms_used"], json!([]));
    }

    #[test]
    fn add_tracking_rejects_scalar_tracking() {
        let mut doc = v1_0();
        doc.set(&path(&["metadata", "enhanced_tracking"]), json!("on")).unwrap();
        assert!(matches!(
            AddEnhancedTracking.apply(&doc),
            Err(TransformError::InvalidInput(_))
        ));
    }

    #[test]
    fn remove_tracking_undoes_add() {
        let original = v1_0();
        let forward = AddEnhancedTracking.apply(&original).unwrap();
        let back = RemoveEnhancedTracking.apply(&forward).unwrap();
        assert!(RemoveEnhancedTracking.validate(&back));
        assert_eq!(back, original);
    }

    #[test]
    fn remove_tracking_drops_metadata_it_created() {
        let original = Document::new(json!({"version": "1.0"}));
        let forward = AddEnhancedTracking.apply(&original).unwrap();
        assert_eq!(
            forward.as_value()["metadata"]["enhanced_tracking"][METADATA_CREATED],
            json!(true)
        );
        let back = RemoveEnhancedTracking.apply(&forward).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn remove_tracking_keeps_empty_metadata() {
        let original = Document::new(json!({"version": "1.0", "metadata": {}}));
        let forward = AddEnhancedTracking.apply(&original).unwrap();
        assert!(forward.as_value()["metadata"]["enhanced_tracking"]
            .get(METADATA_CREATED)
            .is_none());
        let back = RemoveEnhancedTracking.apply(&forward).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn persona_model_moves_tone_fields() {
        let v1_1 = AddEnhancedTracking.apply(&v1_0()).unwrap();
        let out = AdoptPersonaModel.apply(&v1_1).unwrap();
        assert!(AdoptPersonaModel.validate(&out));
        assert_eq!(
            out.as_value()["voice_and_tone"],
            json!({
                "persona": {
                    "primary_tone": "friendly",
                    "secondary_tones": [],
                    "formality": "casual"
                }
            })
        );
        assert_eq!(
            out.as_value()["ai_configuration"]["generation_settings"]["max_length"],
            json!(2000)
        );
        assert_eq!(out.version(), Some("2.0"));
    }

    #[test]
    fn persona_model_defaults_missing_tone() {
        let doc = Document::new(json!({"version": "1.1"}));
        let out = AdoptPersonaModel.apply(&doc).unwrap();
        let persona = &out.as_value()["voice_and_tone"]["persona"];
        assert_eq!(persona["primary_tone"], "professional");
        assert_eq!(persona["formality"], "neutral");
        assert!(out.schema_identifier().is_none());
    }

    #[test]
    fn built_in_table_is_valid() {
        let registry = brand_profile().unwrap();
        assert_eq!(registry.versions().current(), "2.0");
        assert_eq!(registry.versions().oldest(), "1.0");
        assert!(registry.versions().get_info("1.0").unwrap().is_deprecated());
        assert!(registry.versions().get_info("2.0").unwrap().breaking);
        assert!(registry.rules().find("1.0", "1.1").unwrap().has_inverse());
        assert!(!registry.rules().find("1.1", "2.0").unwrap().has_inverse());
    }
}
