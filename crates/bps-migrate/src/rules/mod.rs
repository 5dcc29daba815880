//! Built-in schema tables
//!
//! - [`brand_profile`]: the brand profile versions 1.0, 1.1 and 2.0

use bps_core::{Document, FieldPath, SCHEMA_FIELD};
use serde_json::Value;

mod brand_profile;

pub use brand_profile::{
    brand_profile, brand_profile_builder, schema_identifier, AddEnhancedTracking,
    AdoptPersonaModel, RemoveEnhancedTracking,
};

/// Insert every key of `defaults` missing from `target`, recursing into objects
///
/// Values already present in `target` are kept.
pub(crate) fn fill_defaults(target: &mut Value, defaults: &Value) {
    let (Value::Object(target), Value::Object(defaults)) = (target, defaults) else {
        return;
    };
    for (key, default) in defaults {
        match target.get_mut(key) {
            Some(existing) => fill_defaults(existing, default),
            None => {
                target.insert(key.clone(), default.clone());
            }
        }
    }
}

/// Point `$schema` at `identifier` if the document carries one
pub(crate) fn rewrite_schema(doc: &mut Document, identifier: String) -> Result<(), bps_core::DocumentError> {
    let path = FieldPath::single(SCHEMA_FIELD);
    if doc.contains(&path) {
        doc.set(&path, Value::String(identifier))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fill_defaults_keeps_existing_values() {
        let mut target = json!({"a": 5, "nested": {"x": "kept"}});
        fill_defaults(&mut target, &json!({"a": 0, "b": [], "nested": {"x": "", "y": null}}));
        assert_eq!(target, json!({"a": 5, "b": [], "nested": {"x": "kept", "y": null}}));
    }

    #[test]
    fn rewrite_schema_only_when_present() {
        let mut bare = Document::new(json!({"version": "1.0"}));
        rewrite_schema(&mut bare, "urn:x".into()).unwrap();
        assert!(bare.as_value().get("$schema").is_none());

        let mut tagged = Document::new(json!({"$schema": "urn:old"}));
        rewrite_schema(&mut tagged, "urn:new".into()).unwrap();
        assert_eq!(tagged.as_value()["$schema"], "urn:new");
    }
}
