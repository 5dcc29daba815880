//! Field-path change sets between document snapshots
//!
//! [`DiffGenerator`] only reports paths it is told to track: the `version`
//! field, each tracked top-level section, and one level into the section's
//! known nested groups. Anything else is ignored, which keeps the output
//! bounded and stable across runs.

use bps_core::{Document, FieldPath, VERSION_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Kind of change at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Path absent before, present after
    Addition,
    /// Path present on both sides with different values
    Modification,
    /// Path present before, absent after
    Removal,
}

impl ChangeType {
    /// Lowercase name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Modification => "modification",
            Self::Removal => "removal",
        }
    }
}

/// One reported change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionChange {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub path: FieldPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    pub description: String,
}

impl VersionChange {
    /// Classify a before/after pair, `None` if nothing changed
    #[must_use]
    pub fn between(path: FieldPath, old: Option<&Value>, new: Option<&Value>) -> Option<Self> {
        let (change_type, description) = match (old, new) {
            (None, None) => return None,
            (Some(a), Some(b)) if a == b => return None,
            (None, Some(_)) => (ChangeType::Addition, format!("Added {path}")),
            (Some(_), None) => (ChangeType::Removal, format!("Removed {path}")),
            (Some(_), Some(_)) => (ChangeType::Modification, format!("Modified {path}")),
        };
        Some(Self {
            change_type,
            path,
            old_value: old.cloned(),
            new_value: new.cloned(),
            description,
        })
    }

    /// Override the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// JSON form used for checksums and history size
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), Value::String(self.change_type.as_str().into()));
        map.insert("path".into(), Value::String(self.path.to_string()));
        if let Some(old) = &self.old_value {
            map.insert("old_value".into(), old.clone());
        }
        if let Some(new) = &self.new_value {
            map.insert("new_value".into(), new.clone());
        }
        map.insert("description".into(), Value::String(self.description.clone()));
        Value::Object(map)
    }
}

/// JSON array form of a change set
#[must_use]
pub fn changes_to_value(changes: &[VersionChange]) -> Value {
    Value::Array(changes.iter().map(VersionChange::to_value).collect())
}

/// A top-level section compared by the diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSection {
    pub name: String,
    /// Keys inside the section compared field by field
    #[serde(default)]
    pub nested: Vec<String>,
}

impl TrackedSection {
    /// Track a section with no nested groups
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nested: Vec::new(),
        }
    }

    /// Add a nested group
    #[must_use]
    pub fn with_nested(mut self, group: impl Into<String>) -> Self {
        self.nested.push(group.into());
        self
    }

    fn is_nested(&self, key: &str) -> bool {
        self.nested.iter().any(|group| group == key)
    }
}

/// Structured diff over tracked paths
#[derive(Debug, Clone, Default)]
pub struct DiffGenerator {
    sections: Vec<TrackedSection>,
}

impl DiffGenerator {
    /// Create generator tracking `sections`
    #[inline]
    #[must_use]
    pub fn new(sections: Vec<TrackedSection>) -> Self {
        Self { sections }
    }

    /// Add a tracked section
    #[must_use]
    pub fn track(mut self, section: TrackedSection) -> Self {
        self.sections.push(section);
        self
    }

    /// Tracked sections in report order
    #[inline]
    #[must_use]
    pub fn sections(&self) -> &[TrackedSection] {
        &self.sections
    }

    /// Changes from `old` to `new`
    ///
    /// The version change (if any) comes first, then sections in tracking
    /// order with keys in sorted order.
    #[must_use]
    pub fn diff(&self, old: &Document, new: &Document) -> Vec<VersionChange> {
        let mut changes = Vec::new();

        let version_path = FieldPath::single(VERSION_FIELD);
        if let Some(change) =
            VersionChange::between(version_path.clone(), old.get(&version_path), new.get(&version_path))
        {
            let description = format!(
                "Version changed from {} to {}",
                old.version().unwrap_or("none"),
                new.version().unwrap_or("none")
            );
            changes.push(change.with_description(description));
        }

        for section in &self.sections {
            let path = FieldPath::single(section.name.as_str());
            match (old.get(&path), new.get(&path)) {
                (Some(Value::Object(a)), Some(Value::Object(b))) => {
                    diff_section(section, &path, a, b, &mut changes);
                }
                (a, b) => {
                    if let Some(change) = VersionChange::between(path.clone(), a, b) {
                        let description = match change.change_type {
                            ChangeType::Addition => format!("Added section {path}"),
                            ChangeType::Removal => format!("Removed section {path}"),
                            ChangeType::Modification => format!("Replaced section {path}"),
                        };
                        changes.push(change.with_description(description));
                    }
                }
            }
        }

        changes
    }
}

fn diff_section(
    section: &TrackedSection,
    path: &FieldPath,
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    changes: &mut Vec<VersionChange>,
) {
    for key in sorted_keys(old, new) {
        let field = path.child(key);
        let (a, b) = (old.get(key), new.get(key));

        if section.is_nested(key) {
            if let (Some(Value::Object(a)), Some(Value::Object(b))) = (a, b) {
                for inner in sorted_keys(a, b) {
                    changes.extend(VersionChange::between(
                        field.child(inner),
                        a.get(inner),
                        b.get(inner),
                    ));
                }
                continue;
            }
            if let Some(change) = VersionChange::between(field.clone(), a, b) {
                let description = match change.change_type {
                    ChangeType::Addition => format!("Introduced {field}"),
                    ChangeType::Removal => format!("Dropped {field}"),
                    ChangeType::Modification => format!("Replaced {field}"),
                };
                changes.push(change.with_description(description));
            }
            continue;
        }

        changes.extend(VersionChange::between(field, a, b));
    }
}

fn sorted_keys<'a>(a: &'a Map<String, Value>, b: &'a Map<String, Value>) -> BTreeSet<&'a str> {
    a.keys().chain(b.keys()).map(String::as_str).collect()
}
