//! Versioned documents
//!
//! [`Document`] wraps an arbitrary JSON value. The engine only relies on the
//! top-level `version` field; everything else is reached through
//! [`FieldPath`]s that migration rules name explicitly.

use crate::path::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the version field every document carries
pub const VERSION_FIELD: &str = "version";

/// Name of the optional schema identifier field
pub const SCHEMA_FIELD: &str = "$schema";

/// An opaque structured record with a `version` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    /// Wrap a JSON value
    #[inline]
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying value
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the underlying value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Declared `version` field, if it is a string
    #[inline]
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.0.get(VERSION_FIELD).and_then(Value::as_str)
    }

    /// Declared `$schema` field, if it is a string
    #[inline]
    #[must_use]
    pub fn schema_identifier(&self) -> Option<&str> {
        self.0.get(SCHEMA_FIELD).and_then(Value::as_str)
    }

    /// Overwrite the `version` field
    ///
    /// # Errors
    /// Returns error if the document root is not an object
    pub fn set_version(&mut self, version: &str) -> Result<(), DocumentError> {
        self.set(&FieldPath::single(VERSION_FIELD), Value::String(version.to_string()))
    }

    /// Value at `path`
    #[must_use]
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        path.iter().try_fold(&self.0, |node, segment| node.get(segment))
    }

    /// Check if a value exists at `path`
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.get(path).is_some()
    }

    /// Set `value` at `path`, creating intermediate objects
    ///
    /// # Errors
    /// Returns error if the root or an intermediate node is a non-object value
    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), DocumentError> {
        let Some((last, parents)) = path.segments().split_last() else {
            self.0 = value;
            return Ok(());
        };

        let mut node = &mut self.0;
        let mut walked = FieldPath::root();
        for segment in parents {
            let map = node
                .as_object_mut()
                .ok_or_else(|| DocumentError::NotAnObject(walked.clone()))?;
            node = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            walked = walked.child(segment.clone());
        }

        let map = node
            .as_object_mut()
            .ok_or(DocumentError::NotAnObject(walked))?;
        map.insert(last.clone(), value);
        Ok(())
    }

    /// Remove and return the value at `path`
    pub fn remove(&mut self, path: &FieldPath) -> Option<Value> {
        let (last, parents) = path.segments().split_last()?;
        let parent = parents
            .iter()
            .try_fold(&mut self.0, |node, segment| node.get_mut(segment))?;
        parent.as_object_mut()?.remove(last)
    }

    /// Size in bytes of the compact JSON encoding
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(&self.0).map_or(0, |bytes| bytes.len())
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.0
    }
}

/// Errors raised while editing a document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// A node on the path is not an object
    #[error("value at '{0}' is not an object")]
    NotAnObject(FieldPath),
}
