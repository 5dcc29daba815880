//! Schema version identifiers and ordering
//!
//! [`SchemaVersion`] is the dotted version string stored in a document's
//! `version` field. Ordering is numeric per segment, see [`compare_versions`].

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Dotted schema version, e.g. `"1.1"` or `"2.0"`
///
/// Equality and hashing are on the exact string, so `"1.0"` and `"1.0.0"`
/// are distinct registry keys even though [`SchemaVersion::compare`]
/// orders them as equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(String);

impl SchemaVersion {
    /// Create a version from a dotted string
    ///
    /// # Errors
    /// Returns error if the string is empty or has an empty segment
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(VersionError::Empty);
        }
        if raw.split('.').any(str::is_empty) {
            return Err(VersionError::Malformed(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Version from a literal in a built-in table, not validated
    #[inline]
    #[must_use]
    pub fn from_static(raw: &'static str) -> Self {
        Self(raw.to_string())
    }

    /// Version string as stored in documents
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric segments, non-numeric segments read as zero
    #[must_use]
    pub fn segments(&self) -> SmallVec<[u64; 4]> {
        numeric_segments(&self.0)
    }

    /// Compare against another version
    #[inline]
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        compare_versions(&self.0, &other.0)
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SchemaVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for SchemaVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SchemaVersion {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SchemaVersion {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

fn numeric_segments(raw: &str) -> SmallVec<[u64; 4]> {
    raw.split('.')
        .map(|seg| seg.trim().parse::<u64>().unwrap_or(0))
        .collect()
}

/// Order two dotted version strings
///
/// Segments are compared numerically left to right; a missing trailing
/// segment counts as `0`, so `"2"`, `"2.0"` and `"2.0.0"` are equal.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = numeric_segments(a);
    let right = numeric_segments(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Errors related to version strings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Empty version string
    #[error("version string is empty")]
    Empty,

    /// Empty segment such as `"1..0"`
    #[error("malformed version: {0}")]
    Malformed(String),

    /// Version registry built without descriptors
    #[error("version registry must contain at least one version")]
    EmptyRegistry,

    /// Same version registered twice
    #[error("version registered twice: {0}")]
    DuplicateVersion(String),
}
