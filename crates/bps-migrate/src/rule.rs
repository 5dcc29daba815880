//! Migration rules and the rule table
//!
//! A [`MigrationRule`] moves a document between two adjacent schema versions.
//! It exposes three capabilities: apply, validate and an optional invert.
//! [`MigrationRuleSet`] indexes rules by their source version.

use crate::error::{MigrationError, TransformError};
use bps_core::{Document, SchemaVersion};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// A pure document transformation with a postcondition check
///
/// Implementations must not perform I/O; the engine may call them from any
/// worker thread.
pub trait Transformation: Send + Sync + Debug {
    /// Produce the transformed document
    ///
    /// # Errors
    /// Returns error if the input cannot be transformed
    fn apply(&self, doc: &Document) -> Result<Document, TransformError>;

    /// Check the output of [`apply`](Self::apply)
    fn validate(&self, doc: &Document) -> bool;

    /// Describe the transformation
    fn describe(&self) -> String;
}

type ApplyFn = dyn Fn(&Document) -> Result<Document, TransformError> + Send + Sync;
type ValidateFn = dyn Fn(&Document) -> bool + Send + Sync;

/// Closure-backed [`Transformation`]
pub struct FnTransformation {
    description: String,
    apply: Box<ApplyFn>,
    validate: Box<ValidateFn>,
}

impl FnTransformation {
    /// Create from an apply and a validate closure
    pub fn new<A, V>(description: impl Into<String>, apply: A, validate: V) -> Self
    where
        A: Fn(&Document) -> Result<Document, TransformError> + Send + Sync + 'static,
        V: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            apply: Box::new(apply),
            validate: Box::new(validate),
        }
    }
}

impl Debug for FnTransformation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransformation")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Transformation for FnTransformation {
    fn apply(&self, doc: &Document) -> Result<Document, TransformError> {
        (self.apply)(doc)
    }

    fn validate(&self, doc: &Document) -> bool {
        (self.validate)(doc)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Relative cost class of a rule
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Additive field changes
    #[default]
    Low,
    /// Field moves within a section
    Medium,
    /// Structural rewrites
    High,
}

/// Cost estimate attached to a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerformanceProfile {
    /// Expected time to migrate one document
    pub estimated_time_per_record: Duration,
    /// Cost class
    pub complexity: Complexity,
}

impl PerformanceProfile {
    /// Create profile from per-record milliseconds
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64, complexity: Complexity) -> Self {
        Self {
            estimated_time_per_record: Duration::from_millis(millis),
            complexity,
        }
    }
}

/// Forward transformation between two adjacent versions
#[derive(Debug, Clone)]
pub struct MigrationRule {
    from: SchemaVersion,
    to: SchemaVersion,
    description: String,
    performance: PerformanceProfile,
    forward: Arc<dyn Transformation>,
    inverse: Option<Arc<dyn Transformation>>,
}

impl MigrationRule {
    /// Create rule without inverse
    pub fn new(
        from: SchemaVersion,
        to: SchemaVersion,
        forward: impl Transformation + 'static,
    ) -> Self {
        let description = forward.describe();
        Self {
            from,
            to,
            description,
            performance: PerformanceProfile::default(),
            forward: Arc::new(forward),
            inverse: None,
        }
    }

    /// Declare the inverse transformation
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Transformation + 'static) -> Self {
        self.inverse = Some(Arc::new(inverse));
        self
    }

    /// Override the description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach a cost estimate
    #[inline]
    #[must_use]
    pub fn with_performance(mut self, performance: PerformanceProfile) -> Self {
        self.performance = performance;
        self
    }

    /// Source version
    #[inline]
    #[must_use]
    pub fn from_version(&self) -> &SchemaVersion {
        &self.from
    }

    /// Target version
    #[inline]
    #[must_use]
    pub fn to_version(&self) -> &SchemaVersion {
        &self.to
    }

    /// Description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Cost estimate
    #[inline]
    #[must_use]
    pub fn performance(&self) -> &PerformanceProfile {
        &self.performance
    }

    /// `"from -> to"` label used in results and history
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }

    /// Run the forward transformation
    ///
    /// # Errors
    /// Returns error if the transformation fails
    pub fn apply(&self, doc: &Document) -> Result<Document, TransformError> {
        self.forward.apply(doc)
    }

    /// Check a forward output
    #[must_use]
    pub fn validate(&self, doc: &Document) -> bool {
        self.forward.validate(doc)
    }

    /// Check if the rule declares an inverse
    #[inline]
    #[must_use]
    pub fn has_inverse(&self) -> bool {
        self.inverse.is_some()
    }

    /// Run the inverse transformation
    ///
    /// # Errors
    /// Returns [`TransformError::NotReversible`] if no inverse is declared
    pub fn invert(&self, doc: &Document) -> Result<Document, TransformError> {
        self.inverse
            .as_ref()
            .ok_or(TransformError::NotReversible)?
            .apply(doc)
    }

    /// Check an inverse output
    #[must_use]
    pub fn validate_inverse(&self, doc: &Document) -> bool {
        self.inverse.as_ref().is_some_and(|inv| inv.validate(doc))
    }
}

/// Rule table keyed by source version
///
/// Duplicate source versions are stored as-is; [`check_chain`](Self::check_chain)
/// and the path resolver report them as ambiguous instead of picking one.
#[derive(Debug, Clone, Default)]
pub struct MigrationRuleSet {
    rules: Vec<Arc<MigrationRule>>,
    by_from: HashMap<String, Vec<usize>>,
}

impl MigrationRuleSet {
    /// Build table from rules, preserving registration order
    #[must_use]
    pub fn new(rules: Vec<MigrationRule>) -> Self {
        let mut set = Self::default();
        for rule in rules {
            set.insert(rule);
        }
        set
    }

    fn insert(&mut self, rule: MigrationRule) {
        let index = self.rules.len();
        self.by_from
            .entry(rule.from.as_str().to_string())
            .or_default()
            .push(index);
        self.rules.push(Arc::new(rule));
    }

    /// Rules leaving `version`
    #[must_use]
    pub fn outgoing(&self, version: &str) -> Vec<&Arc<MigrationRule>> {
        self.by_from
            .get(version)
            .map(|indices| indices.iter().map(|&i| &self.rules[i]).collect())
            .unwrap_or_default()
    }

    /// Rules arriving at `version`
    #[must_use]
    pub fn producing(&self, version: &str) -> Vec<&Arc<MigrationRule>> {
        self.rules.iter().filter(|r| r.to == version).collect()
    }

    /// Rule for an exact `from -> to` hop
    #[must_use]
    pub fn find(&self, from: &str, to: &str) -> Option<&Arc<MigrationRule>> {
        self.outgoing(from).into_iter().find(|r| r.to == to)
    }

    /// Verify every source version has at most one rule
    ///
    /// # Errors
    /// Returns [`MigrationError::AmbiguousPath`] for the first offending version
    pub fn check_chain(&self) -> Result<(), MigrationError> {
        let mut versions: Vec<_> = self.by_from.iter().collect();
        versions.sort_by(|a, b| a.0.cmp(b.0));
        match versions.into_iter().find(|(_, idx)| idx.len() > 1) {
            Some((version, idx)) => Err(MigrationError::AmbiguousPath {
                version: version.clone(),
                count: idx.len(),
            }),
            None => Ok(()),
        }
    }

    /// Iterate rules in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<MigrationRule>> {
        self.rules.iter()
    }

    /// Number of rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
