//! Migration path resolution
//!
//! [`PathResolver`] walks the rule table forward from a source version,
//! taking the single rule that leaves the current frontier at each hop.

use crate::error::MigrationError;
use crate::rule::{Complexity, MigrationRule, MigrationRuleSet};
use bps_core::compare_versions;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Default traversal cap
pub const DEFAULT_MAX_HOPS: usize = 10;

/// Forward walker over a rule table
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    rules: &'a MigrationRuleSet,
    max_hops: usize,
}

impl<'a> PathResolver<'a> {
    /// Create resolver with the default hop cap
    #[inline]
    #[must_use]
    pub fn new(rules: &'a MigrationRuleSet) -> Self {
        Self {
            rules,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Override the hop cap
    #[inline]
    #[must_use]
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Ordered rule chain from `from` to `to`
    ///
    /// Returns an empty chain when `from == to`. Versions are matched by
    /// their exact spelling, so `2` does not reach a rule targeting `2.0`.
    ///
    /// # Errors
    /// - [`MigrationError::NoMigrationPath`] if the walk dead-ends, overshoots
    ///   `to`, reaches `to` under another spelling or exceeds the hop cap
    /// - [`MigrationError::AmbiguousPath`] if two rules leave the same version
    pub fn resolve(&self, from: &str, to: &str) -> Result<Vec<Arc<MigrationRule>>, MigrationError> {
        let mut path = Vec::new();
        let mut frontier = from.to_string();

        while frontier != to {
            if path.len() >= self.max_hops {
                return Err(MigrationError::no_path(
                    from,
                    to,
                    format!("exceeded maximum of {} hops", self.max_hops),
                ));
            }

            match compare_versions(&frontier, to) {
                Ordering::Greater => {
                    return Err(MigrationError::no_path(
                        from,
                        to,
                        format!("walk passed target at {frontier}; use rollback to move backwards"),
                    ))
                }
                Ordering::Equal => {
                    return Err(MigrationError::no_path(
                        from,
                        to,
                        format!("reached {frontier}, which is spelled differently from {to}"),
                    ))
                }
                Ordering::Less => {}
            }

            let outgoing = self.rules.outgoing(&frontier);
            let rule = match outgoing.as_slice() {
                [] => {
                    return Err(MigrationError::no_path(
                        from,
                        to,
                        format!("no rule starts at {frontier}"),
                    ))
                }
                [rule] => Arc::clone(rule),
                many => {
                    return Err(MigrationError::AmbiguousPath {
                        version: frontier,
                        count: many.len(),
                    })
                }
            };

            frontier = rule.to_version().as_str().to_string();
            path.push(rule);
        }

        Ok(path)
    }
}

/// Serializable summary of one hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub from: String,
    pub to: String,
    pub description: String,
    pub complexity: Complexity,
    pub estimated_time_per_record: Duration,
    pub reversible: bool,
}

impl From<&MigrationRule> for PathStep {
    fn from(rule: &MigrationRule) -> Self {
        Self {
            from: rule.from_version().to_string(),
            to: rule.to_version().to_string(),
            description: rule.description().to_string(),
            complexity: rule.performance().complexity,
            estimated_time_per_record: rule.performance().estimated_time_per_record,
            reversible: rule.has_inverse(),
        }
    }
}
