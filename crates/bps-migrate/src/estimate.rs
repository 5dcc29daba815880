//! Migration cost estimation

use crate::error::MigrationError;
use crate::resolver::PathResolver;
use crate::rule::{Complexity, MigrationRule};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Estimated cost of migrating a batch along a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PerformanceEstimate {
    /// Sum of per-record estimates times the record count
    pub estimated_time: Duration,
    /// Highest complexity on the path
    pub complexity: Complexity,
    /// Number of rules on the path
    pub steps: usize,
}

/// Sums per-rule cost estimates along resolved paths
#[derive(Debug, Clone, Copy)]
pub struct PerformanceEstimator<'a> {
    resolver: PathResolver<'a>,
}

impl<'a> PerformanceEstimator<'a> {
    /// Create estimator over a resolver
    #[inline]
    #[must_use]
    pub fn new(resolver: PathResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Estimate migrating `record_count` documents from `from` to `to`
    ///
    /// # Errors
    /// Returns the resolver's error if no unambiguous path exists
    pub fn estimate(
        &self,
        from: &str,
        to: &str,
        record_count: u32,
    ) -> Result<PerformanceEstimate, MigrationError> {
        let path = self.resolver.resolve(from, to)?;
        Ok(estimate_path(&path, record_count))
    }
}

/// Estimate for an already resolved path
#[must_use]
pub fn estimate_path(path: &[Arc<MigrationRule>], record_count: u32) -> PerformanceEstimate {
    let estimated_time = path
        .iter()
        .map(|rule| {
            rule.performance()
                .estimated_time_per_record
                .saturating_mul(record_count)
        })
        .fold(Duration::ZERO, Duration::saturating_add);

    let complexity = path
        .iter()
        .map(|rule| rule.performance().complexity)
        .max()
        .unwrap_or_default();

    PerformanceEstimate {
        estimated_time,
        complexity,
        steps: path.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{FnTransformation, MigrationRuleSet, PerformanceProfile};
    use bps_core::{Document, SchemaVersion};

    fn rule(from: &str, to: &str, millis: u64, complexity: Complexity) -> MigrationRule {
        MigrationRule::new(
            SchemaVersion::parse(from).unwrap(),
            SchemaVersion::parse(to).unwrap(),
            FnTransformation::new("noop", |doc: &Document| Ok(doc.clone()), |_| true),
        )
        .with_performance(PerformanceProfile::from_millis(millis, complexity))
    }

    fn rules() -> MigrationRuleSet {
        MigrationRuleSet::new(vec![
            rule("1.0", "1.1", 1, Complexity::Low),
            rule("1.1", "2.0", 5, Complexity::High),
            rule("2.0", "2.1", 2, Complexity::Medium),
        ])
    }

    #[test]
    fn estimate_sums_per_record_cost() {
        let rules = rules();
        let estimator = PerformanceEstimator::new(PathResolver::new(&rules));
        let estimate = estimator.estimate("1.0", "2.0", 100).unwrap();
        assert_eq!(estimate.estimated_time, Duration::from_millis(600));
        assert_eq!(estimate.complexity, Complexity::High);
        assert_eq!(estimate.steps, 2);
    }

    #[test]
    fn estimate_takes_max_complexity() {
        let rules = rules();
        let estimator = PerformanceEstimator::new(PathResolver::new(&rules));
        let estimate = estimator.estimate("2.0", "2.1", 1).unwrap();
        assert_eq!(estimate.complexity, Complexity::Medium);
    }

    #[test]
    fn estimate_empty_path() {
        let estimate = estimate_path(&[], 10);
        assert_eq!(estimate.estimated_time, Duration::ZERO);
        assert_eq!(estimate.complexity, Complexity::Low);
        assert_eq!(estimate.steps, 0);
    }

    #[test]
    fn estimate_propagates_path_errors() {
        let rules = rules();
        let estimator = PerformanceEstimator::new(PathResolver::new(&rules));
        assert!(matches!(
            estimator.estimate("1.0", "9.0", 1),
            Err(MigrationError::NoMigrationPath { .. })
        ));
    }
}
