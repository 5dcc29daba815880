//! Engine configuration

use crate::error::MigrationError;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::resolver::DEFAULT_MAX_HOPS;
use serde::{Deserialize, Serialize};

/// Engine configuration
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// history_capacity = 25
/// cache_tag_prefix = "brand-profile:"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// History entries kept per document
    pub history_capacity: usize,
    /// Path resolution hop cap
    pub max_path_hops: usize,
    /// Reject rule tables where a version has several outgoing rules
    pub strict_rules: bool,
    /// Author recorded when none is given
    pub default_author: String,
    /// Prefix applied to document ids when building cache tags
    pub cache_tag_prefix: String,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML and validate
    ///
    /// # Errors
    /// Returns [`MigrationError::Config`] if the text is not valid TOML for
    /// this struct or fails [`validate`](Self::validate)
    pub fn from_toml_str(raw: &str) -> Result<Self, MigrationError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| MigrationError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`MigrationError::Config`] if a capacity or hop cap is zero
    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.history_capacity == 0 {
            return Err(MigrationError::config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_path_hops == 0 {
            return Err(MigrationError::config(
                "max_path_hops must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// With history capacity
    #[inline]
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// With hop cap
    #[inline]
    #[must_use]
    pub fn with_max_path_hops(mut self, hops: usize) -> Self {
        self.max_path_hops = hops;
        self
    }

    /// With strict rule checking
    #[inline]
    #[must_use]
    pub fn with_strict_rules(mut self, strict: bool) -> Self {
        self.strict_rules = strict;
        self
    }

    /// With default author
    #[inline]
    #[must_use]
    pub fn with_default_author(mut self, author: impl Into<String>) -> Self {
        self.default_author = author.into();
        self
    }

    /// With cache tag prefix
    #[inline]
    #[must_use]
    pub fn with_cache_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_tag_prefix = prefix.into();
        self
    }

    /// Invalidation tags for a document
    #[must_use]
    pub fn cache_tags(&self, document_id: &str) -> Vec<String> {
        vec![format!("{}{document_id}", self.cache_tag_prefix)]
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_path_hops: DEFAULT_MAX_HOPS,
            strict_rules: true,
            default_author: "system".to_string(),
            cache_tag_prefix: String::new(),
        }
    }
}
