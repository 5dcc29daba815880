//! Outbound collaborator seams
//!
//! The engine owns no cache and no storage. Callers inject a
//! [`CacheInvalidator`] that receives tag invalidations after successful
//! writes and a [`DocumentSource`] that supplies the current document for
//! rollback.

use bps_core::Document;
use std::fmt::Debug;

/// Tag-based cache invalidation sink
pub trait CacheInvalidator: Send + Sync + Debug {
    /// Invalidate all entries carrying any of `tags`; returns how many were dropped
    fn invalidate_by_tags(&self, tags: &[String]) -> usize;
}

/// Invalidator that drops nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate_by_tags(&self, _tags: &[String]) -> usize {
        0
    }
}

/// Accessor for the current stored document of an id
pub trait DocumentSource: Send + Sync + Debug {
    /// Current document, or `None` if the id is unknown
    fn load(&self, document_id: &str) -> Option<Document>;
}

/// Source that knows no documents
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDocumentSource;

impl DocumentSource for NoDocumentSource {
    fn load(&self, _document_id: &str) -> Option<Document> {
        None
    }
}
