//! Testing utilities for the brand profile schema workspace
//!
//! Shared fixtures, collaborator doubles and tracing setup.

#![allow(missing_docs)]

use bps_core::Document;
use bps_migrate::rules::schema_identifier;
use bps_migrate::{CacheInvalidator, DocumentSource, EngineConfig, SchemaEngine};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

/// A complete 1.0 brand profile
pub fn doc_v1_0() -> Document {
    Document::new(json!({
        "$schema": schema_identifier("1.0"),
        "version": "1.0",
        "brand": {
            "name": "Acme Outdoors",
            "tagline": "Gear for every trail",
            "industry": "retail"
        },
        "voice_and_tone": {
            "tone": "adventurous",
            "formality": "casual",
            "keywords": ["explore", "durable"]
        },
        "target_audience": {
            "primary": "hikers",
            "age_range": "25-44"
        },
        "content_guidelines": {
            "max_hashtags": 3,
            "avoid": ["jargon"]
        },
        "metadata": {
            "created_by": "onboarding",
            "segment": "outdoor"
        }
    }))
}

/// A 1.0 profile with only the version and an empty metadata section
pub fn doc_minimal_v1_0() -> Document {
    Document::new(json!({
        "version": "1.0",
        "metadata": {}
    }))
}

/// [`doc_v1_0`] as it looks after the 1.0 -> 1.1 rule
pub fn doc_v1_1() -> Document {
    let mut value = doc_v1_0().into_value();
    value["$schema"] = json!(schema_identifier("1.1"));
    value["version"] = json!("1.1");
    value["metadata"]["enhanced_tracking"] = json!({
        "usage_analytics": {
            "content_generated": 0,
            "last_generated_at": null,
            "platforms_used": []
        },
        "quality_history": []
    });
    Document::new(value)
}

/// [`doc_v1_1`] as it looks after the 1.1 -> 2.0 rule
pub fn doc_v2_0() -> Document {
    let mut value = doc_v1_1().into_value();
    value["$schema"] = json!(schema_identifier("2.0"));
    value["version"] = json!("2.0");
    value["voice_and_tone"] = json!({
        "keywords": ["explore", "durable"],
        "persona": {
            "primary_tone": "adventurous",
            "secondary_tones": [],
            "formality": "casual"
        }
    });
    value["ai_configuration"] = json!({
        "model_preferences": {},
        "generation_settings": {
            "temperature": 0.7,
            "max_length": 2000
        },
        "content_filters": []
    });
    Document::new(value)
}

/// Cache invalidator that remembers every call
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingInvalidator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Tag lists in call order
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl CacheInvalidator for RecordingInvalidator {
    fn invalidate_by_tags(&self, tags: &[String]) -> usize {
        self.calls.lock().push(tags.to_vec());
        tags.len()
    }
}

/// Document source backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryDocuments {
    docs: DashMap<String, Document>,
}

impl InMemoryDocuments {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, document_id: &str, doc: Document) {
        self.docs.insert(document_id.to_string(), doc);
    }

    pub fn get(&self, document_id: &str) -> Option<Document> {
        self.docs.get(document_id).map(|doc| doc.clone())
    }
}

impl DocumentSource for InMemoryDocuments {
    fn load(&self, document_id: &str) -> Option<Document> {
        self.get(document_id)
    }
}

/// Brand profile engine wired to recording collaborators
pub fn engine_with(
    config: EngineConfig,
) -> (SchemaEngine, Arc<RecordingInvalidator>, Arc<InMemoryDocuments>) {
    let invalidator = RecordingInvalidator::new();
    let documents = InMemoryDocuments::new();
    let engine = SchemaEngine::builder()
        .config(config)
        .invalidator(invalidator.clone())
        .document_source(documents.clone())
        .build()
        .unwrap();
    (engine, invalidator, documents)
}

/// [`engine_with`] using the default configuration
pub fn test_engine() -> (SchemaEngine, Arc<RecordingInvalidator>, Arc<InMemoryDocuments>) {
    engine_with(EngineConfig::default())
}

/// Route `tracing` output to the test writer, honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
