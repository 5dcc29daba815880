use bps_migrate::{MigrationError, MigrationOptions};
use bps_test_utils::{doc_minimal_v1_0, doc_v1_0, doc_v1_1, test_engine};
use bps_core::Document;
use serde_json::json;
use pretty_assertions::assert_eq;

#[test]
fn test_round_trip_restores_snapshot() {
    let (engine, invalidator, documents) = test_engine();
    let original = doc_v1_0();

    let forward = engine.migrate(&original, "1.1", &MigrationOptions::new().for_document("acme"));
    assert!(forward.success);
    documents.insert("acme", forward.document.unwrap());

    let back = engine.rollback("acme", "1.0");
    assert!(back.success, "{:?}", back.errors);
    let restored = back.document.unwrap();
    assert_eq!(engine.detect_version(&restored), "1.0");
    assert_eq!(restored, original);
    assert_eq!(invalidator.call_count(), 2);

    let history = engine.get_history("acme");
    let versions: Vec<&str> = history.iter().map(|e| e.version.as_str()).collect();
    assert_eq!(versions, vec!["1.0", "1.1", "1.0"]);
    assert_eq!(history[2].previous_version.as_ref().unwrap(), "1.1");
    assert!(!history[2].rollback_available);
}

#[test]
fn test_round_trip_keeps_empty_metadata() {
    let (engine, _, documents) = test_engine();
    let original = doc_minimal_v1_0();

    let forward = engine.migrate(&original, "1.1", &MigrationOptions::new().for_document("minimal"));
    assert!(forward.success);
    documents.insert("minimal", forward.document.unwrap());

    let back = engine.rollback("minimal", "1.0");
    assert!(back.success, "{:?}", back.errors);
    let restored = back.document.unwrap();
    assert_eq!(restored, original);
    assert!(engine.diff(&original, &restored).is_empty());
}

#[test]
fn test_round_trip_without_metadata() {
    let (engine, _, documents) = test_engine();
    let original = Document::new(json!({"version": "1.0", "brand": {"name": "Acme"}}));

    let forward = engine.migrate(&original, "1.1", &MigrationOptions::new().for_document("bare"));
    assert!(forward.success);
    documents.insert("bare", forward.document.unwrap());

    let back = engine.rollback("bare", "1.0");
    assert!(back.success, "{:?}", back.errors);
    assert_eq!(back.document.unwrap(), original);
}

#[test]
fn test_rollback_across_irreversible_rule_is_unsupported() {
    let (engine, invalidator, documents) = test_engine();
    let forward = engine.migrate(&doc_v1_0(), "2.0", &MigrationOptions::new().for_document("acme"));
    assert!(forward.success);
    let stored = forward.document.unwrap();
    documents.insert("acme", stored.clone());
    let history_before = engine.get_history("acme").len();

    let result = engine.rollback("acme", "1.0");

    assert!(!result.success);
    assert!(matches!(
        result.first_error(),
        Some(MigrationError::RollbackUnsupported { .. })
    ));
    assert_eq!(documents.get("acme").unwrap(), stored);
    assert_eq!(result.document.unwrap(), stored);
    assert_eq!(engine.get_history("acme").len(), history_before);
    assert_eq!(invalidator.call_count(), 1);
}

#[test]
fn test_rollback_without_history() {
    let (engine, _, documents) = test_engine();
    documents.insert("acme", doc_v1_1());

    let result = engine.rollback("acme", "1.0");
    assert_eq!(
        result.first_error(),
        Some(&MigrationError::HistoryNotFound {
            document_id: "acme".into(),
            version: None,
        })
    );
}

#[test]
fn test_rollback_without_stored_document() {
    let (engine, _, _) = test_engine();
    let forward = engine.migrate(&doc_v1_0(), "1.1", &MigrationOptions::new().for_document("acme"));
    assert!(forward.success);

    let result = engine.rollback("acme", "1.0");
    assert!(!result.success);
    assert!(result.first_error().unwrap().is_retryable());
}
