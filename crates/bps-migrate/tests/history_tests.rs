use bps_migrate::{EngineConfig, MigrationOptions};
use bps_test_utils::{doc_v1_0, doc_v1_1, engine_with, test_engine};
use std::sync::Arc;

#[test]
fn test_history_is_bounded_fifo() {
    let (engine, _, _) = engine_with(EngineConfig::new().with_history_capacity(3));
    for version in ["1.0", "1.1", "2.0", "1.1"] {
        engine
            .append_history("acme", version, Vec::new(), "editor", None)
            .unwrap();
    }

    let history = engine.get_history("acme");
    let versions: Vec<&str> = history.iter().map(|e| e.version.as_str()).collect();
    assert_eq!(versions, vec!["1.1", "2.0", "1.1"]);
    assert_eq!(history[0].previous_version.as_ref().unwrap(), "1.0");
}

#[test]
fn test_identical_changes_share_checksum() {
    let (engine, _, _) = test_engine();
    let changes = engine.diff(&doc_v1_0(), &doc_v1_1());
    assert!(!changes.is_empty());

    let a = engine
        .append_history("a", "1.1", changes.clone(), "x", Some("1.0 -> 1.1"))
        .unwrap();
    let b = engine
        .append_history("b", "1.1", changes, "y", None)
        .unwrap();
    assert_eq!(a.checksum, b.checksum);
    assert_eq!(a.size, b.size);
    assert!(a.verify_checksum());
}

#[test]
fn test_diff_reports_tracked_paths() {
    let (engine, _, _) = test_engine();
    let changes = engine.diff(&doc_v1_0(), &doc_v1_1());
    let paths: Vec<String> = changes.iter().map(|c| c.path.to_string()).collect();
    assert_eq!(paths, vec!["version", "metadata.enhanced_tracking"]);
}

#[test]
fn test_get_history_version() {
    let (engine, _, _) = test_engine();
    let result = engine.migrate(&doc_v1_0(), "2.0", &MigrationOptions::new().for_document("acme"));
    assert!(result.success);

    let entry = engine.get_history_version("acme", "1.1").unwrap();
    assert_eq!(entry.migration_applied.as_deref(), Some("1.0 -> 1.1"));
    assert!(entry.rollback_available);
    assert!(engine.get_history_version("acme", "0.5").is_none());
}

#[test]
fn test_repeat_migration_of_stale_copy_records_its_source() {
    let (engine, _, _) = test_engine();
    let options = MigrationOptions::new().for_document("acme");
    assert!(engine.migrate(&doc_v1_0(), "1.1", &options).success);
    assert!(engine.migrate(&doc_v1_0(), "1.1", &options).success);

    let history = engine.get_history("acme");
    let versions: Vec<&str> = history.iter().map(|e| e.version.as_str()).collect();
    assert_eq!(versions, vec!["1.0", "1.1", "1.0", "1.1"]);

    let latest = history.last().unwrap();
    assert_eq!(latest.previous_version.as_ref().unwrap(), "1.0");
    assert_eq!(latest.migration_applied.as_deref(), Some("1.0 -> 1.1"));
    assert!(latest.rollback_available);
}

#[test]
fn test_concurrent_migrations_keep_per_document_order() {
    let (engine, _, _) = engine_with(EngineConfig::new().with_history_capacity(4));
    let engine = Arc::new(engine);

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for round in 0..10 {
                    let options = MigrationOptions::new().for_document("shared").by(format!("w{worker}"));
                    let result = engine.migrate(&doc_v1_0(), "1.1", &options);
                    assert!(result.success);
                    let own = MigrationOptions::new().for_document(format!("doc-{worker}-{round}"));
                    assert!(engine.migrate(&doc_v1_0(), "2.0", &own).success);
                }
            });
        }
    });

    let shared = engine.get_history("shared");
    assert_eq!(shared.len(), 4);
    for pair in shared.windows(2) {
        assert_eq!(pair[1].previous_version.as_ref(), Some(&pair[0].version));
    }
    for entry in shared.iter().filter(|e| e.version.as_str() == "1.1") {
        assert!(entry.rollback_available);
    }
    assert_eq!(engine.get_history("doc-3-9").len(), 3);
}
