//! Tests for database initialization
//!
//! Covers automatic database creation, default settings, and idempotent
//! re-initialization.

use fra_common::db::init::init_database;
use std::path::PathBuf;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let test_db = format!("/tmp/fra-test-db-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    // Ensure database doesn't exist
    let _ = std::fs::remove_file(&db_path);

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");

    // Cleanup
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let test_db = format!("/tmp/fra-test-db-existing-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    // Create database first time
    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    // Open database second time (should succeed)
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    // Cleanup
    drop(pool1);
    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_expected_tables_created() {
    let test_db = format!("/tmp/fra-test-db-tables-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    for table in ["claims", "claim_audit", "scheme_scores", "settings"] {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(exists, 1, "Table '{}' not created", table);
    }

    // Cleanup
    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let test_db = format!("/tmp/fra-test-db-settings-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let test_cases = vec![
        ("db_busy_timeout_ms", "5000"),
        ("dss_cache_ttl_secs", "300"),
        ("dss_scorer_timeout_secs", "1800"),
    ];

    for (key, expected_value) in test_cases {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&pool)
            .await
            .unwrap();

        assert!(value.is_some(), "Setting '{}' not initialized", key);
        assert_eq!(
            value.unwrap(),
            expected_value,
            "Setting '{}' has wrong default value",
            key
        );
    }

    // Cleanup
    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_idempotent_initialization() {
    let test_db = format!("/tmp/fra-test-db-idempotent-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    // Initialize database first time
    let pool1 = init_database(&db_path).await.unwrap();

    let count1: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
        .fetch_one(&pool1)
        .await
        .unwrap();

    drop(pool1);

    // Initialize database second time (should not error)
    let pool2 = init_database(&db_path).await.unwrap();

    let count2: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
        .fetch_one(&pool2)
        .await
        .unwrap();

    assert_eq!(count1, count2, "Settings count changed on second initialization");

    // Cleanup
    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_null_setting_reset_to_default() {
    let test_db = format!("/tmp/fra-test-db-null-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    // Manually set a setting to NULL
    sqlx::query("UPDATE settings SET value = NULL WHERE key = 'dss_cache_ttl_secs'")
        .execute(&pool)
        .await
        .unwrap();

    drop(pool);

    // Re-initialize database (should reset NULL to default)
    let pool2 = init_database(&db_path).await.unwrap();

    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'dss_cache_ttl_secs'")
            .fetch_one(&pool2)
            .await
            .unwrap();

    assert_eq!(value.as_deref(), Some("300"), "NULL value was not reset to default");

    // Cleanup
    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_foreign_keys_enabled() {
    let test_db = format!("/tmp/fra-test-db-fk-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let fk_enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(fk_enabled, 1, "Foreign keys should be enabled");

    // Cleanup
    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_identity_uniqueness_enforced_on_real_database() {
    let test_db = format!("/tmp/fra-test-db-identity-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    sqlx::query("INSERT INTO claims (claim_id, claimant_name, aadhaar_no) VALUES ('a', 'Ram Lal', '123456789012')")
        .execute(&pool)
        .await
        .unwrap();

    // Second row with the same identity number must be rejected
    let duplicate = sqlx::query(
        "INSERT INTO claims (claim_id, claimant_name, aadhaar_no) VALUES ('b', 'Other', '123456789012')",
    )
    .execute(&pool)
    .await;
    assert!(duplicate.is_err(), "Duplicate identity number was accepted");

    // Rows without an identity number are not constrained
    sqlx::query("INSERT INTO claims (claim_id, claimant_name) VALUES ('c', 'One')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO claims (claim_id, claimant_name) VALUES ('d', 'Two')")
        .execute(&pool)
        .await
        .unwrap();

    // Cleanup
    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_concurrent_initialization() {
    let test_db = format!("/tmp/fra-test-db-concurrent-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    // Spawn multiple concurrent initialization tasks
    let mut handles = vec![];

    for _ in 0..5 {
        let db_path_clone = db_path.clone();
        let handle = tokio::spawn(async move { init_database(&db_path_clone).await });
        handles.push(handle);
    }

    let mut results = vec![];
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    for result in &results {
        assert!(result.is_ok(), "Concurrent initialization failed: {:?}", result);
    }

    // Verify database is in consistent state
    let pool = results[0].as_ref().unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
        .fetch_one(pool)
        .await
        .unwrap();

    assert_eq!(count, 3, "Settings not properly initialized after concurrent access");

    // Cleanup
    for result in results {
        drop(result);
    }
    let _ = std::fs::remove_file(&db_path);
}
