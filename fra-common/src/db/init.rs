//! Database initialization
//!
//! Creates the schema on first run and is safe to call again on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    // Pool sized for concurrent reconciliation writers plus sync imports
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows concurrent readers with one writer, which matters while a
    // score import runs alongside reconciliation traffic
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    // Initial busy timeout; re-applied from the settings table below once it exists
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    // Schema creation (idempotent - safe to call multiple times)
    create_claims_table(&pool).await?;
    create_claim_audit_table(&pool).await?;
    create_scheme_scores_table(&pool).await?;
    create_settings_table(&pool).await?;

    init_default_settings(&pool).await?;

    // Apply configurable busy timeout from settings
    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'db_busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(5000);

    let pragma_sql = format!("PRAGMA busy_timeout = {}", timeout_ms);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    info!("Database busy timeout set to {} ms", timeout_ms);

    Ok(pool)
}

/// Create the claims table
///
/// One row per claimant record after reconciliation. `aadhaar_no` is empty
/// (never NULL) when the identity number is absent, so uniqueness is enforced
/// through a partial index that skips empty values.
pub async fn create_claims_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS claims (
            claim_id TEXT PRIMARY KEY,
            claimant_name TEXT NOT NULL DEFAULT '',
            spouse_name TEXT NOT NULL DEFAULT '',
            age INTEGER,
            gender TEXT NOT NULL DEFAULT '',
            aadhaar_no TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            village TEXT NOT NULL DEFAULT '',
            gram_panchayat TEXT NOT NULL DEFAULT '',
            block_tehsil TEXT NOT NULL DEFAULT '',
            district TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL DEFAULT '',
            claim_type TEXT NOT NULL DEFAULT '',
            land_claimed TEXT NOT NULL DEFAULT '',
            land_use TEXT NOT NULL DEFAULT '',
            annual_income REAL,
            tax_payer INTEGER,
            boundary_description TEXT NOT NULL DEFAULT '',
            geo_coordinates TEXT NOT NULL DEFAULT '',
            status_of_claim TEXT NOT NULL DEFAULT '',
            date_of_submission TEXT,
            date_of_decision TEXT,
            patta_title_no TEXT NOT NULL DEFAULT '',
            water_body TEXT NOT NULL DEFAULT '',
            irrigation_source TEXT NOT NULL DEFAULT '',
            infrastructure_present TEXT NOT NULL DEFAULT '',
            claim_status TEXT NOT NULL DEFAULT 'pending'
                CHECK (claim_status IN ('pending', 'approved', 'rejected', 'processing_error')),
            update_count INTEGER NOT NULL DEFAULT 0,
            last_update_source TEXT NOT NULL DEFAULT '',
            submitted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (age IS NULL OR age >= 0),
            CHECK (annual_income IS NULL OR annual_income >= 0.0),
            CHECK (tax_payer IS NULL OR tax_payer IN (0, 1)),
            CHECK (update_count >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Identity numbers are unique only when present; empty means unknown
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_claims_aadhaar ON claims(aadhaar_no) WHERE aadhaar_no <> ''",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_claims_village ON claims(village)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_claims_district ON claims(district)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_claims_status ON claims(claim_status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the claim_audit table
///
/// Append-only trail of merges that changed stored fields. Each row keeps
/// full before and after claim snapshots as JSON, so reviewers can see how
/// a record reached its current shape without replaying uploads.
pub async fn create_claim_audit_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS claim_audit (
            audit_id TEXT PRIMARY KEY,
            claim_id TEXT NOT NULL REFERENCES claims(claim_id) ON DELETE CASCADE,
            old_data TEXT NOT NULL,
            new_data TEXT NOT NULL,
            changed_fields TEXT NOT NULL,
            update_source TEXT NOT NULL DEFAULT '',
            updated_by TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_claim_audit_claim_id ON claim_audit(claim_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_claim_audit_created_at ON claim_audit(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the scheme_scores table
///
/// Serving copy of the batch scorer output, one row per claim. The location
/// and demographic columns are denormalized so list queries never join back
/// to claims.
pub async fn create_scheme_scores_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scheme_scores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            claim_id TEXT UNIQUE NOT NULL,
            claimant_name TEXT,
            age REAL,
            gender TEXT,
            state TEXT,
            district TEXT,
            block_tehsil TEXT,
            gram_panchayat TEXT,
            village TEXT,
            category TEXT,
            tax_payer TEXT,
            claim_type TEXT,
            status_of_claim TEXT,
            annual_income REAL,
            jal_jeevan_mission_priority REAL NOT NULL DEFAULT 0,
            dajgua_priority REAL NOT NULL DEFAULT 0,
            mgnrega_priority REAL NOT NULL DEFAULT 0,
            pm_kisan_priority REAL NOT NULL DEFAULT 0,
            pmay_priority REAL NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scheme_scores_claim_id ON scheme_scores(claim_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scheme_scores_state ON scheme_scores(state)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scheme_scores_district ON scheme_scores(district)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scheme_scores_village ON scheme_scores(village)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values, and resets
/// NULL values back to their defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Database settings
    ensure_setting(pool, "db_busy_timeout_ms", "5000").await?;

    // Decision-support sync settings
    ensure_setting(pool, "dss_cache_ttl_secs", "300").await?;
    ensure_setting(pool, "dss_scorer_timeout_secs", "1800").await?; // 30 minutes

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    // Check if setting exists
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // Setting doesn't exist - create it
        // INSERT OR IGNORE handles concurrent initialization races where
        // multiple tasks pass the exists check simultaneously
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!(
            "Initialized setting '{}' with default value: {}",
            key, default_value
        );
        return Ok(());
    }

    // Check if value is NULL
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        // Value is NULL - reset to default
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}
