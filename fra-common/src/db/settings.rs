//! Settings database access
//!
//! Read/write settings from the settings table (key-value store).
//! All settings are global/system-wide.

use crate::error::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// Get the score cache time-to-live in seconds
pub async fn get_dss_cache_ttl_secs(db: &Pool<Sqlite>) -> Result<u64> {
    match get_setting::<u64>(db, "dss_cache_ttl_secs").await? {
        Some(ttl) => Ok(ttl),
        None => {
            // Default TTL is 5 minutes
            set_setting(db, "dss_cache_ttl_secs", 300u64).await?;
            Ok(300)
        }
    }
}

/// Get the external scorer timeout in seconds
pub async fn get_dss_scorer_timeout_secs(db: &Pool<Sqlite>) -> Result<u64> {
    match get_setting::<u64>(db, "dss_scorer_timeout_secs").await? {
        Some(timeout) => Ok(timeout),
        None => {
            // Default timeout is 30 minutes
            set_setting(db, "dss_scorer_timeout_secs", 1800u64).await?;
            Ok(1800)
        }
    }
}

/// Generic setting getter
///
/// Returns None if key doesn't exist in database.
/// Parses value from string using FromStr trait.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter
///
/// Inserts or updates setting in database.
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        crate::db::init::create_settings_table(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn get_missing_setting_returns_none() {
        let pool = setup_test_db().await;
        let value: Option<i64> = get_setting(&pool, "nonexistent").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let pool = setup_test_db().await;
        set_setting(&pool, "dss_cache_ttl_secs", 120u64).await.unwrap();

        let value: Option<u64> = get_setting(&pool, "dss_cache_ttl_secs").await.unwrap();
        assert_eq!(value, Some(120));

        // Overwrite via upsert
        set_setting(&pool, "dss_cache_ttl_secs", 60u64).await.unwrap();
        let value: Option<u64> = get_setting(&pool, "dss_cache_ttl_secs").await.unwrap();
        assert_eq!(value, Some(60));
    }

    #[tokio::test]
    async fn unparseable_setting_is_config_error() {
        let pool = setup_test_db().await;
        set_setting(&pool, "dss_cache_ttl_secs", "not-a-number").await.unwrap();

        let result: Result<Option<u64>> = get_setting(&pool, "dss_cache_ttl_secs").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn typed_getters_write_back_defaults() {
        let pool = setup_test_db().await;

        assert_eq!(get_dss_cache_ttl_secs(&pool).await.unwrap(), 300);
        assert_eq!(get_dss_scorer_timeout_secs(&pool).await.unwrap(), 1800);

        // Defaults are now persisted
        let ttl: Option<u64> = get_setting(&pool, "dss_cache_ttl_secs").await.unwrap();
        assert_eq!(ttl, Some(300));

        set_setting(&pool, "dss_cache_ttl_secs", 30u64).await.unwrap();
        assert_eq!(get_dss_cache_ttl_secs(&pool).await.unwrap(), 30);
    }
}
