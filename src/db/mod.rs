//! SQLite connection pool, schema loading, and drift recovery.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Bundled schema, idempotent by construction.
pub const SCHEMA_SQL: &str = include_str!("../../db/schema.sql");

const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Create the SQLite pool, retrying lock contention with exponential backoff
/// (5 attempts, doubling from 100 ms) before surfacing a fatal error.
pub async fn create_pool(database_path: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(20));

    let mut delay = Duration::from_millis(100);
    for attempt in 1..=MAX_CONNECT_ATTEMPTS {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options.clone())
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e)
                if attempt < MAX_CONNECT_ATTEMPTS
                    && e.to_string().contains("database is locked") =>
            {
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64,
                    "Database is locked, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("loop returns on the final attempt")
}

/// In-memory pool for tests. A single connection keeps every query on the
/// same memory database.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
}

/// Detect schema drift: a store file that predates the `status` column (or is
/// not a bugtrackd store at all) is moved aside to `<db>.backup` so the
/// schema can be recreated from scratch.
pub async fn check_schema_drift(database_path: &str) -> anyhow::Result<()> {
    if !Path::new(database_path).exists() {
        return Ok(());
    }

    let options = SqliteConnectOptions::new().filename(database_path);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    let probe = sqlx::query("SELECT status FROM bugs LIMIT 1")
        .fetch_optional(&pool)
        .await;
    pool.close().await;

    if probe.is_err() {
        tracing::warn!(path = database_path, "Database schema is outdated, recreating store");
        let backup = format!("{database_path}.backup");
        let _ = std::fs::remove_file(&backup);
        std::fs::rename(database_path, &backup)?;
    }
    Ok(())
}

/// Apply the bundled schema, then the optional incremental fixes file when it
/// exists on disk.
pub async fn init_schema(pool: &SqlitePool, fixes_path: &str) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    if let Ok(fixes) = std::fs::read_to_string(fixes_path) {
        tracing::info!(path = fixes_path, "Applying schema fixes");
        sqlx::raw_sql(&fixes).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_applies_to_memory_pool() {
        let pool = create_memory_pool().await.unwrap();
        init_schema(&pool, "does/not/exist.sql").await.unwrap();

        // Seed user and tags are present.
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);

        let tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(tags >= 1);
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let pool = create_memory_pool().await.unwrap();
        init_schema(&pool, "does/not/exist.sql").await.unwrap();
        init_schema(&pool, "does/not/exist.sql").await.unwrap();

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn drift_check_backs_up_foreign_store() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("store.db");
        let db_path_str = db_path.to_string_lossy().into_owned();

        // Create a store with no bugs table.
        let pool = create_pool(&db_path_str).await.unwrap();
        pool.close().await;
        assert!(db_path.exists());

        check_schema_drift(&db_path_str).await.unwrap();
        assert!(!db_path.exists());
        assert!(dir.path().join("store.db.backup").exists());
    }

    #[tokio::test]
    async fn drift_check_keeps_current_store() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("store.db");
        let db_path_str = db_path.to_string_lossy().into_owned();

        let pool = create_pool(&db_path_str).await.unwrap();
        init_schema(&pool, "does/not/exist.sql").await.unwrap();
        pool.close().await;

        check_schema_drift(&db_path_str).await.unwrap();
        assert!(db_path.exists());
        assert!(!dir.path().join("store.db.backup").exists());
    }
}
