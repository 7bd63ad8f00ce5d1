//! Namespaced JSON document access on top of `kv_store`.
//!
//! Shared by the session and user repositories. Every function accepts any
//! SQLite executor so callers can run several writes inside one transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{Row, Sqlite};

use parley_types::error::RepositoryError;

pub(crate) const SESSION_PREFIX: &str = "session";
pub(crate) const CONVERSATION_PREFIX: &str = "conversation";
pub(crate) const USER_PREFIX: &str = "user";

pub(crate) fn key(prefix: &str, id: impl std::fmt::Display) -> String {
    format!("{prefix}:{id}")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// Document access
// ---------------------------------------------------------------------------

/// Fetch and decode one document. `None` if the key is absent.
pub(crate) async fn get<'e, T, E>(executor: E, key: &str) -> Result<Option<T>, RepositoryError>
where
    T: DeserializeOwned,
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
        .bind(key)
        .fetch_optional(executor)
        .await
        .map_err(query_error)?;

    match row {
        Some(row) => {
            let value: String = row.try_get("value").map_err(query_error)?;
            let doc = serde_json::from_str(&value).map_err(|e| {
                RepositoryError::Serialization(format!("invalid document at {key}: {e}"))
            })?;
            Ok(Some(doc))
        }
        None => Ok(None),
    }
}

/// Insert or replace one document.
pub(crate) async fn put<'e, T, E>(executor: E, key: &str, doc: &T) -> Result<(), RepositoryError>
where
    T: Serialize,
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let now = format_datetime(&Utc::now());
    let value = serde_json::to_string(doc)?;

    sqlx::query(
        r#"INSERT INTO kv_store (key, value, created_at, updated_at)
           VALUES (?, ?, ?, ?)
           ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
    )
    .bind(key)
    .bind(&value)
    .bind(&now)
    .bind(&now)
    .execute(executor)
    .await
    .map_err(query_error)?;

    Ok(())
}

/// Insert a document unless the key already exists. Returns whether a row
/// was written.
pub(crate) async fn put_new<'e, T, E>(executor: E, key: &str, doc: &T) -> Result<bool, RepositoryError>
where
    T: Serialize,
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let now = format_datetime(&Utc::now());
    let value = serde_json::to_string(doc)?;

    let result = sqlx::query(
        r#"INSERT INTO kv_store (key, value, created_at, updated_at)
           VALUES (?, ?, ?, ?)
           ON CONFLICT (key) DO NOTHING"#,
    )
    .bind(key)
    .bind(&value)
    .bind(&now)
    .bind(&now)
    .execute(executor)
    .await
    .map_err(query_error)?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn remove<'e, E>(executor: E, key: &str) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM kv_store WHERE key = ?")
        .bind(key)
        .execute(executor)
        .await
        .map_err(query_error)?;
    Ok(())
}
