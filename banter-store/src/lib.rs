//! SQLite-backed session persistence for banter
//!
//! Sessions are rows of `{id, session_name, session_data}` where the data
//! column is an opaque JSON conversation blob. Updates overwrite the blob
//! wholesale; there is no delete operation and no row versioning, so
//! concurrent writers race and the last write wins.

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use banter_core::Conversation;

/// Error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session data error: {0}")]
    Data(#[from] banter_core::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A persisted session row
///
/// Field names double as the wire names on the session endpoints.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SessionRow {
    pub id: String,
    pub session_name: String,
    pub session_data: String,
}

/// Handle to the sessions table
///
/// Clones share the same pool. The handle is created once at startup and
/// injected into the server state; nothing else holds the connection.
#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    /// Open the database at `path`, creating file and schema if missing
    pub async fn connect(path: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                session_name TEXT NOT NULL,
                session_data TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        info!("Session store ready at {}", path);
        Ok(Self { pool })
    }

    /// Insert a new session with an empty conversation, returning its id
    pub async fn create_session(&self, name: &str) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let data = Conversation::new().encode()?;

        sqlx::query("INSERT INTO sessions (id, session_name, session_data) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(&data)
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    /// Fetch all rows, store default order, no pagination
    pub async fn list_sessions(&self) -> StoreResult<Vec<SessionRow>> {
        let rows =
            sqlx::query_as::<_, SessionRow>("SELECT id, session_name, session_data FROM sessions")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    /// Fetch one session; `None` when the id is unknown
    pub async fn get_session(&self, id: &str) -> StoreResult<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, session_name, session_data FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Overwrite the conversation blob wholesale; false when the id is unknown
    pub async fn update_session(&self, id: &str, data: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE sessions SET session_data = ? WHERE id = ?")
            .bind(data)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let store = SessionStore::connect(path.to_str().unwrap()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_session_is_retrievable_and_empty() {
        let (_dir, store) = test_store().await;

        let id = store.create_session("My chat").await.unwrap();
        let row = store.get_session(&id).await.unwrap().unwrap();

        assert_eq!(row.id, id);
        assert_eq!(row.session_name, "My chat");
        let convo = Conversation::decode(&row.session_data).unwrap();
        assert!(convo.conversation.is_empty());
    }

    #[tokio::test]
    async fn test_update_then_get_returns_last_write() {
        let (_dir, store) = test_store().await;
        let id = store.create_session("chat").await.unwrap();

        let mut convo = Conversation::new();
        convo.push_turn("hello", true);
        convo.push_turn("hi!", false);
        let first = convo.encode().unwrap();
        assert!(store.update_session(&id, &first).await.unwrap());

        convo.push_turn("more", true);
        let second = convo.encode().unwrap();
        assert!(store.update_session(&id, &second).await.unwrap());

        let row = store.get_session(&id).await.unwrap().unwrap();
        assert_eq!(row.session_data, second);
    }

    #[tokio::test]
    async fn test_update_unknown_id_affects_nothing() {
        let (_dir, store) = test_store().await;
        let updated = store
            .update_session("no-such-id", r#"{"conversation":[]}"#)
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_none() {
        let (_dir, store) = test_store().await;
        assert!(store.get_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_returns_all_sessions() {
        let (_dir, store) = test_store().await;
        let id_a = store.create_session("A").await.unwrap();
        let id_b = store.create_session("B").await.unwrap();
        assert_ne!(id_a, id_b);

        let rows = store.list_sessions().await.unwrap();
        assert_eq!(rows.len(), 2);

        for (id, name) in [(id_a, "A"), (id_b, "B")] {
            let row = store.get_session(&id).await.unwrap().unwrap();
            assert_eq!(row.session_name, name);
        }
    }
}
