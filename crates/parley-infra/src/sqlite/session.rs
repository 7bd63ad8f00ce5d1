//! SQLite session repository.
//!
//! A session is stored as a header document (`session:<id>`) listing its
//! conversation ids, with each conversation under its own key
//! (`conversation:<id>`). Conversations are immutable once written, so a
//! save only inserts the ones not yet stored and then replaces the header,
//! all inside one writer transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parley_core::session::SessionRepository;
use parley_types::error::RepositoryError;
use parley_types::session::{Conversation, Session};

use super::kv::{self, CONVERSATION_PREFIX, SESSION_PREFIX, query_error};
use super::pool::DatabasePool;

pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Stored document types
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct SessionDoc {
    id: Uuid,
    user_id: String,
    summary: String,
    conversation_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl SessionDoc {
    fn from_session(session: &Session) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id.clone(),
            summary: session.summary.clone(),
            conversation_ids: session.conversations.iter().map(|c| c.id).collect(),
            created_at: session.created_at,
        }
    }

    fn into_session(self, conversations: Vec<Conversation>) -> Session {
        Session {
            id: self.id,
            user_id: self.user_id,
            summary: self.summary,
            conversations,
            created_at: self.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionRepository implementation
// ---------------------------------------------------------------------------

impl SessionRepository for SqliteSessionRepository {
    async fn find(&self, id: &Uuid) -> Result<Session, RepositoryError> {
        let doc: SessionDoc = kv::get(&self.pool.reader, &kv::key(SESSION_PREFIX, id))
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let mut conversations = Vec::with_capacity(doc.conversation_ids.len());
        for conv_id in &doc.conversation_ids {
            let conv: Conversation = kv::get(&self.pool.reader, &kv::key(CONVERSATION_PREFIX, conv_id))
                .await?
                .ok_or_else(|| {
                    RepositoryError::Query(format!(
                        "session {id} references missing conversation {conv_id}"
                    ))
                })?;
            conversations.push(conv);
        }

        Ok(doc.into_session(conversations))
    }

    async fn save(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let mut inserted = 0usize;
        for conv in &session.conversations {
            if kv::put_new(&mut *tx, &kv::key(CONVERSATION_PREFIX, conv.id), conv).await? {
                inserted += 1;
            }
        }
        kv::put(
            &mut *tx,
            &kv::key(SESSION_PREFIX, session.id),
            &SessionDoc::from_session(session),
        )
        .await?;

        tx.commit().await.map_err(query_error)?;

        tracing::debug!(session_id = %session.id, inserted, "session saved");
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let session_key = kv::key(SESSION_PREFIX, id);
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        if let Some(doc) = kv::get::<SessionDoc, _>(&mut *tx, &session_key).await? {
            for conv_id in &doc.conversation_ids {
                kv::remove(&mut *tx, &kv::key(CONVERSATION_PREFIX, conv_id)).await?;
            }
            kv::remove(&mut *tx, &session_key).await?;
        }

        tx.commit().await.map_err(query_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::message::Message;
    use serde_json::json;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = DatabasePool::open(&db_path).await.unwrap();
        // Keep dir alive for the test duration.
        std::mem::forget(dir);
        pool
    }

    fn turn(input: &str, output: &str) -> Conversation {
        let mut conv = Conversation::new(
            input,
            output,
            vec![Message::human(input), Message::ai(output)],
        );
        conv.format = Some(json!({ "type": "text", "text": { "text": output } }));
        conv
    }

    async fn stored_keys(pool: &DatabasePool) -> Vec<String> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT key FROM kv_store ORDER BY key")
            .fetch_all(&pool.reader)
            .await
            .unwrap();
        rows.into_iter().map(|r| r.0).collect()
    }

    #[tokio::test]
    async fn save_and_find_roundtrip() {
        let pool = test_pool().await;
        let repo = SqliteSessionRepository::new(pool);

        let mut session = Session::new("U1");
        session.record(turn("hi", "hello"), Some("greeting".into()));
        session.record(turn("weather?", "sunny"), None);
        repo.save(&session).await.unwrap();

        let found = repo.find(&session.id).await.unwrap();
        assert_eq!(found, session);
        assert_eq!(found.conversations[1].input, "weather?");
        assert_eq!(found.summary, "greeting");
    }

    #[tokio::test]
    async fn find_missing_is_not_found() {
        let repo = SqliteSessionRepository::new(test_pool().await);
        let err = repo.find(&Uuid::now_v7()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn resave_appends_without_duplicating() {
        let pool = test_pool().await;
        let repo = SqliteSessionRepository::new(pool.clone());

        let mut session = Session::new("U1");
        session.record(turn("one", "1"), Some("s1".into()));
        repo.save(&session).await.unwrap();

        session.record(turn("two", "2"), Some("s2".into()));
        repo.save(&session).await.unwrap();

        let found = repo.find(&session.id).await.unwrap();
        assert_eq!(found.conversations.len(), 2);
        assert_eq!(found.summary, "s2");
        // One header plus two conversations.
        assert_eq!(stored_keys(&pool).await.len(), 3);
    }

    #[tokio::test]
    async fn delete_removes_conversations() {
        let pool = test_pool().await;
        let repo = SqliteSessionRepository::new(pool.clone());

        let mut keep = Session::new("U1");
        keep.record(turn("a", "b"), None);
        let mut gone = Session::new("U1");
        gone.record(turn("c", "d"), None);
        repo.save(&keep).await.unwrap();
        repo.save(&gone).await.unwrap();

        repo.delete(&gone.id).await.unwrap();
        // Deleting twice is a no-op.
        repo.delete(&gone.id).await.unwrap();

        assert!(repo.find(&gone.id).await.unwrap_err().is_not_found());
        assert_eq!(repo.find(&keep.id).await.unwrap(), keep);
        assert_eq!(stored_keys(&pool).await.len(), 2);
    }
}
