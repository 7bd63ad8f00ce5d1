//! Backend selection for the repositories.
//!
//! The pipeline is generic over its repositories; these enums pick the
//! in-memory or SQLite implementation at startup from [`StorageConfig`].

use uuid::Uuid;

use parley_core::session::{SessionRepository, UserRepository};
use parley_types::config::{StorageBackend, StorageConfig};
use parley_types::error::RepositoryError;
use parley_types::session::Session;
use parley_types::user::User;

use crate::memory::{InMemorySessionRepository, InMemoryUserRepository};
use crate::sqlite::{DatabasePool, SqliteSessionRepository, SqliteUserRepository};

pub enum SessionStore {
    Memory(InMemorySessionRepository),
    Sqlite(SqliteSessionRepository),
}

pub enum UserStore {
    Memory(InMemoryUserRepository),
    Sqlite(SqliteUserRepository),
}

/// Build both stores for the configured backend. SQLite opens (and
/// migrates) the database at `config.path`.
pub async fn open_stores(config: &StorageConfig) -> Result<(SessionStore, UserStore), RepositoryError> {
    match config.backend {
        StorageBackend::Memory => Ok((
            SessionStore::Memory(InMemorySessionRepository::new()),
            UserStore::Memory(InMemoryUserRepository::new()),
        )),
        StorageBackend::Sqlite => {
            let pool = DatabasePool::open(&config.path)
                .await
                .map_err(|e| {
                    tracing::error!(path = %config.path.display(), error = %e, "failed to open sqlite store");
                    RepositoryError::Connection
                })?;
            tracing::info!(path = %config.path.display(), "opened sqlite store");
            Ok((
                SessionStore::Sqlite(SqliteSessionRepository::new(pool.clone())),
                UserStore::Sqlite(SqliteUserRepository::new(pool)),
            ))
        }
    }
}

impl SessionRepository for SessionStore {
    async fn find(&self, id: &Uuid) -> Result<Session, RepositoryError> {
        match self {
            Self::Memory(repo) => repo.find(id).await,
            Self::Sqlite(repo) => repo.find(id).await,
        }
    }

    async fn save(&self, session: &Session) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(repo) => repo.save(session).await,
            Self::Sqlite(repo) => repo.save(session).await,
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(repo) => repo.delete(id).await,
            Self::Sqlite(repo) => repo.delete(id).await,
        }
    }
}

impl UserRepository for UserStore {
    async fn find(&self, id: &str) -> Result<User, RepositoryError> {
        match self {
            Self::Memory(repo) => repo.find(id).await,
            Self::Sqlite(repo) => repo.find(id).await,
        }
    }

    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(repo) => repo.save(user).await,
            Self::Sqlite(repo) => repo.save(user).await,
        }
    }
}
