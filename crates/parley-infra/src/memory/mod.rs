//! In-memory repositories.
//!
//! Process-lifetime stores backed by [`DashMap`]. Each `save` replaces the
//! whole value under a single shard lock, so a session and its conversations
//! are always swapped in together.

use dashmap::DashMap;
use uuid::Uuid;

use parley_core::session::{SessionRepository, UserRepository};
use parley_types::error::RepositoryError;
use parley_types::session::Session;
use parley_types::user::User;

#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: DashMap<Uuid, Session>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionRepository for InMemorySessionRepository {
    async fn find(&self, id: &Uuid) -> Result<Session, RepositoryError> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn save(&self, session: &Session) -> Result<(), RepositoryError> {
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        self.sessions.remove(id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn find(&self, id: &str) -> Result<User, RepositoryError> {
        self.users
            .get(id)
            .map(|entry| {
                let mut user = entry.value().clone();
                user.profile = None;
                user
            })
            .ok_or(RepositoryError::NotFound)
    }

    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        let mut stored = user.clone();
        stored.profile = None;
        self.users.insert(stored.id.clone(), stored);
        Ok(())
    }
}
