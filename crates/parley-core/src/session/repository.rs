//! Repository traits for sessions and users.
//!
//! The core depends only on these contracts; backing stores (in-memory map,
//! SQLite key/value table) live in parley-infra. Uses RPITIT.

use parley_types::error::RepositoryError;
use parley_types::session::Session;
use parley_types::user::User;
use uuid::Uuid;

/// Session persistence.
///
/// `save` must write the session and all of its conversations atomically:
/// after a crash either the whole new state is visible or none of it is.
pub trait SessionRepository: Send + Sync {
    /// Load a session. Fails with [`RepositoryError::NotFound`] if absent.
    fn find(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Session, RepositoryError>> + Send;

    /// Insert or replace a session together with its conversations.
    fn save(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Remove a session and its conversations.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

/// User persistence. The transient profile is never stored.
pub trait UserRepository: Send + Sync {
    /// Load a user. Fails with [`RepositoryError::NotFound`] if absent.
    fn find(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    /// Insert or replace a user.
    fn save(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
