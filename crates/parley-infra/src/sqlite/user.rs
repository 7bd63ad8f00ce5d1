//! SQLite user repository. The profile is never written; `User` skips it
//! during serialization.

use parley_core::session::UserRepository;
use parley_types::error::RepositoryError;
use parley_types::user::User;

use super::kv::{self, USER_PREFIX};
use super::pool::DatabasePool;

pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl UserRepository for SqliteUserRepository {
    async fn find(&self, id: &str) -> Result<User, RepositoryError> {
        kv::get(&self.pool.reader, &kv::key(USER_PREFIX, id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        kv::put(&self.pool.writer, &kv::key(USER_PREFIX, &user.id), user).await
    }
}
