//! SQLite storage layer.
//!
//! Sessions, conversations and users live as JSON documents in a single
//! namespaced key/value table. Writes go through the single-connection
//! writer pool; multi-record saves run in one transaction.

pub mod kv;
pub mod pool;
pub mod session;
pub mod user;

pub use pool::DatabasePool;
pub use session::SqliteSessionRepository;
pub use user::SqliteUserRepository;
