//! Session persistence ports and the service that mutates sessions.

pub mod repository;
pub mod service;

pub use repository::{SessionRepository, UserRepository};
pub use service::{SessionError, SessionService};
