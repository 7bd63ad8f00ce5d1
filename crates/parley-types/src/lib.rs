//! Shared domain types for Parley.
//!
//! Messages, sessions, users, reply verdicts and the model invocation
//! contract, plus their error types. No I/O lives here.

pub mod config;
pub mod error;
pub mod llm;
pub mod message;
pub mod reply;
pub mod session;
pub mod user;
