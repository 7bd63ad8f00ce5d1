//! Infrastructure implementations for Parley.
//!
//! Concrete repositories (in-memory and SQLite), the flex template
//! registry, the weather tool, the model gateway client and the config
//! loader. Everything here implements a trait defined in `parley-core`.

pub mod config;
pub mod llm;
pub mod memory;
pub mod sqlite;
pub mod store;
pub mod templates;
pub mod tools;
