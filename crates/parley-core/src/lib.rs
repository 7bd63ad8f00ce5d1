//! Agent orchestration core for Parley.
//!
//! Defines the ports the infrastructure layer implements (model provider,
//! tools, repositories, templates) and the logic that drives one turn:
//! the bounded agent loop, the rolling summarizer, the token vault and the
//! two-stage reply pipeline. Never depends on `parley-infra`.

pub mod agent;
pub mod llm;
pub mod reply;
pub mod session;
pub mod tool;
pub mod vault;
