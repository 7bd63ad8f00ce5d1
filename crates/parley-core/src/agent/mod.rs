//! Agent execution for Parley.
//!
//! - `AgentEngine`: the bounded tool-calling loop over one backend
//! - `Summarizer`: rolling same-language session summary
//! - `prompt`: system prompts for the content and format stages

pub mod engine;
pub mod prompt;
pub mod summarizer;
