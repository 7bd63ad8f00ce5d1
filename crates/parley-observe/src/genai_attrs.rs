//! OpenTelemetry GenAI Semantic Convention values.
//!
//! Field names are written inline in span macros (`gen_ai.operation.name = ..`).
//! The constants here are values the binary's spans share.

/// Service and agent name reported on spans.
pub const AGENT_NAME: &str = "parley";

/// One user turn through both pipeline stages.
pub const OP_INVOKE_AGENT: &str = "invoke_agent";
