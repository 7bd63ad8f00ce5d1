//! LlmProvider trait definition.
//!
//! The single seam between the core and a model backend. Uses RPITIT so
//! implementations can be plain `async fn`s.

use parley_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// A model backend.
///
/// Given the transcript, the declared tools and an optional output schema,
/// returns zero or more candidate assistant messages. When the request
/// carries an output schema the backend must make the final message
/// conform to it.
///
/// Implementations live in parley-infra (e.g., `GatewayProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gateway").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
