//! AgentEngine -- bounded tool-calling loop over one model backend.
//!
//! Each round sends the transcript to the provider. If the top choice asks
//! for tools, the calls are executed, their results appended, and the loop
//! goes again. The first choice without tool calls ends the turn. Every
//! backend call is wrapped in a GenAI span.

use futures_util::future::try_join_all;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, field, info_span};

use parley_types::config::ToolExecution;
use parley_types::llm::{
    CompletionRequest, LlmError, OutputSchema, RequestedToolCall, ToolDefinition,
};
use parley_types::message::{Message, ToolCall};

use crate::llm::box_provider::BoxLlmProvider;
use crate::tool::{BoxTool, ToolError, ToolSet};

/// Default bound on backend calls per turn.
pub const MAX_ROUNDS: usize = 10;

/// Fatal outcomes of one agent run.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("backend returned no choices")]
    NoResponse,

    #[error("model requested unknown tool '{0}'")]
    UnknownTool(String),

    #[error("malformed arguments for tool '{tool}': {message}")]
    MalformedToolArguments { tool: String, message: String },

    #[error("tool '{tool}' failed: {source}")]
    Tool {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("backend call failed: {0}")]
    Backend(#[from] LlmError),

    #[error("no final answer after {0} rounds")]
    MaxIterationsExceeded(usize),

    #[error("turn cancelled")]
    Cancelled,
}

impl AgentError {
    /// True when the backend produced output the loop cannot act on.
    pub fn is_model_fault(&self) -> bool {
        matches!(
            self,
            AgentError::NoResponse
                | AgentError::UnknownTool(_)
                | AgentError::MalformedToolArguments { .. }
        )
    }
}

/// A tool call whose target and arguments have been checked.
struct ResolvedCall<'a> {
    call: ToolCall,
    tool: &'a BoxTool,
}

/// Drives one backend to a final answer.
///
/// Cheap to share: holds a cloned provider handle plus configuration.
#[derive(Debug, Clone)]
pub struct AgentEngine {
    provider: BoxLlmProvider,
    model: String,
    tools: ToolSet,
    output_schema: Option<OutputSchema>,
    max_rounds: usize,
    tool_execution: ToolExecution,
}

impl AgentEngine {
    pub fn new(provider: BoxLlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            tools: ToolSet::new(),
            output_schema: None,
            max_rounds: MAX_ROUNDS,
            tool_execution: ToolExecution::Sequential,
        }
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    /// Constrain the final assistant message to `schema`.
    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Bound the number of backend calls per run. Always at least one.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_tool_execution(mut self, mode: ToolExecution) -> Self {
        self.tool_execution = mode;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the loop on `messages` and return the full transcript.
    ///
    /// The returned transcript is the input followed by every assistant and
    /// tool message of this run, ending with the final answer. On error no
    /// transcript is returned. `cancellation` is checked before each round
    /// and raced against every backend and tool call.
    pub async fn run(
        &self,
        messages: Vec<Message>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<Message>, AgentError> {
        let mut transcript = messages;
        let tools: Vec<ToolDefinition> = self.tools.definitions();

        for round in 1..=self.max_rounds {
            if cancellation.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let request = CompletionRequest {
                model: self.model.clone(),
                messages: transcript.clone(),
                tools: tools.clone(),
                output_schema: self.output_schema.clone(),
                max_tokens: None,
                temperature: None,
            };

            let span = info_span!(
                "gen_ai.chat",
                gen_ai.operation.name = "chat",
                gen_ai.system = self.provider.name(),
                gen_ai.request.model = %self.model,
                gen_ai.request.structured = self.output_schema.is_some(),
                agent.round = round,
                gen_ai.response.id = field::Empty,
                gen_ai.usage.input_tokens = field::Empty,
                gen_ai.usage.output_tokens = field::Empty,
            );

            let response = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(AgentError::Cancelled),
                result = self.provider.complete(&request).instrument(span.clone()) => result?,
            };

            span.record("gen_ai.response.id", response.id.as_str());
            span.record("gen_ai.usage.input_tokens", response.usage.input_tokens);
            span.record("gen_ai.usage.output_tokens", response.usage.output_tokens);

            let choice = response
                .choices
                .into_iter()
                .next()
                .ok_or(AgentError::NoResponse)?;

            if choice.tool_calls.is_empty() {
                transcript.push(Message::ai(choice.content));
                return Ok(transcript);
            }

            debug!(round, count = choice.tool_calls.len(), "model requested tool calls");
            let (calls, results) = self
                .execute_tool_calls(choice.tool_calls, cancellation)
                .await?;

            transcript.push(Message::ai_with_tool_calls(choice.content, calls));
            transcript.extend(results);
        }

        Err(AgentError::MaxIterationsExceeded(self.max_rounds))
    }

    /// Execute every requested call and return the decoded calls alongside
    /// their result messages, both in request order.
    async fn execute_tool_calls(
        &self,
        requested: Vec<RequestedToolCall>,
        cancellation: &CancellationToken,
    ) -> Result<(Vec<ToolCall>, Vec<Message>), AgentError> {
        match self.tool_execution {
            ToolExecution::Sequential => {
                let mut calls = Vec::with_capacity(requested.len());
                let mut results = Vec::with_capacity(requested.len());

                for raw in requested {
                    let resolved = self.resolve(raw)?;
                    let output = invoke(&resolved, cancellation).await?;
                    results.push(Message::tool_result(resolved.call.id.clone(), output));
                    calls.push(resolved.call);
                }

                Ok((calls, results))
            }
            ToolExecution::Concurrent => {
                let resolved = requested
                    .into_iter()
                    .map(|raw| self.resolve(raw))
                    .collect::<Result<Vec<_>, _>>()?;

                let outputs =
                    try_join_all(resolved.iter().map(|r| invoke(r, cancellation))).await?;

                let results = resolved
                    .iter()
                    .zip(outputs)
                    .map(|(r, output)| Message::tool_result(r.call.id.clone(), output))
                    .collect();
                let calls = resolved.into_iter().map(|r| r.call).collect();

                Ok((calls, results))
            }
        }
    }

    /// Look up the tool and decode its arguments.
    fn resolve(&self, raw: RequestedToolCall) -> Result<ResolvedCall<'_>, AgentError> {
        let tool = self
            .tools
            .get(&raw.name)
            .ok_or_else(|| AgentError::UnknownTool(raw.name.clone()))?;

        let arguments = decode_arguments(&raw)?;

        Ok(ResolvedCall {
            call: ToolCall {
                id: raw.id,
                name: raw.name,
                arguments,
            },
            tool,
        })
    }
}

/// Decode a JSON argument object. An empty string means no arguments.
fn decode_arguments(raw: &RequestedToolCall) -> Result<Map<String, Value>, AgentError> {
    if raw.arguments.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(&raw.arguments) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AgentError::MalformedToolArguments {
            tool: raw.name.clone(),
            message: format!("expected a JSON object, got {other}"),
        }),
        Err(e) => Err(AgentError::MalformedToolArguments {
            tool: raw.name.clone(),
            message: e.to_string(),
        }),
    }
}

async fn invoke(
    resolved: &ResolvedCall<'_>,
    cancellation: &CancellationToken,
) -> Result<String, AgentError> {
    let call = &resolved.call;
    let span = info_span!("tool.call", tool.name = %call.name, tool.call_id = %call.id);

    debug!(tool = %call.name, call_id = %call.id, "executing tool");
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(AgentError::Cancelled),
        result = resolved.tool.call(call.arguments.clone()).instrument(span) => {
            result.map_err(|source| AgentError::Tool {
                tool: call.name.clone(),
                source,
            })
        }
    }
}
