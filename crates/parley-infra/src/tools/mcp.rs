//! MCP tool server over the streamable HTTP transport.
//!
//! [`McpHttpSource`] speaks JSON-RPC 2.0: `initialize` once, then
//! `tools/list` (cursor-paged) and `tools/call`. Servers may answer with a
//! plain JSON body or a single-event SSE body; both are accepted. The
//! `Mcp-Session-Id` header handed out on initialize is sent back on every
//! later request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use parley_core::tool::ToolError;
use parley_core::tool::remote::{RemoteToolSource, ToolPage};
use parley_types::config::RemoteServerConfig;

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "Mcp-Session-Id";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallToolResult {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Decode an HTTP body as a JSON-RPC response. SSE bodies are scanned for
/// the first `data:` line holding one.
fn parse_body(content_type: &str, body: &str) -> Result<RpcResponse, ToolError> {
    if content_type.contains("text/event-stream") {
        return body
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .find_map(|data| serde_json::from_str(data.trim()).ok())
            .ok_or_else(|| ToolError::Execution("no JSON-RPC message in event stream".into()));
    }

    serde_json::from_str(body)
        .map_err(|e| ToolError::Execution(format!("invalid JSON-RPC response: {e}")))
}

fn decode_result<T: DeserializeOwned>(method: &str, response: RpcResponse) -> Result<T, ToolError> {
    if let Some(error) = response.error {
        return Err(ToolError::Request(format!(
            "{method} failed: {} (code {})",
            error.message, error.code
        )));
    }

    let result = response
        .result
        .ok_or_else(|| ToolError::Execution(format!("{method} returned no result")))?;
    serde_json::from_value(result)
        .map_err(|e| ToolError::Execution(format!("invalid {method} result: {e}")))
}

/// Join the text blocks of a call result. A result flagged as an error
/// becomes [`ToolError::Execution`].
fn call_output(result: CallToolResult) -> Result<String, ToolError> {
    let text = result
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error {
        return Err(ToolError::Execution(text));
    }
    Ok(text)
}

/// One MCP server reached over HTTP.
pub struct McpHttpSource {
    name: String,
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
    session_id: Mutex<Option<String>>,
}

impl McpHttpSource {
    pub fn new(config: &RemoteServerConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            client,
            next_id: AtomicU64::new(1),
            session_id: Mutex::new(None),
        })
    }

    /// Run the initialize handshake and acknowledge it.
    #[tracing::instrument(name = "mcp_initialize", skip(self), fields(server = %self.name))]
    pub async fn initialize(&self) -> Result<(), ToolError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": "parley", "version": env!("CARGO_PKG_VERSION") },
        });
        let _: Value = self.request("initialize", Some(params)).await?;
        self.notify("notifications/initialized").await?;

        tracing::debug!("MCP session initialized");
        Ok(())
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .post(&RpcRequest {
                jsonrpc: "2.0",
                id: Some(id),
                method,
                params,
            })
            .await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Request(format!("{}: {method}: {e}", self.name)))?;

        decode_result(method, parse_body(&content_type, &body)?)
    }

    async fn notify(&self, method: &str) -> Result<(), ToolError> {
        self.post(&RpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params: None,
        })
        .await
        .map(drop)
    }

    async fn post(&self, request: &RpcRequest<'_>) -> Result<reqwest::Response, ToolError> {
        let mut builder = self
            .client
            .post(self.url.as_str())
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .json(request);

        let session_id = self.session_id.lock().clone();
        if let Some(session_id) = session_id {
            builder = builder.header(SESSION_HEADER, session_id);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ToolError::Request(format!("{}: {}: {e}", self.name, request.method)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Request(format!(
                "{}: {} returned HTTP {status}",
                self.name, request.method
            )));
        }

        if let Some(session_id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock() = Some(session_id.to_string());
        }

        Ok(response)
    }
}

impl RemoteToolSource for McpHttpSource {
    async fn list_tools(&self, cursor: Option<String>) -> Result<ToolPage, ToolError> {
        let params = cursor.map(|cursor| json!({ "cursor": cursor }));
        self.request("tools/list", params).await
    }

    async fn call_tool(&self, name: &str, args: Map<String, Value>) -> Result<String, ToolError> {
        let params = json!({ "name": name, "arguments": args });
        let result: CallToolResult = self.request("tools/call", Some(params)).await?;
        call_output(result)
    }
}
