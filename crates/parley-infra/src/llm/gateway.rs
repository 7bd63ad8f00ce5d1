//! GatewayProvider -- [`LlmProvider`] over a model gateway.
//!
//! The gateway accepts the invocation contract directly: the
//! [`CompletionRequest`] is posted as JSON to `/v1/complete` and the body of
//! a successful reply is a [`CompletionResponse`]. Translating to any
//! particular vendor's API is the gateway's job.
//!
//! The optional bearer token is held as a [`SecretString`]. The provider
//! does not derive Debug.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use parley_core::llm::provider::LlmProvider;
use parley_types::llm::{CompletionRequest, CompletionResponse, LlmError};

const COMPLETE_PATH: &str = "/v1/complete";

pub struct GatewayProvider {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl GatewayProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<SecretString>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url, COMPLETE_PATH)
    }
}

/// Map a non-success status to an [`LlmError`].
fn status_error(status: reqwest::StatusCode, retry_after: Option<u64>, body: String) -> LlmError {
    match status.as_u16() {
        400 | 422 => LlmError::InvalidRequest(body),
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: retry_after.map(|secs| secs * 1000),
        },
        503 | 529 => LlmError::Overloaded(body),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

impl LlmProvider for GatewayProvider {
    fn name(&self) -> &str {
        "gateway"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut builder = self.client.post(self.url()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, body));
        }

        response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::llm::{OutputSchema, ToolDefinition};
    use parley_types::message::Message;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn url_joins_base_and_path() {
        let provider = GatewayProvider::new("http://localhost:4000/", None).unwrap();
        assert_eq!(provider.url(), "http://localhost:4000/v1/complete");
        assert_eq!(provider.name(), "gateway");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, None, String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, Some(2), String::new()),
            LlmError::RateLimited { retry_after_ms: Some(2000) }
        ));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, None, "busy".into()),
            LlmError::Overloaded(body) if body == "busy"
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, None, "bad schema".into()),
            LlmError::InvalidRequest(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, None, "boom".into()),
            LlmError::Provider { message } if message.contains("boom")
        ));
    }

    #[test]
    fn request_body_is_the_contract() {
        let request = CompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![Message::system("be brief"), Message::human("weather?")],
            tools: vec![ToolDefinition {
                name: "get_weather".into(),
                description: "weather".into(),
                parameters: json!({ "type": "object" }),
            }],
            output_schema: Some(OutputSchema {
                name: "chat_reply".into(),
                schema: json!({ "type": "object" }),
                strict: true,
            }),
            max_tokens: None,
            temperature: Some(0.2),
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["messages"][1], json!({ "role": "human", "content": "weather?" }));
        assert_eq!(body["tools"][0]["name"], "get_weather");
        assert_eq!(body["output_schema"]["strict"], true);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn response_body_decodes() {
        let body = json!({
            "id": "resp_1",
            "model": "gpt-4o-mini",
            "choices": [{
                "content": "",
                "tool_calls": [{ "id": "call_1", "name": "get_weather", "arguments": "{\"location\":\"Taipei\"}" }]
            }],
            "usage": { "input_tokens": 12, "output_tokens": 7 }
        });
        let response: CompletionResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.choices[0].tool_calls[0].name, "get_weather");
        assert_eq!(response.usage.output_tokens, 7);
    }
}
