//! Rolling session summarizer.
//!
//! After each appended conversation the session summary is rewritten from
//! the previous summary plus the new exchange. Human messages and assistant
//! messages with text are shown to the model. Tool results and assistant
//! messages that only request tools are left out.

use parley_types::llm::{CompletionRequest, LlmError};
use parley_types::message::Message;
use parley_types::session::Conversation;

use super::prompt::fill_placeholders;
use crate::llm::box_provider::BoxLlmProvider;

/// Instruction prompt for the summary call.
const SUMMARY_PROMPT: &str = r#"You maintain a running summary of a chat session.

Combine the previous summary and the new conversation below into one updated summary.
- Write in the same language the user writes in.
- Keep it to about 50 words.
- Keep names, places, preferences and open requests; drop greetings and filler.
- Return ONLY the summary text.

<PreviousSummary>
{previous}
</PreviousSummary>

<Conversation>
{conversation}
</Conversation>"#;

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("summary call failed: {0}")]
    Backend(#[from] LlmError),

    #[error("summary call returned no content")]
    Empty,
}

/// Model-backed summary updater.
///
/// Holds its own provider handle; whoever appends conversations owns one.
#[derive(Debug, Clone)]
pub struct Summarizer {
    provider: BoxLlmProvider,
    model: String,
}

impl Summarizer {
    pub fn new(provider: BoxLlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Produce the summary that should replace `previous_summary`.
    #[tracing::instrument(
        name = "generate_summary",
        skip(self, previous_summary, conversation),
        fields(
            model = %self.model,
            conversation_id = %conversation.id,
        )
    )]
    pub async fn generate_summary(
        &self,
        previous_summary: &str,
        conversation: &Conversation,
    ) -> Result<String, SummaryError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::system(build_summary_prompt(
                previous_summary,
                &conversation.messages,
            ))],
            tools: Vec::new(),
            output_schema: None,
            max_tokens: Some(256),
            temperature: Some(0.0),
        };

        let response = self.provider.complete(&request).await?;
        let summary = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(SummaryError::Empty)?;

        Ok(summary)
    }
}

/// Fill the summary prompt with the previous summary and the dialogue.
pub fn build_summary_prompt(previous_summary: &str, messages: &[Message]) -> String {
    let conversation = messages
        .iter()
        .filter(|m| match m {
            Message::Human { .. } => true,
            Message::Ai {
                content,
                tool_calls,
            } => tool_calls.is_empty() || !content.is_empty(),
            _ => false,
        })
        .map(|m| format!("{}: {}", m.role().display_name(), m.content()))
        .collect::<Vec<_>>()
        .join("\n");

    fill_placeholders(
        SUMMARY_PROMPT,
        &[
            ("{previous}", previous_summary),
            ("{conversation}", conversation.as_str()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use std::sync::Arc;

    use parley_types::llm::{AssistantChoice, CompletionResponse};
    use parley_types::message::ToolCall;

    use super::*;
    use crate::llm::provider::LlmProvider;

    struct CapturingProvider {
        reply: String,
        seen: Arc<Mutex<Option<CompletionRequest>>>,
    }

    impl LlmProvider for CapturingProvider {
        fn name(&self) -> &str {
            "capture"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            *self.seen.lock() = Some(request.clone());
            Ok(CompletionResponse {
                choices: vec![AssistantChoice {
                    content: self.reply.clone(),
                    tool_calls: vec![],
                }],
                ..Default::default()
            })
        }
    }

    fn transcript() -> Vec<Message> {
        vec![
            Message::system("you are helpful"),
            Message::human("Weather in Taipei?"),
            Message::ai_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "c1".into(),
                    name: "get_weather".into(),
                    arguments: Default::default(),
                }],
            ),
            Message::tool_result("c1", "{\"temperature\":31}"),
            Message::ai("Sunny and 31 degrees."),
        ]
    }

    #[test]
    fn prompt_contains_only_dialogue() {
        let prompt = build_summary_prompt("User lives in Taipei.", &transcript());

        assert!(prompt.contains("User lives in Taipei."));
        assert!(prompt.contains("Human: Weather in Taipei?"));
        assert!(prompt.contains("AI: Sunny and 31 degrees."));
        assert!(!prompt.contains("temperature\":31"));
        assert!(!prompt.contains("you are helpful"));
        assert!(prompt.contains("same language"));
    }

    #[test]
    fn ai_text_alongside_tool_calls_is_kept() {
        let messages = vec![
            Message::human("Plan my day in Taichung"),
            Message::ai_with_tool_calls(
                "Let me check the forecast first.",
                vec![ToolCall {
                    id: "c1".into(),
                    name: "get_weather".into(),
                    arguments: Default::default(),
                }],
            ),
            Message::tool_result("c1", "{}"),
            Message::ai("Rain after noon, visit the museum."),
        ];

        let prompt = build_summary_prompt("", &messages);
        assert!(prompt.contains("AI: Let me check the forecast first."));
        assert!(prompt.contains("AI: Rain after noon, visit the museum."));
    }

    #[test]
    fn placeholders_inside_values_are_not_expanded() {
        let prompt = build_summary_prompt(
            "User typed {conversation} literally.",
            &[Message::human("hello")],
        );
        assert!(prompt.contains("User typed {conversation} literally."));
        assert_eq!(prompt.matches("Human: hello").count(), 1);
    }

    #[tokio::test]
    async fn returns_trimmed_summary() {
        let seen = Arc::new(Mutex::new(None));
        let summarizer = Summarizer::new(
            BoxLlmProvider::new(CapturingProvider {
                reply: "  Asked about Taipei weather.  ".into(),
                seen: Arc::clone(&seen),
            }),
            "summary-model",
        );

        let conversation = Conversation::new("Weather in Taipei?", "Sunny", transcript());
        let summary = summarizer.generate_summary("", &conversation).await.unwrap();

        assert_eq!(summary, "Asked about Taipei weather.");
        let request = seen.lock().take().unwrap();
        assert_eq!(request.model, "summary-model");
        assert_eq!(request.messages.len(), 1);
    }

    #[tokio::test]
    async fn empty_reply_is_an_error() {
        let summarizer = Summarizer::new(
            BoxLlmProvider::new(CapturingProvider {
                reply: "   ".into(),
                seen: Arc::new(Mutex::new(None)),
            }),
            "m",
        );
        let conversation = Conversation::new("hi", "hello", vec![]);
        let err = summarizer.generate_summary("", &conversation).await.unwrap_err();
        assert!(matches!(err, SummaryError::Empty));
    }
}
