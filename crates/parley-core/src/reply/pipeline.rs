//! ReplyPipeline -- one inbound message to one rendered reply.
//!
//! 1. Resolve the user's selected session.
//! 2. Content stage: tool-enabled agent run over prompt + history + input.
//! 3. Format stage: schema-constrained run over the content transcript.
//! 4. Append the conversation (which refreshes the summary).
//! 5. Validate the verdict and dispatch it to a renderer.

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};

use parley_types::llm::OutputSchema;
use parley_types::reply::{RenderedReply, Reply, reply_schema};
use parley_types::session::Conversation;
use parley_types::user::Identity;

use super::ReplyError;
use super::dispatch::TemplateDispatcher;
use super::template::TemplateRegistry;
use crate::agent::engine::AgentEngine;
use crate::agent::prompt::PromptBuilder;
use crate::session::{SessionRepository, SessionService, UserRepository};

/// Name of the format-stage output schema.
pub const REPLY_SCHEMA_NAME: &str = "chat_reply";

pub struct ReplyPipeline<S, U, T> {
    content: AgentEngine,
    format: AgentEngine,
    prompts: PromptBuilder,
    sessions: SessionService<S, U>,
    dispatcher: TemplateDispatcher<T>,
    catalog: String,
}

impl<S, U, T> ReplyPipeline<S, U, T>
where
    S: SessionRepository,
    U: UserRepository,
    T: TemplateRegistry,
{
    /// Assemble the pipeline. The format engine's output schema is derived
    /// from the templates registered with `dispatcher`.
    pub fn new(
        content: AgentEngine,
        format: AgentEngine,
        prompts: PromptBuilder,
        sessions: SessionService<S, U>,
        dispatcher: TemplateDispatcher<T>,
    ) -> Self {
        let templates: Vec<_> = dispatcher
            .registry()
            .templates()
            .into_iter()
            .map(|t| (t.name, t.values_schema))
            .collect();

        let format = format.with_output_schema(OutputSchema {
            name: REPLY_SCHEMA_NAME.to_string(),
            schema: reply_schema(&templates),
            strict: true,
        });
        let catalog = dispatcher.catalog();

        Self {
            content,
            format,
            prompts,
            sessions,
            dispatcher,
            catalog,
        }
    }

    pub fn sessions(&self) -> &SessionService<S, U> {
        &self.sessions
    }

    /// Produce the reply for one inbound message.
    ///
    /// Any error aborts the turn. The conversation is persisted once the
    /// format stage has produced output, even if rendering then fails.
    pub async fn reply(
        &self,
        identity: &Identity,
        input: &str,
        cancellation: &CancellationToken,
    ) -> Result<RenderedReply, ReplyError> {
        let span = info_span!("turn", user_id = %identity.user_id);
        self.run_turn(identity, input, cancellation)
            .instrument(span)
            .await
    }

    async fn run_turn(
        &self,
        identity: &Identity,
        input: &str,
        cancellation: &CancellationToken,
    ) -> Result<RenderedReply, ReplyError> {
        let (user, mut session) = self.sessions.resolve_for_turn(identity).await?;

        let messages = self.prompts.content_messages(&user, &session, input)?;
        let transcript = self
            .content
            .run(messages, cancellation)
            .instrument(info_span!("content_stage", model = %self.content.model()))
            .await?;
        let output = transcript
            .last()
            .map(|m| m.content().to_string())
            .unwrap_or_default();

        let format_messages = self
            .prompts
            .format_messages(&transcript, input, &self.catalog);
        let format_transcript = self
            .format
            .run(format_messages, cancellation)
            .instrument(info_span!("format_stage", model = %self.format.model()))
            .await?;
        let verdict = format_transcript
            .last()
            .map(|m| m.content().to_string())
            .unwrap_or_default();

        let mut conversation = Conversation::new(input, output, transcript);
        conversation.format = serde_json::from_str(&verdict).ok();
        let format_value = conversation.format.clone();

        self.sessions
            .append_conversation(&mut session, conversation)
            .await?;

        let reply = match format_value {
            Some(value) => Reply::from_value(value)?,
            None => Reply::from_json(&verdict)?,
        };

        let rendered = self.dispatcher.render(reply, &user)?;
        info!(
            session_id = %session.id,
            kind = match &rendered {
                RenderedReply::Text { .. } => "text",
                RenderedReply::Flex { .. } => "flex",
            },
            "reply rendered"
        );
        Ok(rendered)
    }
}
