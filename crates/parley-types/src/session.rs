//! Session and conversation aggregate.
//!
//! A [`Session`] is a user's durable dialogue: an append-only list of
//! [`Conversation`]s plus a rolling summary. Each conversation records one
//! turn, from the verbatim input to the rendered reply artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

/// One persisted turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// The user's text, verbatim.
    pub input: String,
    /// Content of the final assistant message.
    pub output: String,
    /// Structured verdict produced by the format stage, stored as-is.
    #[serde(default)]
    pub format: Option<serde_json::Value>,
    /// Full content-stage transcript for this turn.
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(input: impl Into<String>, output: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            id: Uuid::now_v7(),
            input: input.into(),
            output: output.into(),
            format: None,
            messages,
            created_at: Utc::now(),
        }
    }

    /// Recent dialogue from this turn's transcript. See [`history_window`].
    pub fn trim_messages(&self, last_n: usize) -> Vec<Message> {
        history_window(&self.messages, last_n)
    }
}

/// Extract the last `last_n` human/final-answer pairs from a transcript.
///
/// Each human message is paired with the next assistant message that has no
/// tool calls. Tool-calling assistant messages and tool results are never
/// part of the window. A human message that is followed by another human
/// message before any final answer is replaced by the later one, and a
/// trailing human message without an answer is dropped.
pub fn history_window(messages: &[Message], last_n: usize) -> Vec<Message> {
    if last_n == 0 {
        return Vec::new();
    }

    let mut pairs: Vec<(&Message, &Message)> = Vec::new();
    let mut pending: Option<&Message> = None;

    for msg in messages {
        match msg {
            Message::Human { .. } => pending = Some(msg),
            Message::Ai { tool_calls, .. } if tool_calls.is_empty() => {
                if let Some(human) = pending.take() {
                    pairs.push((human, msg));
                }
            }
            Message::Ai { .. } | Message::Tool { .. } | Message::System { .. } => {}
        }
    }

    let start = pairs.len().saturating_sub(last_n);
    pairs[start..]
        .iter()
        .flat_map(|(human, ai)| [(*human).clone(), (*ai).clone()])
        .collect()
}

/// Durable per-user dialogue history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    /// Rolling condensed summary of all conversations so far.
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.into(),
            summary: String::new(),
            conversations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn latest_conversation(&self) -> Option<&Conversation> {
        self.conversations.last()
    }

    /// Append a finished conversation, replacing the summary when one is given.
    ///
    /// `None` keeps the previous summary.
    pub fn record(&mut self, conversation: Conversation, summary: Option<String>) {
        self.conversations.push(conversation);
        if let Some(summary) = summary {
            self.summary = summary;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;

    fn tool_turn() -> Vec<Message> {
        vec![
            Message::human("hi"),
            Message::ai_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "1".into(),
                    name: "f".into(),
                    arguments: Default::default(),
                }],
            ),
            Message::tool_result("1", "r"),
            Message::ai("final answer"),
            Message::human("bye"),
        ]
    }

    #[test]
    fn window_skips_tool_traffic_and_orphans() {
        let window = history_window(&tool_turn(), 5);
        assert_eq!(window, vec![Message::human("hi"), Message::ai("final answer")]);
    }

    #[test]
    fn zero_window_is_empty() {
        assert!(history_window(&tool_turn(), 0).is_empty());
    }

    #[test]
    fn window_keeps_only_last_pairs_in_order() {
        let mut messages = vec![Message::system("prompt")];
        for i in 0..4 {
            messages.push(Message::human(format!("q{i}")));
            messages.push(Message::ai(format!("a{i}")));
        }

        let window = history_window(&messages, 2);
        assert_eq!(
            window,
            vec![
                Message::human("q2"),
                Message::ai("a2"),
                Message::human("q3"),
                Message::ai("a3"),
            ]
        );
    }

    #[test]
    fn ai_without_pending_human_is_ignored() {
        let messages = vec![Message::ai("greeting"), Message::human("q"), Message::ai("a")];
        assert_eq!(
            history_window(&messages, 5),
            vec![Message::human("q"), Message::ai("a")]
        );
    }

    #[test]
    fn record_keeps_summary_when_none() {
        let mut session = Session::new("U1");
        session.summary = "old".into();

        session.record(Conversation::new("hi", "hello", vec![]), None);
        assert_eq!(session.summary, "old");
        assert_eq!(session.conversations.len(), 1);

        session.record(Conversation::new("again", "sure", vec![]), Some("new".into()));
        assert_eq!(session.summary, "new");
        assert_eq!(session.latest_conversation().unwrap().input, "again");
    }

    #[test]
    fn conversation_trim_uses_its_transcript() {
        let conv = Conversation::new("bye", "", tool_turn());
        assert_eq!(conv.trim_messages(1).len(), 2);
    }
}
