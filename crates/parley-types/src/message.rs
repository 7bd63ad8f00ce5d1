//! Role-tagged message values exchanged with the model backend.
//!
//! [`Message`] is a closed union over the four roles. Each variant carries
//! only the fields that are meaningful for it, so a tool result without a
//! call id cannot be constructed, and an unknown role fails to deserialize.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Human,
    Ai,
    Tool,
}

impl Role {
    /// Name used in human-readable transcript dumps.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::Human => "Human",
            Role::Ai => "AI",
            Role::Tool => "Tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::Human => write!(f, "human"),
            Role::Ai => write!(f, "ai"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "human" => Ok(Role::Human),
            "ai" => Ok(Role::Ai),
            "tool" => Ok(Role::Tool),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque id, unique within one assistant message.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// One entry of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    Human {
        content: String,
    },
    Ai {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    /// A final assistant answer (no tool calls).
    pub fn ai(content: impl Into<String>) -> Self {
        Message::Ai {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Ai {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::Human { .. } => Role::Human,
            Message::Ai { .. } => Role::Ai,
            Message::Tool { .. } => Role::Tool,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::Human { content }
            | Message::Ai { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    /// Tool calls carried by an assistant message; empty for every other role.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Ai { tool_calls, .. } => tool_calls,
            Message::System { .. } | Message::Human { .. } | Message::Tool { .. } => &[],
        }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Message::Tool { tool_call_id, .. } => Some(tool_call_id),
            Message::System { .. } | Message::Human { .. } | Message::Ai { .. } => None,
        }
    }

    /// Render the message as a readable block for embedding in prompts.
    ///
    /// Content that parses as a JSON object is re-indented so tool output
    /// stays legible to the formatting model.
    pub fn pretty_format(&self) -> String {
        let mut out = format!("--- {}Message ---\n", self.role().display_name());

        if let Some(id) = self.tool_call_id() {
            out.push_str(&format!("Tool Call ID: {id}\n"));
        }

        let content = self.content();
        match serde_json::from_str::<Value>(content) {
            Ok(value @ Value::Object(_)) => {
                let pretty = serde_json::to_string_pretty(&value).unwrap_or_else(|_| content.to_string());
                out.push_str(&pretty);
            }
            _ => out.push_str(content),
        }
        out.push('\n');

        let calls = self.tool_calls();
        if !calls.is_empty() {
            out.push_str("Tool Calls:\n");
            for call in calls {
                let args = Value::Object(call.arguments.clone());
                out.push_str(&format!("- {} ({}): {}\n", call.name, call.id, args));
            }
        }

        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_display_and_parse() {
        for role in [Role::System, Role::Human, Role::Ai, Role::Tool] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("assistant".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_with_role_tag() {
        let msg = Message::tool_result("call_1", "sunny");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"role": "tool", "content": "sunny", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn final_answer_omits_empty_tool_calls() {
        let value = serde_json::to_value(Message::ai("done")).unwrap();
        assert_eq!(value, json!({"role": "ai", "content": "done"}));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result: Result<Message, _> =
            serde_json::from_str(r#"{"role": "function", "content": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn tool_message_requires_call_id() {
        let result: Result<Message, _> = serde_json::from_str(r#"{"role": "tool", "content": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn pretty_format_indents_json_objects() {
        let msg = Message::tool_result("call_9", r#"{"temp":21}"#);
        let out = msg.pretty_format();
        assert!(out.starts_with("--- ToolMessage ---\n"));
        assert!(out.contains("Tool Call ID: call_9"));
        assert!(out.contains("\"temp\": 21"));
    }

    #[test]
    fn pretty_format_lists_tool_calls() {
        let mut args = Map::new();
        args.insert("latitude".into(), json!(25.03));
        let msg = Message::ai_with_tool_calls(
            "",
            vec![ToolCall {
                id: "c1".into(),
                name: "get_weather".into(),
                arguments: args,
            }],
        );
        let out = msg.pretty_format();
        assert!(out.starts_with("--- AIMessage ---"));
        assert!(out.contains("- get_weather (c1): {\"latitude\":25.03}"));
    }
}
