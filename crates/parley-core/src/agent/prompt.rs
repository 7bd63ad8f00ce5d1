//! System prompts for the two pipeline stages.
//!
//! Both templates can be overridden from config. Placeholders use the
//! `{{name}}` form and are replaced verbatim in a single pass, so text
//! inside a substituted value is never expanded again.

use parley_types::message::Message;
use parley_types::session::Session;
use parley_types::user::User;

/// Shown in place of the profile when the user has not bound an account.
pub const NULL_PROFILE: &str = "(NULL)";

/// Default content-stage prompt.
pub const CONTENT_SYSTEM_PROMPT: &str = r#"You are the primary assistant in a two-stage reply system.

Your stage produces the content of the answer. A second agent will turn your answer into a chat message
afterwards, so concentrate on accuracy and completeness rather than layout.

<UserProfile>
{{user_profile}}
</UserProfile>
If <UserProfile> is (NULL), ask the user to bind their account before doing anything that needs it.

<SessionSummary>
{{summary}}
</SessionSummary>

Instructions:
1. When a tool can answer the question, call it instead of relying on your own knowledge.
2. Never invent coordinates. Geocode a place name first when a tool needs a location.
3. If a question needs the user's location and none is known, ask for it politely.
4. Include the concrete data points returned by tools (temperature, humidity, wind, addresses, ratings).
5. When the user wants to manage conversations or sign in, explain the available options clearly.
6. Present data-rich answers in a structured way so the formatting agent can choose a card template."#;

/// Default format-stage prompt.
pub const FORMAT_SYSTEM_PROMPT: &str = r#"You format the final answer of another assistant into a chat message.

The complete conversation of this turn, including tool calls and their outputs, is below.

<Messages>
{{messages}}
</Messages>

Format the FINAL assistant answer.

Output rules:
- Return one JSON object with all fields: "type", "text", "flex", "quickReply".
- "type" is "text" or "flex".
- For "text": fill "text" with {"text": "..."} and set "flex" to null.
- For "flex": set "text" to null and fill "flex" with "altText", "flex" and "templateSpec".
  - To use a template: set "flex" to an empty string and fill "templateSpec".
  - To write a custom card: put the card JSON in "flex" as a string and set "templateSpec" to null.
- "templateSpec.values" has one key per template. Fill only the chosen template's key and set the others to null.

Available templates:
{{templates}}

Choose a template only when the answer is clearly a data card (weather report, place details, sign-in,
session list). Conversational or explanatory answers are "text". When in doubt, choose "text".

Quick replies:
- Suggest 2 to 5 follow-ups, at most 20 characters each, in the user's language.
- They may start with an emoji."#;

/// Assembles the messages sent to each stage.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    content_template: String,
    format_template: String,
    history_window: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            content_template: CONTENT_SYSTEM_PROMPT.to_string(),
            format_template: FORMAT_SYSTEM_PROMPT.to_string(),
            history_window: 5,
        }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content-stage template. `None` keeps the default.
    pub fn with_content_template(mut self, template: Option<String>) -> Self {
        if let Some(template) = template.filter(|t| !t.trim().is_empty()) {
            self.content_template = template;
        }
        self
    }

    /// Replace the format-stage template. `None` keeps the default.
    pub fn with_format_template(mut self, template: Option<String>) -> Self {
        if let Some(template) = template.filter(|t| !t.trim().is_empty()) {
            self.format_template = template;
        }
        self
    }

    pub fn with_history_window(mut self, pairs: usize) -> Self {
        self.history_window = pairs;
        self
    }

    /// System prompt, recent history from the latest conversation, then the
    /// new human message.
    pub fn content_messages(
        &self,
        user: &User,
        session: &Session,
        input: &str,
    ) -> Result<Vec<Message>, serde_json::Error> {
        let profile = match (&user.profile, user.verified) {
            (Some(profile), true) => serde_json::to_string(profile)?,
            _ => NULL_PROFILE.to_string(),
        };

        let system = fill_placeholders(
            &self.content_template,
            &[
                ("{{user_profile}}", profile.as_str()),
                ("{{summary}}", session.summary.as_str()),
            ],
        );

        let mut messages = vec![Message::system(system)];
        if let Some(latest) = session.latest_conversation() {
            messages.extend(latest.trim_messages(self.history_window));
        }
        messages.push(Message::human(input));

        Ok(messages)
    }

    /// Format-stage prompt embedding the content transcript (minus its
    /// system prompt), followed by the human message.
    pub fn format_messages(&self, transcript: &[Message], input: &str, templates: &str) -> Vec<Message> {
        let rendered: String = transcript
            .iter()
            .skip_while(|m| matches!(m, Message::System { .. }))
            .map(Message::pretty_format)
            .collect();

        let system = fill_placeholders(
            &self.format_template,
            &[("{{messages}}", rendered.as_str()), ("{{templates}}", templates)],
        );

        vec![Message::system(system), Message::human(input)]
    }
}

/// Replace each `(placeholder, value)` pair in `template` in one left to
/// right scan.
pub(crate) fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        match values.iter().find(|(placeholder, _)| rest.starts_with(placeholder)) {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &rest[placeholder.len()..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
