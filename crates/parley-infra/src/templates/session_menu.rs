use serde::Deserialize;
use serde_json::{Value, json};

use parley_core::reply::template::TemplateError;

use super::{FlexTemplate, decode_values};

/// Filled by the server with a freshly minted one-time link.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionMenuValues {
    pub list_sessions_url: String,
}

/// Card linking to the session list page.
pub struct SessionMenuTemplate;

impl FlexTemplate for SessionMenuTemplate {
    fn name(&self) -> &'static str {
        "session_menu"
    }

    fn description(&self) -> &'static str {
        "Let the user list, switch or delete their conversation sessions"
    }

    /// The model supplies nothing here; the link is minted server-side.
    fn values_schema(&self) -> Value {
        json!({
            "type": "object",
            "description": "Values for the session menu template",
            "properties": {},
            "required": [],
            "additionalProperties": false
        })
    }

    fn build(&self, values: &Value) -> Result<Value, TemplateError> {
        let values: SessionMenuValues = decode_values(self.name(), values)?;

        Ok(json!({
            "type": "bubble",
            "body": {
                "type": "box",
                "layout": "vertical",
                "contents": [
                    {
                        "type": "text",
                        "text": "🗂️ Sessions",
                        "weight": "bold",
                        "size": "lg",
                        "align": "center"
                    },
                    {
                        "type": "text",
                        "text": "Manage all of your conversations",
                        "size": "sm",
                        "color": "#888888",
                        "align": "center",
                        "margin": "md"
                    },
                    { "type": "separator", "margin": "lg" },
                    {
                        "type": "button",
                        "action": {
                            "type": "uri",
                            "label": "📋 View sessions",
                            "uri": values.list_sessions_url
                        },
                        "style": "primary",
                        "margin": "lg"
                    }
                ]
            },
            "footer": {
                "type": "box",
                "layout": "vertical",
                "contents": [
                    {
                        "type": "text",
                        "text": "⚠️ This link works once",
                        "size": "xs",
                        "color": "#888888",
                        "align": "center"
                    }
                ]
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_carries_link() {
        let url = "https://bot.example.com/users/alice/session/list?token=abc";
        let card = SessionMenuTemplate
            .build(&json!({ "list_sessions_url": url }))
            .unwrap();
        assert_eq!(card["body"]["contents"][3]["action"]["uri"], url);
    }

    #[test]
    fn requires_link() {
        assert!(matches!(
            SessionMenuTemplate.build(&json!({})),
            Err(TemplateError::MissingValues { .. })
        ));
    }
}
