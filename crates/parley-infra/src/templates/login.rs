use serde::Deserialize;
use serde_json::{Value, json};

use parley_core::reply::template::TemplateError;

use super::{FlexTemplate, decode_values};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginValues {
    pub title: String,
    pub description: String,
}

/// Account binding card with a button to the configured auth page.
pub struct LoginTemplate {
    auth_url: String,
}

impl LoginTemplate {
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
        }
    }
}

impl FlexTemplate for LoginTemplate {
    fn name(&self) -> &'static str {
        "login"
    }

    fn description(&self) -> &'static str {
        "Ask the user to sign in and bind their account"
    }

    fn values_schema(&self) -> Value {
        json!({
            "type": "object",
            "description": "Values for the login template",
            "properties": {
                "title": { "type": "string" },
                "description": { "type": "string" }
            },
            "required": ["title", "description"],
            "additionalProperties": false
        })
    }

    fn build(&self, values: &Value) -> Result<Value, TemplateError> {
        let values: LoginValues = decode_values(self.name(), values)?;

        Ok(json!({
            "type": "bubble",
            "body": {
                "type": "box",
                "layout": "vertical",
                "contents": [
                    {
                        "type": "text",
                        "text": values.title,
                        "weight": "bold",
                        "size": "lg",
                        "align": "center",
                        "margin": "md"
                    },
                    {
                        "type": "text",
                        "text": values.description,
                        "size": "sm",
                        "color": "#888888",
                        "align": "center",
                        "wrap": true,
                        "margin": "md"
                    },
                    {
                        "type": "button",
                        "margin": "lg",
                        "action": { "type": "uri", "label": "Sign in", "uri": self.auth_url },
                        "style": "primary",
                        "color": "#1DB446"
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
    fn button_links_to_auth_url() {
        let card = LoginTemplate::new("https://auth.example.com/bind")
            .build(&json!({ "title": "Sign in", "description": "Bind \"your\" account" }))
            .unwrap();

        let contents = &card["body"]["contents"];
        assert_eq!(contents[0]["text"], "Sign in");
        assert_eq!(contents[1]["text"], "Bind \"your\" account");
        assert_eq!(contents[2]["action"]["uri"], "https://auth.example.com/bind");
    }

    #[test]
    fn missing_description() {
        let err = LoginTemplate::new("https://auth.example.com")
            .build(&json!({ "title": "Sign in" }))
            .unwrap_err();
        assert!(matches!(err, TemplateError::MissingValues { template, .. } if template == "login"));
    }
}
