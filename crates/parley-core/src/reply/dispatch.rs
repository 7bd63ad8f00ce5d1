//! Turns a validated [`Reply`] into a [`RenderedReply`].
//!
//! Templates whose values must come from the server (one-time links) are
//! registered as [`MintedLink`]s. For those the model's value bag is
//! ignored and the dispatcher mints a vault token and builds the URL itself.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Value, json};

use parley_types::reply::{FlexBody, RenderedReply, Reply};
use parley_types::user::User;

use super::ReplyError;
use super::template::{TemplateError, TemplateRegistry};
use crate::vault::TokenVault;

/// Template rendered from the session list link.
pub const SESSION_MENU_TEMPLATE: &str = "session_menu";

/// Vault action redeemed by the session list page.
pub const LIST_SESSIONS_ACTION: &str = "list_sessions";

/// A template value that is a server-minted one-time link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedLink {
    /// Vault action bound to the token.
    pub action: String,
    /// Path below the base URL; `{username}` is substituted.
    pub path: String,
    /// Key under which the URL is handed to the template.
    pub value_key: String,
}

impl MintedLink {
    pub fn session_list() -> Self {
        Self {
            action: LIST_SESSIONS_ACTION.to_string(),
            path: "/users/{username}/session/list".to_string(),
            value_key: "list_sessions_url".to_string(),
        }
    }
}

pub struct TemplateDispatcher<T> {
    registry: Arc<T>,
    vault: Arc<TokenVault>,
    base_url: String,
    minted: HashMap<String, MintedLink>,
}

impl<T: TemplateRegistry> TemplateDispatcher<T> {
    /// Dispatcher with the session menu link registered.
    pub fn new(registry: Arc<T>, vault: Arc<TokenVault>, base_url: impl Into<String>) -> Self {
        let mut minted = HashMap::new();
        minted.insert(SESSION_MENU_TEMPLATE.to_string(), MintedLink::session_list());

        Self {
            registry,
            vault,
            base_url: base_url.into(),
            minted,
        }
    }

    pub fn registry(&self) -> &T {
        &self.registry
    }

    /// Bullet list of templates for the format prompt.
    pub fn catalog(&self) -> String {
        self.registry
            .templates()
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render(&self, reply: Reply, user: &User) -> Result<RenderedReply, ReplyError> {
        match reply {
            Reply::Text {
                text,
                quick_replies,
            } => Ok(RenderedReply::Text {
                text,
                quick_replies,
            }),
            Reply::Flex {
                alt_text,
                body,
                quick_replies,
            } => {
                let contents = match body {
                    FlexBody::Inline(contents) => contents,
                    FlexBody::Template { name, values } => {
                        self.render_template(&name, values, user)?
                    }
                };
                Ok(RenderedReply::Flex {
                    alt_text,
                    contents,
                    quick_replies,
                })
            }
        }
    }

    fn render_template(
        &self,
        name: &str,
        model_values: Option<Value>,
        user: &User,
    ) -> Result<Value, ReplyError> {
        if !self.registry.contains(name) {
            return Err(ReplyError::UnknownTemplate(name.to_string()));
        }

        let values = match self.minted.get(name) {
            Some(link) => {
                if model_values.is_some() {
                    tracing::debug!(template = name, "ignoring model values for minted template");
                }
                self.mint(link, user)?
            }
            None => model_values.ok_or_else(|| ReplyError::MissingTemplateValues {
                template: name.to_string(),
                message: "no values supplied".to_string(),
            })?,
        };

        let bytes = self.registry.render(name, &values)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            TemplateError::Malformed {
                template: name.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn mint(&self, link: &MintedLink, user: &User) -> Result<Value, ReplyError> {
        let token = self.vault.generate(&user.id, &link.action, Value::Null)?;
        let path = link.path.replace("{username}", user.username());
        let url = format!(
            "{}{}?token={}",
            self.base_url.trim_end_matches('/'),
            path,
            token
        );

        let mut values = serde_json::Map::new();
        values.insert(link.value_key.clone(), json!(url));
        Ok(Value::Object(values))
    }
}
