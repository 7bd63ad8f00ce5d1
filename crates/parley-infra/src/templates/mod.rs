//! Flex card templates.
//!
//! Each template decodes a typed value bag and builds a flex container as
//! JSON. [`FlexTemplates`] registers them by name for the dispatcher.

mod login;
mod place;
mod session_menu;
mod weather;

use serde::de::DeserializeOwned;
use serde_json::Value;

use parley_core::reply::TemplateRegistry;
use parley_core::reply::template::{TemplateError, TemplateInfo};
use parley_types::config::LoginConfig;

pub use login::{LoginTemplate, LoginValues};
pub use place::{PlaceTemplate, PlaceValues};
pub use session_menu::{SessionMenuTemplate, SessionMenuValues};
pub use weather::{WeatherTemplate, WeatherValues};

/// One renderable card.
pub trait FlexTemplate: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Schema the format model fills in. Strict: every property required,
    /// no additional properties.
    fn values_schema(&self) -> Value;

    fn build(&self, values: &Value) -> Result<Value, TemplateError>;
}

/// Decode a value bag, reporting any shape mismatch as missing values.
pub(crate) fn decode_values<T: DeserializeOwned>(template: &str, values: &Value) -> Result<T, TemplateError> {
    T::deserialize(values).map_err(|e| TemplateError::MissingValues {
        template: template.to_string(),
        message: e.to_string(),
    })
}

/// Name/value row used by several cards.
pub(crate) fn labeled_row(label: &str, value: &str) -> Value {
    serde_json::json!({
        "type": "box",
        "layout": "horizontal",
        "contents": [
            { "type": "text", "text": label, "size": "sm", "color": "#888888" },
            { "type": "text", "text": value, "size": "sm", "align": "end" }
        ]
    })
}

/// Template registry backing the reply dispatcher.
pub struct FlexTemplates {
    templates: Vec<Box<dyn FlexTemplate>>,
}

impl FlexTemplates {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            templates: Vec::new(),
        }
    }

    /// All built-in cards: login, session menu, weather and place.
    pub fn builtin(login: &LoginConfig) -> Self {
        Self::empty()
            .with(LoginTemplate::new(login.auth_url.clone()))
            .with(SessionMenuTemplate)
            .with(WeatherTemplate)
            .with(PlaceTemplate)
    }

    /// Register a template, replacing any with the same name.
    pub fn with<T: FlexTemplate + 'static>(mut self, template: T) -> Self {
        self.templates.retain(|t| t.name() != template.name());
        self.templates.push(Box::new(template));
        self
    }

    fn get(&self, name: &str) -> Option<&dyn FlexTemplate> {
        self.templates
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }
}

impl TemplateRegistry for FlexTemplates {
    fn templates(&self) -> Vec<TemplateInfo> {
        self.templates
            .iter()
            .map(|t| TemplateInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                values_schema: t.values_schema(),
            })
            .collect()
    }

    fn render(&self, name: &str, values: &Value) -> Result<Vec<u8>, TemplateError> {
        let template = self
            .get(name)
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))?;
        let contents = template.build(values)?;

        serde_json::to_vec(&contents).map_err(|e| TemplateError::Malformed {
            template: name.to_string(),
            message: e.to_string(),
        })
    }

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}
