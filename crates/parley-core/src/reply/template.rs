//! Template registry port.
//!
//! Templates are registered and looked up purely by name. Each declares the
//! JSON Schema of the values it needs, which is folded into the format
//! stage's output schema.

use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template '{0}'")]
    Unknown(String),

    #[error("missing values for template '{template}': {message}")]
    MissingValues { template: String, message: String },

    #[error("template '{template}' produced a malformed payload: {message}")]
    Malformed { template: String, message: String },
}

/// Public description of one registered template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateInfo {
    pub name: String,
    /// One line telling the format model when to pick this template.
    pub description: String,
    pub values_schema: Value,
}

/// Named renderers for rich replies.
pub trait TemplateRegistry: Send + Sync {
    /// Registered templates, in registration order.
    fn templates(&self) -> Vec<TemplateInfo>;

    /// Render `name` with `values` into a serialized payload.
    fn render(&self, name: &str, values: &Value) -> Result<Vec<u8>, TemplateError>;

    fn contains(&self, name: &str) -> bool {
        self.templates().iter().any(|t| t.name == name)
    }
}
