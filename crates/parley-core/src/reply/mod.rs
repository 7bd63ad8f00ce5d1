//! Two-stage reply pipeline and template dispatch.

pub mod dispatch;
pub mod pipeline;
pub mod template;

use parley_types::reply::ReplyParseError;

use crate::agent::engine::AgentError;
use crate::session::SessionError;
use crate::vault::VaultError;
use template::TemplateError;

pub use dispatch::{MintedLink, TemplateDispatcher};
pub use pipeline::ReplyPipeline;
pub use template::{TemplateInfo, TemplateRegistry};

/// Fatal outcomes of one turn.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to build prompt: {0}")]
    Prompt(#[from] serde_json::Error),

    #[error("malformed structured reply: {0}")]
    MalformedReply(#[from] ReplyParseError),

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("missing values for template '{template}': {message}")]
    MissingTemplateValues { template: String, message: String },

    #[error("template '{template}' rendered an invalid payload: {message}")]
    Template { template: String, message: String },

    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl ReplyError {
    /// True when the turn failed because of what a model produced, as
    /// opposed to a backend, storage or caller problem.
    pub fn is_model_fault(&self) -> bool {
        match self {
            ReplyError::Agent(e) => e.is_model_fault(),
            ReplyError::MalformedReply(_)
            | ReplyError::UnknownTemplate(_)
            | ReplyError::MissingTemplateValues { .. } => true,
            ReplyError::Session(_)
            | ReplyError::Prompt(_)
            | ReplyError::Template { .. }
            | ReplyError::Vault(_) => false,
        }
    }
}

impl From<TemplateError> for ReplyError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Unknown(name) => ReplyError::UnknownTemplate(name),
            TemplateError::MissingValues { template, message } => {
                ReplyError::MissingTemplateValues { template, message }
            }
            TemplateError::Malformed { template, message } => {
                ReplyError::Template { template, message }
            }
        }
    }
}
