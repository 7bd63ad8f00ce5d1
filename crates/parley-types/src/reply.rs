//! Reply verdicts produced by the format stage.
//!
//! The model emits a JSON document shaped by [`reply_schema`]. That wire
//! shape is loose: every field is present but most may be null. [`Reply`]
//! is the validated form, a closed union where a flex reply holds exactly
//! one of an inline payload or a template reference.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Maximum number of quick-reply suggestions.
pub const MAX_QUICK_REPLIES: usize = 13;

/// Maximum length of one quick-reply label, in characters.
pub const MAX_QUICK_REPLY_CHARS: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplyParseError {
    #[error("structured output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("reply type is text but no text was given")]
    MissingText,

    #[error("reply type is flex but no flex body was given")]
    MissingFlex,

    #[error("flex reply carries both an inline payload and a template")]
    AmbiguousFlex,

    #[error("flex reply carries neither an inline payload nor a template")]
    EmptyFlex,

    #[error("inline flex payload is not valid JSON: {0}")]
    InvalidInlineFlex(String),

    #[error("too many quick replies: {0} (max 13)")]
    TooManyQuickReplies(usize),

    #[error("quick reply '{0}' exceeds 20 characters")]
    QuickReplyTooLong(String),
}

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ReplyKind {
    Text,
    Flex,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyDraft {
    #[serde(rename = "type")]
    kind: ReplyKind,
    #[serde(default)]
    text: Option<TextDraft>,
    #[serde(default)]
    flex: Option<FlexDraft>,
    #[serde(default)]
    quick_reply: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TextDraft {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlexDraft {
    #[serde(default)]
    alt_text: String,
    #[serde(default)]
    flex: Option<String>,
    #[serde(default)]
    template_spec: Option<TemplateSpecDraft>,
}

#[derive(Debug, Deserialize)]
struct TemplateSpecDraft {
    template: String,
    #[serde(default)]
    values: Option<Map<String, Value>>,
}

// ---------------------------------------------------------------------------
// Validated reply
// ---------------------------------------------------------------------------

/// Body of a flex reply.
#[derive(Debug, Clone, PartialEq)]
pub enum FlexBody {
    /// A complete payload written by the model.
    Inline(Value),
    /// A named server-side template plus the model's values for it, if any.
    Template { name: String, values: Option<Value> },
}

/// Validated format-stage verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text {
        text: String,
        quick_replies: Vec<String>,
    },
    Flex {
        alt_text: String,
        body: FlexBody,
        quick_replies: Vec<String>,
    },
}

impl Reply {
    /// Parse and validate the final content of the format stage.
    pub fn from_json(raw: &str) -> Result<Self, ReplyParseError> {
        let draft: ReplyDraft =
            serde_json::from_str(raw).map_err(|e| ReplyParseError::InvalidJson(e.to_string()))?;
        Self::from_draft(draft)
    }

    /// Validate an already-decoded verdict.
    pub fn from_value(value: Value) -> Result<Self, ReplyParseError> {
        let draft: ReplyDraft =
            serde_json::from_value(value).map_err(|e| ReplyParseError::InvalidJson(e.to_string()))?;
        Self::from_draft(draft)
    }

    fn from_draft(draft: ReplyDraft) -> Result<Self, ReplyParseError> {
        let quick_replies = validate_quick_replies(draft.quick_reply.unwrap_or_default())?;

        match draft.kind {
            ReplyKind::Text => {
                let text = draft.text.ok_or(ReplyParseError::MissingText)?.text;
                Ok(Reply::Text {
                    text,
                    quick_replies,
                })
            }
            ReplyKind::Flex => {
                let flex = draft.flex.ok_or(ReplyParseError::MissingFlex)?;
                let inline = flex.flex.filter(|s| !s.trim().is_empty());

                let body = match (inline, flex.template_spec) {
                    (Some(_), Some(_)) => return Err(ReplyParseError::AmbiguousFlex),
                    (None, None) => return Err(ReplyParseError::EmptyFlex),
                    (Some(raw), None) => FlexBody::Inline(
                        serde_json::from_str(&raw)
                            .map_err(|e| ReplyParseError::InvalidInlineFlex(e.to_string()))?,
                    ),
                    (None, Some(spec)) => {
                        let values = spec
                            .values
                            .and_then(|mut bag| bag.remove(&spec.template))
                            .filter(|v| !v.is_null());
                        FlexBody::Template {
                            name: spec.template,
                            values,
                        }
                    }
                };

                Ok(Reply::Flex {
                    alt_text: flex.alt_text,
                    body,
                    quick_replies,
                })
            }
        }
    }
}

fn validate_quick_replies(items: Vec<String>) -> Result<Vec<String>, ReplyParseError> {
    if items.len() > MAX_QUICK_REPLIES {
        return Err(ReplyParseError::TooManyQuickReplies(items.len()));
    }
    if let Some(long) = items.iter().find(|s| s.chars().count() > MAX_QUICK_REPLY_CHARS) {
        return Err(ReplyParseError::QuickReplyTooLong(long.clone()));
    }
    Ok(items)
}

/// A reply ready for the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderedReply {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        quick_replies: Vec<String>,
    },
    Flex {
        alt_text: String,
        contents: Value,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        quick_replies: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

fn nullable(schema: Value) -> Value {
    json!({ "anyOf": [schema, { "type": "null" }] })
}

/// Strict JSON Schema for the format-stage output.
///
/// `templates` lists every registered template with the schema of its
/// values. The `values` object has one key per template; the model fills
/// the key matching its choice and sets the others to null.
pub fn reply_schema(templates: &[(String, Value)]) -> Value {
    let names: Vec<&str> = templates.iter().map(|(name, _)| name.as_str()).collect();

    let mut value_props = Map::new();
    for (name, schema) in templates {
        value_props.insert(name.clone(), nullable(schema.clone()));
    }

    json!({
        "type": "object",
        "properties": {
            "type": { "type": "string", "enum": ["text", "flex"] },
            "text": nullable(json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"],
                "additionalProperties": false
            })),
            "flex": nullable(json!({
                "type": "object",
                "properties": {
                    "altText": { "type": "string" },
                    "flex": {
                        "type": "string",
                        "description": "Inline flex JSON encoded as a string; empty when a template is used"
                    },
                    "templateSpec": nullable(json!({
                        "type": "object",
                        "properties": {
                            "template": { "type": "string", "enum": names },
                            "values": {
                                "type": "object",
                                "properties": value_props,
                                "required": names,
                                "additionalProperties": false
                            }
                        },
                        "required": ["template", "values"],
                        "additionalProperties": false
                    }))
                },
                "required": ["altText", "flex", "templateSpec"],
                "additionalProperties": false
            })),
            "quickReply": {
                "type": "array",
                "maxItems": MAX_QUICK_REPLIES,
                "items": { "type": "string", "maxLength": MAX_QUICK_REPLY_CHARS }
            }
        },
        "required": ["type", "text", "flex", "quickReply"],
        "additionalProperties": false
    })
}
