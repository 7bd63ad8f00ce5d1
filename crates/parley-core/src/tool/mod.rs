//! Tools the model may call mid-turn.
//!
//! [`Tool`] is the capability contract. [`BoxTool`] erases it for storage in
//! a [`ToolSet`], which the agent loop resolves calls against by name.

pub mod remote;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};

use parley_types::llm::ToolDefinition;

/// Errors raised by a tool invocation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("execution failed: {0}")]
    Execution(String),
}

/// A named, schema-described callable.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the argument object.
    fn parameters(&self) -> Value;

    /// Run the tool. The returned text is fed back to the model verbatim.
    fn call(
        &self,
        args: Map<String, Value>,
    ) -> impl Future<Output = Result<String, ToolError>> + Send;
}

/// Object-safe version of [`Tool`] with a boxed future.
pub trait ToolDyn: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    fn call_boxed(
        &self,
        args: Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>>;
}

impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> &str {
        Tool::description(self)
    }

    fn parameters(&self) -> Value {
        Tool::parameters(self)
    }

    fn call_boxed(
        &self,
        args: Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        Box::pin(self.call(args))
    }
}

/// Type-erased tool handle.
#[derive(Clone)]
pub struct BoxTool {
    inner: Arc<dyn ToolDyn>,
}

impl BoxTool {
    pub fn new<T: Tool + 'static>(tool: T) -> Self {
        Self {
            inner: Arc::new(tool),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn description(&self) -> &str {
        self.inner.description()
    }

    pub fn parameters(&self) -> Value {
        self.inner.parameters()
    }

    pub async fn call(&self, args: Map<String, Value>) -> Result<String, ToolError> {
        self.inner.call_boxed(args).await
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl std::fmt::Debug for BoxTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxTool").field("name", &self.name()).finish()
    }
}

/// Tools available to one agent, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: BTreeMap<String, BoxTool>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any earlier tool with the same name.
    pub fn insert(&mut self, tool: BoxTool) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn with(mut self, tool: BoxTool) -> Self {
        self.insert(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&BoxTool> {
        self.tools.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Declarations sent to the backend, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(BoxTool::definition).collect()
    }
}

impl FromIterator<BoxTool> for ToolSet {
    fn from_iter<I: IntoIterator<Item = BoxTool>>(iter: I) -> Self {
        let mut set = ToolSet::new();
        for tool in iter {
            set.insert(tool);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text argument"
        }

        fn parameters(&self) -> Value {
            json!({ "type": "object", "properties": { "text": { "type": "string" } } })
        }

        async fn call(&self, args: Map<String, Value>) -> Result<String, ToolError> {
            args.get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ToolError::InvalidArguments("missing text".into()))
        }
    }

    #[tokio::test]
    async fn box_tool_delegates() {
        let tool = BoxTool::new(Echo);
        let mut args = Map::new();
        args.insert("text".into(), json!("hello"));

        assert_eq!(tool.call(args).await.unwrap(), "hello");
        assert!(matches!(
            tool.call(Map::new()).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn tool_set_definitions() {
        let set: ToolSet = [BoxTool::new(Echo)].into_iter().collect();
        let defs = set.definitions();
        assert_eq!(set.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].description, "Echo the text argument");
        assert!(set.get("echo").is_some());
        assert!(set.get("missing").is_none());
    }
}
