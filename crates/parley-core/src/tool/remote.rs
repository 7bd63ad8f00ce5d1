//! Tools hosted by a remote server.
//!
//! A [`RemoteToolSource`] exposes a paginated tool listing and a call
//! endpoint over whatever transport it likes. [`discover_remote_tools`]
//! drains the listing and wraps every descriptor as a [`BoxTool`], so remote
//! tools sit in a [`ToolSet`](super::ToolSet) next to local ones.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{BoxTool, Tool, ToolError};

/// Upper bound on listing pages, in case a server keeps handing out cursors.
const MAX_PAGES: usize = 100;

/// A tool definition returned by the listing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema")]
    pub input_schema: Value,
}

fn default_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// One page of the tool listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPage {
    pub tools: Vec<RemoteToolDescriptor>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A server that hosts tools.
pub trait RemoteToolSource: Send + Sync + 'static {
    /// Fetch one page of tool definitions, starting at `cursor`.
    fn list_tools(
        &self,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<ToolPage, ToolError>> + Send;

    /// Invoke a tool by name and return its text output.
    fn call_tool(
        &self,
        name: &str,
        args: Map<String, Value>,
    ) -> impl Future<Output = Result<String, ToolError>> + Send;
}

/// A remote tool bound to the source that serves it.
pub struct RemoteTool<S> {
    source: Arc<S>,
    descriptor: RemoteToolDescriptor,
}

impl<S: RemoteToolSource> RemoteTool<S> {
    pub fn new(source: Arc<S>, descriptor: RemoteToolDescriptor) -> Self {
        Self { source, descriptor }
    }
}

impl<S: RemoteToolSource> Tool for RemoteTool<S> {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn parameters(&self) -> Value {
        self.descriptor.input_schema.clone()
    }

    async fn call(&self, args: Map<String, Value>) -> Result<String, ToolError> {
        self.source.call_tool(&self.descriptor.name, args).await
    }
}

/// List every tool a source offers, following cursors until exhausted.
#[tracing::instrument(name = "discover_remote_tools", skip(source))]
pub async fn discover_remote_tools<S: RemoteToolSource>(
    source: Arc<S>,
) -> Result<Vec<BoxTool>, ToolError> {
    let mut tools = Vec::new();
    let mut seen_cursors = HashSet::new();
    let mut cursor = None;

    for _ in 0..MAX_PAGES {
        let page = source.list_tools(cursor.take()).await?;
        tools.extend(
            page.tools
                .into_iter()
                .map(|descriptor| BoxTool::new(RemoteTool::new(Arc::clone(&source), descriptor))),
        );

        match page.next_cursor {
            Some(next) if !next.is_empty() => {
                if !seen_cursors.insert(next.clone()) {
                    return Err(ToolError::Request(format!(
                        "tool listing repeated cursor '{next}'"
                    )));
                }
                cursor = Some(next);
            }
            _ => {
                tracing::debug!(count = tools.len(), "remote tools discovered");
                return Ok(tools);
            }
        }
    }

    Err(ToolError::Request(format!(
        "tool listing exceeded {MAX_PAGES} pages"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct PagedSource {
        pages: Vec<ToolPage>,
        calls: Mutex<Vec<(String, Map<String, Value>)>>,
    }

    fn descriptor(name: &str) -> RemoteToolDescriptor {
        RemoteToolDescriptor {
            name: name.into(),
            description: format!("{name} tool"),
            input_schema: default_schema(),
        }
    }

    impl RemoteToolSource for PagedSource {
        async fn list_tools(&self, cursor: Option<String>) -> Result<ToolPage, ToolError> {
            let index = match cursor.as_deref() {
                None => 0,
                Some(c) => c.parse::<usize>().map_err(|e| ToolError::Request(e.to_string()))?,
            };
            self.pages
                .get(index)
                .cloned()
                .ok_or_else(|| ToolError::Request("no such page".into()))
        }

        async fn call_tool(&self, name: &str, args: Map<String, Value>) -> Result<String, ToolError> {
            self.calls.lock().push((name.to_string(), args));
            Ok(format!("{name} ok"))
        }
    }

    #[tokio::test]
    async fn follows_cursors_until_exhausted() {
        let source = Arc::new(PagedSource {
            pages: vec![
                ToolPage {
                    tools: vec![descriptor("maps_geocode"), descriptor("maps_search_places")],
                    next_cursor: Some("1".into()),
                },
                ToolPage {
                    tools: vec![descriptor("maps_place_details")],
                    next_cursor: None,
                },
            ],
            calls: Mutex::new(Vec::new()),
        });

        let tools = discover_remote_tools(Arc::clone(&source)).await.unwrap();
        let names: Vec<&str> = tools.iter().map(BoxTool::name).collect();
        assert_eq!(
            names,
            vec!["maps_geocode", "maps_search_places", "maps_place_details"]
        );

        let output = tools[2].call(Map::new()).await.unwrap();
        assert_eq!(output, "maps_place_details ok");
        assert_eq!(source.calls.lock()[0].0, "maps_place_details");
    }

    #[tokio::test]
    async fn repeated_cursor_is_an_error() {
        let source = Arc::new(PagedSource {
            pages: vec![ToolPage {
                tools: vec![descriptor("loop")],
                next_cursor: Some("0".into()),
            }],
            calls: Mutex::new(Vec::new()),
        });

        // First visit to "0" is allowed, the second repeats it.
        let err = discover_remote_tools(source).await.unwrap_err();
        assert!(matches!(err, ToolError::Request(msg) if msg.contains("repeated cursor")));
    }

    #[test]
    fn descriptor_defaults_schema() {
        let descriptor: RemoteToolDescriptor =
            serde_json::from_str(r#"{"name": "time_now"}"#).unwrap();
        assert_eq!(descriptor.input_schema["type"], "object");
        assert_eq!(descriptor.description, "");
    }
}
