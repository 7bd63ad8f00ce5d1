//! Tools offered to the content stage: the local weather tool and tools
//! discovered on MCP servers.

pub mod mcp;
pub mod weather;

pub use mcp::McpHttpSource;
pub use weather::WeatherTool;
