// Tool transport trait

use crate::mcp::{CallToolResult, Result, ToolDescriptor};
use async_trait::async_trait;

/// Session handle to a tool server
///
/// Connection setup happens before a value of this type exists; the agent
/// loop only lists and calls tools.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Tools currently advertised by the server
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool and wait for its result
    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<CallToolResult>;
}
