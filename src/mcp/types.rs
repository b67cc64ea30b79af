// Data types for the tool transport - aligned with the MCP wire format

use rmcp::model::RawContent;
use serde::{Deserialize, Serialize};

/// Tool advertised by the tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: serde_json::Value,
}

/// Raw content block returned by a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawBlock {
    Text {
        #[serde(default)]
        text: String,
    },

    /// Base64-encoded binary image
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// Content kinds this client does not handle (audio, resources, ...)
    #[serde(other)]
    Unsupported,
}

/// Result of `tools/call`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<RawBlock>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![RawBlock::Text { text: text.into() }],
            is_error: false,
        }
    }
}

impl From<rmcp::model::Tool> for ToolDescriptor {
    fn from(tool: rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            description: tool.description.map(|d| d.into_owned()),
            input_schema: serde_json::Value::Object(tool.input_schema.as_ref().clone()),
        }
    }
}

impl From<rmcp::model::Content> for RawBlock {
    fn from(content: rmcp::model::Content) -> Self {
        match content.raw {
            RawContent::Text(text) => RawBlock::Text { text: text.text },
            RawContent::Image(image) => RawBlock::Image {
                data: image.data,
                mime_type: image.mime_type,
            },
            _ => RawBlock::Unsupported,
        }
    }
}

impl From<rmcp::model::CallToolResult> for CallToolResult {
    fn from(result: rmcp::model::CallToolResult) -> Self {
        Self {
            content: result.content.into_iter().map(RawBlock::from).collect(),
            is_error: result.is_error.unwrap_or(false),
        }
    }
}

/// Marker some tool servers put in the first text block when the tool
/// gave up waiting on its own downstream (e.g. a browser navigation).
pub const TIMEOUT_MARKER: &str = "Timeout";

/// Whether a tool result signals a downstream timeout.
///
/// Substring heuristic on the first text block; the server has no
/// structured status for this.
pub fn is_timeout_marker(content: &[RawBlock]) -> bool {
    content
        .iter()
        .find_map(|block| match block {
            RawBlock::Text { text } => Some(text),
            _ => None,
        })
        .is_some_and(|text| text.contains(TIMEOUT_MARKER))
}
