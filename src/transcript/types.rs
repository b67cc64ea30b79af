// Transcript data types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry {
    /// Input typed or scripted by the user
    UserText { text: String },

    /// Conversational output from the model
    AssistantText { text: String },

    /// Tool invocation requested by the model
    AssistantToolCall {
        call_id: String,
        tool_name: String,
        #[serde(default)]
        arguments: Value,
    },

    /// Materialized output of a tool invocation
    ToolResult {
        call_id: String,
        content: Vec<ResultBlock>,
        /// The tool reported failure
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl Entry {
    pub fn user_text(text: impl Into<String>) -> Self {
        Entry::UserText { text: text.into() }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Entry::AssistantText { text: text.into() }
    }

    pub fn tool_call(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Entry::AssistantToolCall {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: Vec<ResultBlock>) -> Self {
        Entry::ToolResult {
            call_id: call_id.into(),
            content,
            is_error: false,
        }
    }

    /// Result of a tool that reported failure
    pub fn tool_error(call_id: impl Into<String>, content: Vec<ResultBlock>) -> Self {
        Entry::ToolResult {
            call_id: call_id.into(),
            content,
            is_error: true,
        }
    }

    pub fn is_tool_call(&self) -> bool {
        matches!(self, Entry::AssistantToolCall { .. })
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, Entry::ToolResult { .. })
    }

    /// Call id for tool call and tool result entries
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Entry::AssistantToolCall { call_id, .. } | Entry::ToolResult { call_id, .. } => {
                Some(call_id)
            }
            Entry::UserText { .. } | Entry::AssistantText { .. } => None,
        }
    }
}

/// One block of a tool result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultBlock {
    Text { text: String },

    /// Reference to an artifact already written to disk
    ImageRef { path: PathBuf, mime_type: String },
}

impl ResultBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ResultBlock::Text { text: text.into() }
    }

    /// Text form of the block as shown to the model
    pub fn to_llm_text(&self) -> String {
        match self {
            ResultBlock::Text { text } => text.clone(),
            ResultBlock::ImageRef { path, .. } => format!("Image saved to: {}", path.display()),
        }
    }
}
