// Agent errors

use crate::brain::BrainError;
use crate::mcp::McpError;
use crate::transcript::TranscriptError;
use thiserror::Error;

/// Failures that abort a run
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("Inference error: {0}")]
    Inference(#[from] BrainError),

    #[error("Request build error: {0}")]
    RequestBuild(&'static str),

    #[error("Failed to list tools: {0}")]
    ToolCatalog(#[source] McpError),

    #[error("Tool '{name}' failed: {source}")]
    Tool {
        name: String,
        #[source]
        source: McpError,
    },

    #[error("Protocol violation: {0}")]
    Protocol(#[from] TranscriptError),
}
