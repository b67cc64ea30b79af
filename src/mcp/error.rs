// Error types for the tool transport

use thiserror::Error;

/// Tool transport errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Unsupported server script '{0}': expected a .py or .js file")]
    UnsupportedScript(String),

    #[error("Failed to spawn tool server '{0}': {1}")]
    SpawnFailed(String, String),

    #[error("MCP handshake failed: {0}")]
    Handshake(String),

    #[error("'{method}' failed: {message}")]
    Service {
        method: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read server config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, McpError>;
