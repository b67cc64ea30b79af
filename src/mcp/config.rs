// Tool server configuration

use crate::mcp::{McpError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// How to launch the tool server process
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Executable to run
    pub command: String,
    /// Arguments passed to the executable
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the server process
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl ServerConfig {
    /// Launch a server script with the interpreter implied by its extension
    pub fn from_script(script: &str, extra_args: &[String]) -> Result<Self> {
        let command = if script.ends_with(".py") {
            "python"
        } else if script.ends_with(".js") {
            "node"
        } else {
            return Err(McpError::UnsupportedScript(script.to_string()));
        };

        let mut args = vec![script.to_string()];
        args.extend(extra_args.iter().cloned());

        Ok(Self {
            command: command.to_string(),
            args,
            env: HashMap::new(),
        })
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        debug!(path = %path.display(), command = %config.command, "loaded server config");
        Ok(config)
    }
}
