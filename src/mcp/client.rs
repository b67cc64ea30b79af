// MCP client - rmcp session with a tool server

use crate::mcp::config::ServerConfig;
use crate::mcp::transport::ToolTransport;
use crate::mcp::{CallToolResult, McpError, Result, ToolDescriptor};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, ClientInfo, PaginatedRequestParam};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::{IntoTransport, TokioChildProcess};
use rmcp::ServiceExt;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Initialized MCP session
pub struct McpClient {
    service: RunningService<RoleClient, ClientInfo>,
}

impl McpClient {
    /// Complete the initialize handshake over `transport`
    pub async fn connect<T, E, A>(transport: T) -> Result<Self>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut client_info = ClientInfo::default();
        client_info.client_info.name = env!("CARGO_PKG_NAME").to_string();
        client_info.client_info.version = env!("CARGO_PKG_VERSION").to_string();

        let service = client_info
            .serve(transport)
            .await
            .map_err(|e| McpError::Handshake(e.to_string()))?;

        if let Some(server) = service.peer_info() {
            info!(
                server = %server.server_info.name,
                version = %server.server_info.version,
                "tool server initialized"
            );
        }
        Ok(Self { service })
    }

    /// Spawn the server process and connect over its stdin/stdout
    pub async fn spawn(config: &ServerConfig) -> Result<Self> {
        info!(command = %config.command, args = ?config.args, "spawning tool server");

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .envs(&config.env)
            .stderr(Stdio::inherit());

        let process = TokioChildProcess::new(command)
            .map_err(|e| McpError::SpawnFailed(config.command.clone(), e.to_string()))?;

        Self::connect(process).await
    }

    /// Close the session; a child process server is killed with it
    pub async fn shutdown(self) {
        match self.service.cancel().await {
            Ok(reason) => info!(reason = ?reason, "tool server stopped"),
            Err(e) => warn!(error = %e, "failed to stop tool server"),
        }
    }
}

#[async_trait]
impl ToolTransport for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<PaginatedRequestParam> = None;

        loop {
            let page = self
                .service
                .list_tools(cursor.clone())
                .await
                .map_err(|e| McpError::Service {
                    method: "tools/list",
                    message: e.to_string(),
                })?;

            tools.extend(page.tools.into_iter().map(ToolDescriptor::from));
            match page.next_cursor {
                Some(next) => {
                    cursor = Some(PaginatedRequestParam { cursor: Some(next) });
                }
                None => break,
            }
        }

        debug!(tool_count = tools.len(), "listed tools");
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<CallToolResult> {
        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: arguments.as_object().cloned(),
            })
            .await
            .map_err(|e| McpError::Service {
                method: "tools/call",
                message: e.to_string(),
            })?;

        let result = CallToolResult::from(result);
        if result.is_error {
            warn!(tool = %name, "tool reported an error result");
        }
        Ok(result)
    }
}
