// MCP module - tool server transport and tool catalog

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use config::ServerConfig;
pub use error::{McpError, Result};
pub use transport::ToolTransport;
pub use types::{CallToolResult, RawBlock, ToolDescriptor, is_timeout_marker};
