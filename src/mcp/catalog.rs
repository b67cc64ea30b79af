// Tool catalog adapter - server tool descriptors to model tool definitions

use crate::brain::ToolDefinition;
use crate::mcp::ToolDescriptor;

/// Map advertised tools 1:1 onto the model's tool schema
pub fn adapt(tools: &[ToolDescriptor]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|tool| ToolDefinition {
            name: tool.name.clone(),
            description: tool.description.clone().unwrap_or_default(),
            input_schema: tool.input_schema.clone(),
        })
        .collect()
}
