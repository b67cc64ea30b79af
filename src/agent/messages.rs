// Transcript view -> model messages

use crate::brain::{ContentBlock, Message, Role};
use crate::transcript::Entry;

/// Render transcript entries as model messages.
///
/// Adjacent entries with the same role are folded into one message so the
/// request alternates roles; empty text is skipped.
pub fn to_messages(entries: &[Entry]) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::new();

    for entry in entries {
        let (role, block) = match entry {
            Entry::UserText { text } if !text.is_empty() => (Role::User, ContentBlock::text(text)),
            Entry::AssistantText { text } if !text.is_empty() => {
                (Role::Assistant, ContentBlock::text(text))
            }
            Entry::UserText { .. } | Entry::AssistantText { .. } => continue,
            Entry::AssistantToolCall {
                call_id,
                tool_name,
                arguments,
            } => (
                Role::Assistant,
                ContentBlock::ToolUse {
                    id: call_id.clone(),
                    name: tool_name.clone(),
                    input: arguments.clone(),
                },
            ),
            Entry::ToolResult {
                call_id,
                content,
                is_error,
            } => (
                Role::User,
                ContentBlock::ToolResult {
                    tool_use_id: call_id.clone(),
                    content: content
                        .iter()
                        .map(|b| ContentBlock::text(b.to_llm_text()))
                        .collect(),
                    is_error: is_error.then_some(true),
                },
            ),
        };

        match messages.last_mut() {
            Some(last) if last.role == role => last.content.push(block),
            _ => messages.push(Message {
                role,
                content: vec![block],
            }),
        }
    }

    messages
}
