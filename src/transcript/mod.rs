// Transcript module - append-only conversation log and its compacted view

pub mod compact;
pub mod error;
pub mod types;

pub use compact::{approx_size, compact};
pub use error::{Result, TranscriptError};
pub use types::{Entry, ResultBlock};

use std::collections::HashMap;

/// Append-only log of one conversation session
///
/// Entries are never reordered or removed. Tool results are accepted only
/// for calls that were appended earlier and have not been answered yet.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    /// call id -> whether a result has been recorded
    calls: HashMap<String, bool>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, rejecting protocol violations
    pub fn push(&mut self, entry: Entry) -> Result<()> {
        match &entry {
            Entry::AssistantToolCall { call_id, .. } => {
                if self.calls.contains_key(call_id) {
                    return Err(TranscriptError::DuplicateCall(call_id.clone()));
                }
                self.calls.insert(call_id.clone(), false);
            }
            Entry::ToolResult { call_id, .. } => match self.calls.get_mut(call_id) {
                None => return Err(TranscriptError::OrphanResult(call_id.clone())),
                Some(true) => return Err(TranscriptError::DuplicateResult(call_id.clone())),
                Some(answered) => *answered = true,
            },
            Entry::UserText { .. } | Entry::AssistantText { .. } => {}
        }

        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reduced view to send to the model
    pub fn compacted(&self) -> Vec<Entry> {
        compact(&self.entries)
    }

    /// Tool calls still waiting for a result, in call order
    pub fn pending_calls(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.is_tool_call())
            .filter_map(Entry::call_id)
            .filter(|id| self.calls.get(*id) == Some(&false))
            .collect()
    }
}
