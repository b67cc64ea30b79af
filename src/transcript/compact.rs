// Context compaction - reduced transcript view sent to the model

use super::types::Entry;

/// Derive the view of `entries` that is sent to the model.
///
/// Text entries are always kept. Of the tool calls only the most recent one
/// survives, together with its result; older call/result pairs are elided as
/// a unit. Relative order of kept entries is unchanged.
pub fn compact(entries: &[Entry]) -> Vec<Entry> {
    let latest = entries
        .iter()
        .enumerate()
        .rev()
        .find_map(|(idx, e)| match e {
            Entry::AssistantToolCall { call_id, .. } => Some((idx, call_id.as_str())),
            _ => None,
        });

    entries
        .iter()
        .enumerate()
        .filter(|(idx, entry)| match entry {
            Entry::AssistantToolCall { .. } => latest.is_some_and(|(at, _)| at == *idx),
            Entry::ToolResult { call_id, .. } => latest.is_some_and(|(_, id)| id == call_id.as_str()),
            Entry::UserText { .. } | Entry::AssistantText { .. } => true,
        })
        .map(|(_, entry)| entry.clone())
        .collect()
}

/// Approximate payload size of `entries` in bytes (serialized JSON length)
pub fn approx_size(entries: &[Entry]) -> usize {
    serde_json::to_vec(entries).map(|v| v.len()).unwrap_or(0)
}
