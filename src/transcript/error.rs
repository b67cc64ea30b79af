// Transcript errors

use thiserror::Error;

/// Protocol violations rejected by the transcript
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("Tool result '{0}' has no preceding tool call")]
    OrphanResult(String),

    #[error("Tool call '{0}' already has a result")]
    DuplicateResult(String),

    #[error("Tool call id '{0}' was already used")]
    DuplicateCall(String),
}

pub type Result<T> = std::result::Result<T, TranscriptError>;
