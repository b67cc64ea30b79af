// Artifact errors

use std::path::PathBuf;
use thiserror::Error;

/// Failures while persisting an artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("no free file name for {0}")]
    NameExhausted(PathBuf),
}

pub type Result<T> = std::result::Result<T, ArtifactError>;
