// Artifact store - turns raw tool content into transcript blocks

use super::config::ArtifactConfig;
use super::error::{ArtifactError, Result};
use crate::mcp::RawBlock;
use crate::transcript::ResultBlock;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};

/// Collision suffixes tried before giving up on a timestamp
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Persists binary tool output and hands back references to it
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    config: ArtifactConfig,
}

impl ArtifactStore {
    pub fn new(config: ArtifactConfig) -> Self {
        Self { config }
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Convert raw tool content into result blocks, preserving order.
    ///
    /// Images are written to disk and replaced by a reference. A failed
    /// write becomes a text block describing the error.
    pub async fn materialize(&self, content: &[RawBlock]) -> Vec<ResultBlock> {
        let mut blocks = Vec::with_capacity(content.len());

        for raw in content {
            let block = match raw {
                RawBlock::Text { text } => ResultBlock::text(text.clone()),
                RawBlock::Image { data, mime_type } => match self.save_image(data, mime_type).await {
                    Ok(path) => {
                        info!(path = %path.display(), mime_type = %mime_type, "saved image");
                        ResultBlock::ImageRef {
                            path,
                            mime_type: mime_type.clone(),
                        }
                    }
                    Err(e) => {
                        error!(error = %e, mime_type = %mime_type, "failed to save image");
                        ResultBlock::text(format!("Error saving image: {}", e))
                    }
                },
                RawBlock::Unsupported => {
                    warn!("dropping unsupported content block");
                    ResultBlock::text("[unsupported content omitted]")
                }
            };
            blocks.push(block);
        }

        blocks
    }

    /// Decode a base64 image and write it under a fresh name
    pub async fn save_image(&self, data: &str, mime_type: &str) -> Result<PathBuf> {
        // Servers may wrap long payloads across lines.
        let payload: String = data.split_ascii_whitespace().collect();
        let bytes = STANDARD.decode(payload)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.write_unique(&bytes, &stamp, extension_for(mime_type)).await
    }

    /// Write `bytes` to `<prefix>_<stamp>.<ext>`, adding `_<n>` when that
    /// name is taken. Exclusive create keeps concurrent writers apart.
    async fn write_unique(&self, bytes: &[u8], stamp: &str, ext: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.dir).await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => format!("{}_{}.{}", self.config.prefix, stamp, ext),
                n => format!("{}_{}_{}.{}", self.config.prefix, stamp, n, ext),
            };
            let path = self.config.dir.join(name);

            let file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            write_or_discard(&path, file, bytes).await?;
            return Ok(path);
        }

        Err(ArtifactError::NameExhausted(self.config.dir.clone()))
    }
}

/// Write `bytes` through `file`; on failure the partial file at `path` is removed.
async fn write_or_discard<W>(path: &Path, mut file: W, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        if let Err(cleanup) = fs::remove_file(path).await {
            warn!(path = %path.display(), error = %cleanup, "failed to remove partial artifact");
        }
        return Err(e.into());
    }
    Ok(())
}

/// File extension implied by a MIME type (`image/svg+xml` -> `svg`)
fn extension_for(mime_type: &str) -> &str {
    let subtype = mime_type.rsplit('/').next().unwrap_or_default();
    let ext = subtype.split(['+', ';']).next().unwrap_or_default().trim();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        "bin"
    } else {
        ext
    }
}
