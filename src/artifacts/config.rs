// Artifact storage configuration

use std::path::PathBuf;

/// Where tool-produced binaries are written
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    /// Output directory, created on first write
    pub dir: PathBuf,
    /// File name prefix
    pub prefix: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("screenshots"),
            prefix: "screenshot".to_string(),
        }
    }
}

impl ArtifactConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = ArtifactConfig::default();
        if let Ok(dir) = std::env::var("PILOT_ARTIFACTS_DIR") {
            config.dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var("PILOT_ARTIFACTS_PREFIX") {
            config.prefix = prefix;
        }
        config
    }
}
