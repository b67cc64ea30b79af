// Artifacts module - persistence of binary tool output

pub mod config;
pub mod error;
pub mod store;

pub use config::ArtifactConfig;
pub use error::ArtifactError;
pub use store::ArtifactStore;
