use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CorpusError>;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Front matter error in {path}: {reason}")]
    FrontMatter { path: PathBuf, reason: String },

    #[error("Unsupported corpus schema_version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("Duplicate document id: {0}")]
    DuplicateId(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    Other(String),
}

impl CorpusError {
    pub fn front_matter(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FrontMatter {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
