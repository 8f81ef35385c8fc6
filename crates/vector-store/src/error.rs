use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("Embedding model failed to load: {0}")]
    ModelLoad(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Unsupported embedding configuration: {0}")]
    InvalidConfig(String),

    #[error("Corpus error: {0}")]
    Corpus(#[from] postsearch_corpus::CorpusError),

    #[error("Chunker error: {0}")]
    Chunker(#[from] postsearch_chunker::ChunkerError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl VectorStoreError {
    /// True when no document can be embedded until the model loads
    #[must_use]
    pub const fn is_model_load(&self) -> bool {
        matches!(self, Self::ModelLoad(_))
    }
}
