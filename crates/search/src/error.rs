use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] postsearch_vector_store::VectorStoreError),

    #[error("Document store error: {0}")]
    CorpusError(#[from] postsearch_corpus::CorpusError),

    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),
}
