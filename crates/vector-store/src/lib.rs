//! # Postsearch Vector Store
//!
//! Dense-vector side of postsearch: cosine similarity, the lazily loaded
//! embedding service, and build-time embedding generation for a corpus.
//!
//! ## Architecture
//!
//! ```text
//! Document[]
//!     │
//!     ├──> Indexer
//!     │      ├─> whole document: "title. description"
//!     │      └─> chunks: structural passages of the body
//!     │
//!     ├──> EmbeddingModel (lazy, single-flight load)
//!     │      ├─> ONNX Runtime backend (bge-small-en-v1.5, 384 dims)
//!     │      └─> deterministic stub backend
//!     │
//!     └──> StoredEmbedding on each document
//! ```
//!
//! Similarity is an exhaustive scan: [`cosine_similarity`] against every stored
//! vector, taking the best chunk when a document has several.
//!
//! ## Example
//!
//! ```no_run
//! use postsearch_vector_store::{Embedder, EmbeddingModel, Indexer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let model = Arc::new(EmbeddingModel::from_env()?);
//!     let documents = postsearch_corpus::load_markdown_dir("content/blog")?;
//!
//!     let (documents, report) = Indexer::new(model.clone()).index(documents).await?;
//!     println!("{} embedded, {} failed", report.embedded, report.failed);
//!
//!     let query = model.embed("server-side rendering").await?;
//!     println!("query has {} dims, corpus has {} docs", query.len(), documents.len());
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod indexer;
mod paths;
mod similarity;

pub use embeddings::{
    BackendLoader, Embedder, EmbeddingBackend, EmbeddingConfig, EmbeddingMode, EmbeddingModel,
    ModelAssets, ModelSpec, StubBackend, DEFAULT_MODEL, EMBEDDING_MODEL_ENV, EMBEDDING_MODE_ENV,
};
pub use error::{Result, VectorStoreError};
pub use indexer::{EmbeddingGranularity, IndexReport, Indexer};
pub use paths::{model_dir, MODEL_DIR_ENV};
pub use similarity::{cosine_similarity, max_similarity, normalize};
