//! # Postsearch Corpus
//!
//! The document side of postsearch: the immutable [`Document`] snapshot, its
//! precomputed embeddings, and the stores the matchers read from.
//!
//! Embeddings arrive in several shapes (a flat vector, a JSON string holding a
//! vector, a list of chunk objects, or nothing at all). They are parsed exactly
//! once, when a document crosses the store boundary, into [`StoredEmbedding`];
//! nothing downstream inspects the raw shape again.
//!
//! ## Example
//!
//! ```no_run
//! use postsearch_corpus::{load_markdown_dir, DocumentStore, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let documents = load_markdown_dir("content/blog")?;
//!     let store = MemoryStore::from_documents(documents)?;
//!
//!     for doc in store.find_containing("nuxt", 20).await? {
//!         println!("{} ({})", doc.title, doc.slug().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

mod document;
mod embedding;
mod error;
mod markdown;
mod persist;
mod store;

pub use document::{Document, EXCERPT_CHARS};
pub use embedding::{EmbeddedChunk, StoredEmbedding};
pub use error::{CorpusError, Result};
pub use markdown::{load_markdown_dir, parse_markdown_post, WORDS_PER_MINUTE};
pub use persist::{load_corpus, save_corpus, CorpusFile, CORPUS_SCHEMA_VERSION};
pub use store::{DocumentStore, MemoryStore};
