//! # Postsearch Chunker
//!
//! Structure-aware chunking of Markdown post bodies for passage-level embeddings.
//!
//! ## Architecture
//!
//! ```text
//! Markdown body
//!     │
//!     ├──> pulldown-cmark event stream
//!     │
//!     ├──> Top-level block segmentation
//!     │    ├─> headings, paragraphs, code blocks
//!     │    └─> block quotes, lists
//!     │
//!     └──> Chunk emission
//!          ├─> plain text, whitespace collapsed
//!          ├─> blocks under the minimum length dropped
//!          └─> whole-text fallback when nothing qualifies
//! ```
//!
//! ## Example
//!
//! ```rust
//! use postsearch_chunker::{ChunkType, Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::default());
//! let chunks = chunker.chunk_markdown("# Intro\n\nNuxt 3 ships with auto-imports and file routing.");
//!
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].chunk_type, ChunkType::Paragraph);
//! ```

mod chunker;
mod config;
mod error;
mod types;

pub use chunker::{extract_plain_text, Chunker};
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use types::{ChunkType, TextChunk};
