//! # Postsearch Search
//!
//! Query-time ranking: three independent signals and the fusion that merges
//! them.
//!
//! ## Signals
//!
//! - [`KeywordMatcher`]: case-insensitive substring containment, store order
//! - [`FuzzyMatcher`]: typo-tolerant matching over weighted title, description
//!   and tags
//! - [`SemanticMatcher`]: cosine similarity against stored embeddings
//!
//! ## Fusion
//!
//! [`ReciprocalRankFusion`] works on rank positions only, so signals whose
//! scores live on different scales combine without normalisation. It is the
//! default. [`WeightedFusion`] blends fuzzy and semantic scores and min-max
//! normalises the result.
//!
//! [`HybridSearch`] runs the signals concurrently and fuses them;
//! [`SearchPipeline`] puts a debounced, latest-wins channel in front of it.
//!
//! ## Example
//!
//! ```no_run
//! use postsearch_corpus::{load_corpus, MemoryStore};
//! use postsearch_search::{HybridSearch, SearchConfig};
//! use postsearch_vector_store::EmbeddingModel;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryStore::from_documents(load_corpus("corpus.json").await?)?);
//!     let model = Arc::new(EmbeddingModel::from_env()?);
//!     let search = HybridSearch::new(store, model, SearchConfig::default())?;
//!
//!     let response = search.search("server-side rendering").await;
//!     for item in &response.results {
//!         println!("{:.4} {}", item.fused_score.unwrap_or_default(), item.title);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod fusion;
mod fuzzy;
mod hybrid;
mod keyword;
mod pipeline;
mod semantic;
#[cfg(test)]
mod testing;
mod types;

pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use fusion::{
    RankedList, ReciprocalRankFusion, RrfConfig, WeightedFusion, WeightedFusionConfig,
};
pub use fuzzy::{FuzzyConfig, FuzzyMatcher};
pub use hybrid::HybridSearch;
pub use keyword::KeywordMatcher;
pub use pipeline::{QueryResult, SearchPipeline};
pub use semantic::SemanticMatcher;
pub use types::{FusionPolicy, RankedItem, SearchInfo, SearchMode, SearchResponse, SignalSource};
