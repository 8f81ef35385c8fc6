use crate::error::Result;
use crate::types::{RankedItem, SignalSource};
use postsearch_corpus::DocumentStore;
use postsearch_vector_store::{max_similarity, Embedder, VectorStoreError};
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 20;

/// Exhaustive cosine scan of the query vector against stored embeddings.
///
/// Chunked documents score as their best-matching chunk. Documents without an
/// embedding never appear.
pub struct SemanticMatcher {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    limit: usize,
}

impl SemanticMatcher {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            limit: DEFAULT_LIMIT,
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Whether the semantic signal can run here; never loads the model
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.embedder.is_supported()
    }

    /// Ranked results, or empty when the signal is unavailable or fails
    pub async fn search(&self, query: &str) -> Vec<RankedItem> {
        match self.try_search(query).await {
            Ok(results) => results,
            Err(err) => {
                log::warn!("Semantic search failed for query '{}': {err}", query.trim());
                Vec::new()
            }
        }
    }

    pub async fn try_search(&self, query: &str) -> Result<Vec<RankedItem>> {
        let query = query.trim();
        if query.is_empty() || !self.is_supported() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let docs = self.store.all().await?;

        let mut scored = Vec::new();
        for doc in &docs {
            match max_similarity(&query_vector, doc.embedding.vectors()) {
                Ok(Some(similarity)) => scored.push((doc, similarity)),
                Ok(None) => {}
                Err(VectorStoreError::DimensionMismatch { left, right }) => {
                    log::warn!(
                        "Skipping '{}' in semantic search: embedding has {right} dims, query has {left}",
                        doc.id
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.limit);
        log::debug!("Semantic: {} results", scored.len());

        Ok(scored
            .into_iter()
            .map(|(doc, similarity)| {
                RankedItem::from_document(doc)
                    .similarity(f64::from(similarity))
                    .source(SignalSource::Semantic)
            })
            .collect())
    }
}
