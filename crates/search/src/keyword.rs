use crate::error::Result;
use crate::types::{RankedItem, SignalSource};
use postsearch_corpus::DocumentStore;
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 20;

/// Case-insensitive substring match over title, description, tags and body.
///
/// Results come back in store order; there is no relevance ranking.
pub struct KeywordMatcher {
    store: Arc<dyn DocumentStore>,
    limit: usize,
}

impl KeywordMatcher {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            limit: DEFAULT_LIMIT,
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub async fn search(&self, query: &str) -> Vec<RankedItem> {
        match self.try_search(query).await {
            Ok(results) => results,
            Err(err) => {
                log::warn!("Keyword search failed for query '{}': {err}", query.trim());
                Vec::new()
            }
        }
    }

    pub async fn try_search(&self, query: &str) -> Result<Vec<RankedItem>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let docs = self.store.find_containing(query, self.limit).await?;
        log::debug!("Keyword: {} results", docs.len());
        Ok(docs
            .iter()
            .map(|doc| RankedItem::from_document(doc).source(SignalSource::Keyword))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{blog_corpus, memory_store, UnavailableStore};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn finds_exactly_the_matching_post() {
        let matcher = KeywordMatcher::new(memory_store(blog_corpus()));
        let results = matcher.search("  Nuxt 3 ").await;
        let slugs: Vec<&str> = results.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, vec!["getting-started-nuxt"]);
        assert_eq!(results[0].source, Some(SignalSource::Keyword));
    }

    #[tokio::test]
    async fn matches_tags_and_body() {
        let matcher = KeywordMatcher::new(memory_store(blog_corpus()));
        assert_eq!(matcher.search("PETS").await[0].slug, "fascinating-world-of-cats");
        assert_eq!(matcher.search("inference").await[0].slug, "typescript-tips");
    }

    #[tokio::test]
    async fn blank_query_is_empty() {
        let matcher = KeywordMatcher::new(memory_store(blog_corpus()));
        assert!(matcher.search("").await.is_empty());
        assert!(matcher.search(" \t ").await.is_empty());
    }

    #[tokio::test]
    async fn respects_limit_in_store_order() {
        let matcher = KeywordMatcher::new(memory_store(blog_corpus())).limit(2);
        let results = matcher.search("e").await;
        let slugs: Vec<&str> = results.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, vec!["getting-started-nuxt", "fascinating-world-of-cats"]);
    }

    #[tokio::test]
    async fn unavailable_store_degrades_to_empty() {
        let matcher = KeywordMatcher::new(Arc::new(UnavailableStore));
        assert!(matcher.try_search("nuxt").await.is_err());
        assert!(matcher.search("nuxt").await.is_empty());
    }
}
