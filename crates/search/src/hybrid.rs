use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::fusion::{RankedList, ReciprocalRankFusion, WeightedFusion};
use crate::fuzzy::FuzzyMatcher;
use crate::keyword::KeywordMatcher;
use crate::semantic::SemanticMatcher;
use crate::types::{FusionPolicy, RankedItem, SearchInfo, SearchMode, SearchResponse};
use postsearch_corpus::DocumentStore;
use postsearch_vector_store::Embedder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Hybrid search combining keyword, fuzzy and semantic signals
pub struct HybridSearch {
    config: SearchConfig,
    keyword: KeywordMatcher,
    fuzzy: FuzzyMatcher,
    semantic: SemanticMatcher,
    rrf: ReciprocalRankFusion,
    weighted: WeightedFusion,
    in_flight: AtomicUsize,
}

/// Counts a search as in flight until dropped, including on cancellation
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl HybridSearch {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        config: SearchConfig,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|err| SearchError::InvalidConfig(format!("{err:#}")))?;

        let limit = config.limit;
        Ok(Self {
            keyword: KeywordMatcher::new(Arc::clone(&store)).limit(limit),
            fuzzy: FuzzyMatcher::new(Arc::clone(&store), config.fuzzy.clone())?.limit(limit),
            semantic: SemanticMatcher::new(store, embedder).limit(limit),
            rrf: ReciprocalRankFusion::new(config.rrf.k, limit),
            weighted: WeightedFusion::new(config.weighted.clone()),
            in_flight: AtomicUsize::new(0),
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Whether the semantic signal is available here
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.semantic.is_supported()
    }

    /// True while any search on this engine is still resolving
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Search with the configured mode
    pub async fn search(&self, query: &str) -> SearchResponse {
        self.search_mode(query, self.config.mode).await
    }

    /// Search with an explicit mode.
    ///
    /// Never fails: a signal whose store or model is unavailable contributes
    /// nothing and the rest still rank.
    pub async fn search_mode(&self, query: &str, mode: SearchMode) -> SearchResponse {
        let query = query.trim();
        let semantic_supported = self.is_supported();
        if query.is_empty() {
            return SearchResponse::empty(semantic_supported);
        }

        let _guard = InFlight::enter(&self.in_flight);
        log::debug!("Search: query='{query}', mode={}", mode.as_str());

        let mut info = SearchInfo {
            semantic_supported,
            ..SearchInfo::default()
        };
        let results = match mode {
            SearchMode::Hybrid => self.hybrid(query, &mut info).await,
            SearchMode::Keyword => {
                let results = self.keyword.search(query).await;
                info.total_keyword_results = results.len();
                results
            }
            SearchMode::Fuzzy => {
                let results = self.fuzzy.search(query).await;
                info.total_fuzzy_results = results.len();
                results
            }
            SearchMode::Semantic => {
                let results = self.semantic.search(query).await;
                info.total_semantic_results = results.len();
                results
            }
        };

        log::info!(
            "Search '{query}' completed: {} results (hybrid: {})",
            results.len(),
            info.is_hybrid
        );
        SearchResponse { results, info }
    }

    async fn hybrid(&self, query: &str, info: &mut SearchInfo) -> Vec<RankedItem> {
        let (keyword, fuzzy, semantic) = tokio::join!(
            self.keyword.search(query),
            self.fuzzy.search(query),
            self.semantic.search(query),
        );
        info.total_keyword_results = keyword.len();
        info.total_fuzzy_results = fuzzy.len();
        info.total_semantic_results = semantic.len();

        match self.config.fusion {
            FusionPolicy::Rrf => {
                let weights = &self.config.rrf;
                let lists = [
                    RankedList::new(fuzzy, weights.fuzzy_weight),
                    RankedList::new(semantic, weights.semantic_weight),
                    RankedList::new(keyword, weights.keyword_weight),
                ];
                info.is_hybrid = lists.iter().filter(|l| !l.items.is_empty()).count() >= 2;
                self.rrf.fuse(&lists)
            }
            FusionPolicy::Weighted => {
                info.is_hybrid = !fuzzy.is_empty() && !semantic.is_empty();
                let mut results = self.weighted.fuse(&fuzzy, &semantic);
                results.truncate(self.config.limit);
                results
            }
        }
    }
}
