use crate::error::{Result, SearchError};
use crate::types::{RankedItem, SignalSource};
use postsearch_corpus::{Document, DocumentStore};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

const DEFAULT_LIMIT: usize = 20;

/// Tunables fixed at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    /// Maximum `edit_distance / query_chars` for a field to match (0 = exact only)
    pub threshold: f64,
    /// Queries and matched regions shorter than this are ignored
    pub min_match_char_length: usize,
    pub title_weight: f64,
    pub description_weight: f64,
    pub tags_weight: f64,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            min_match_char_length: 2,
            title_weight: 0.5,
            description_weight: 0.3,
            tags_weight: 0.2,
        }
    }
}

impl FuzzyConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SearchError::InvalidConfig(format!(
                "fuzzy.threshold must be within 0..=1, got {}",
                self.threshold
            )));
        }
        let weights = [self.title_weight, self.description_weight, self.tags_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(SearchError::InvalidConfig(
                "fuzzy field weights must be non-negative and not all zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Field weights scaled to sum to 1: (title, description, tags)
    fn normalized_weights(&self) -> (f64, f64, f64) {
        let total = self.title_weight + self.description_weight + self.tags_weight;
        (
            self.title_weight / total,
            self.description_weight / total,
            self.tags_weight / total,
        )
    }
}

/// One searchable field value, preprocessed
#[derive(Debug)]
struct FieldValue {
    chars: Vec<char>,
    /// `1 / sqrt(token count)`, rounded to 3 decimals
    norm: f64,
}

impl FieldValue {
    fn new(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        let tokens = lowered.split(' ').filter(|t| !t.is_empty()).count().max(1);
        #[allow(clippy::cast_precision_loss)]
        let norm = (1.0 / (tokens as f64).sqrt() * 1000.0).round() / 1000.0;
        Self {
            chars: lowered.chars().collect(),
            norm,
        }
    }
}

#[derive(Debug)]
struct Entry {
    doc: Arc<Document>,
    title: FieldValue,
    description: FieldValue,
    tags: Vec<FieldValue>,
}

/// Preprocessed corpus snapshot, valid for one store revision
#[derive(Debug)]
struct FuzzyIndex {
    revision: u64,
    entries: Vec<Entry>,
}

impl FuzzyIndex {
    fn build(revision: u64, docs: Vec<Arc<Document>>) -> Self {
        let entries = docs
            .into_iter()
            .map(|doc| Entry {
                title: FieldValue::new(&doc.title),
                description: FieldValue::new(&doc.description),
                tags: doc.tags.iter().map(|t| FieldValue::new(t)).collect(),
                doc,
            })
            .collect();
        Self { revision, entries }
    }
}

/// Approximate matcher over title, description and tags
pub struct FuzzyMatcher {
    store: Arc<dyn DocumentStore>,
    config: FuzzyConfig,
    limit: usize,
    index: Mutex<Option<Arc<FuzzyIndex>>>,
}

impl FuzzyMatcher {
    pub fn new(store: Arc<dyn DocumentStore>, config: FuzzyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            limit: DEFAULT_LIMIT,
            index: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &FuzzyConfig {
        &self.config
    }

    /// Best-first fuzzy results; store failures are logged and yield nothing
    pub async fn search(&self, query: &str) -> Vec<RankedItem> {
        match self.try_search(query).await {
            Ok(results) => results,
            Err(err) => {
                log::warn!("Fuzzy search failed for query '{}': {err}", query.trim());
                Vec::new()
            }
        }
    }

    pub async fn try_search(&self, query: &str) -> Result<Vec<RankedItem>> {
        let query: Vec<char> = query.trim().to_lowercase().chars().collect();
        if query.is_empty() || query.len() < self.config.min_match_char_length {
            return Ok(Vec::new());
        }

        let index = self.snapshot().await?;
        let (w_title, w_description, w_tags) = self.config.normalized_weights();

        let mut scored: Vec<(&Entry, f64)> = index
            .entries
            .iter()
            .filter_map(|entry| {
                let mut matched = false;
                let mut total = 1.0f64;
                let mut apply = |field_score: Option<(f64, f64)>, weight: f64| {
                    if let Some((score, norm)) = field_score {
                        matched = true;
                        total *= score.max(f64::EPSILON).powf(weight * norm);
                    }
                };

                apply(self.score_field(&query, &entry.title), w_title);
                apply(self.score_field(&query, &entry.description), w_description);
                let best_tag = entry
                    .tags
                    .iter()
                    .filter_map(|tag| self.score_field(&query, tag))
                    .min_by(|a, b| a.0.total_cmp(&b.0));
                apply(best_tag, w_tags);

                matched.then_some((entry, total))
            })
            .collect();

        // stable: ties keep corpus order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(self.limit);

        log::debug!("Fuzzy: {} results", scored.len());
        Ok(scored
            .into_iter()
            .map(|(entry, score)| {
                RankedItem::from_document(&entry.doc)
                    .fuzzy_score(1.0 - score)
                    .source(SignalSource::Fuzzy)
            })
            .collect())
    }

    /// `(score, norm)` when the field matches, score = distance / query length
    fn score_field(&self, query: &[char], field: &FieldValue) -> Option<(f64, f64)> {
        let (distance, region) = best_substring_distance(query, &field.chars);
        #[allow(clippy::cast_precision_loss)]
        let score = distance as f64 / query.len() as f64;
        (score <= self.config.threshold && region >= self.config.min_match_char_length)
            .then_some((score, field.norm))
    }

    async fn snapshot(&self) -> Result<Arc<FuzzyIndex>> {
        let revision = self.store.revision();
        {
            let cached = self.index.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(index) = cached.as_ref().filter(|i| i.revision == revision) {
                return Ok(Arc::clone(index));
            }
        }

        let docs = self.store.all().await?;
        log::debug!("Rebuilding fuzzy index: {} documents (revision {revision})", docs.len());
        let index = Arc::new(FuzzyIndex::build(revision, docs));
        *self.index.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&index));
        Ok(index)
    }
}

/// Minimum Levenshtein distance between `pattern` and any substring of `text`,
/// with the length of the best such substring (the longest among ties).
fn best_substring_distance(pattern: &[char], text: &[char]) -> (usize, usize) {
    // (cost, start of the aligned text region)
    let mut prev: Vec<(usize, usize)> = (0..=text.len()).map(|j| (0, j)).collect();
    let mut cur = vec![(0usize, 0usize); text.len() + 1];

    for (i, &p) in pattern.iter().enumerate() {
        cur[0] = (i + 1, 0);
        for (j, &t) in text.iter().enumerate() {
            let diag = (prev[j].0 + usize::from(p != t), prev[j].1);
            let up = (prev[j + 1].0 + 1, prev[j + 1].1);
            let left = (cur[j].0 + 1, cur[j].1);
            let mut best = diag;
            if up.0 < best.0 {
                best = up;
            }
            if left.0 < best.0 {
                best = left;
            }
            cur[j + 1] = best;
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev.iter()
        .enumerate()
        .map(|(end, &(cost, start))| (cost, end - start))
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .unwrap_or((pattern.len(), 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{blog_corpus, memory_store};
    use postsearch_corpus::MemoryStore;
    use pretty_assertions::assert_eq;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn substring_distance() {
        assert_eq!(
            best_substring_distance(&chars("nuxt"), &chars("getting started with nuxt 3")),
            (0, 4)
        );
        assert_eq!(best_substring_distance(&chars("nxt"), &chars("nuxt")).0, 1);
        assert_eq!(best_substring_distance(&chars("cats"), &chars("")), (4, 0));
        assert_eq!(best_substring_distance(&chars("abc"), &chars("xyz")).0, 3);
    }

    #[test]
    fn field_norm_rounds_to_three_decimals() {
        assert_eq!(FieldValue::new("Nuxt").norm, 1.0);
        assert_eq!(FieldValue::new("Getting Started with Nuxt 3").norm, 0.447);
        assert_eq!(FieldValue::new("").norm, 1.0);
    }

    #[tokio::test]
    async fn exact_title_match_ranks_first() {
        let matcher = FuzzyMatcher::new(memory_store(blog_corpus()), FuzzyConfig::default()).unwrap();
        let results = matcher.search("Nuxt 3").await;
        assert_eq!(results[0].slug, "getting-started-nuxt");
        assert_eq!(results[0].source, Some(SignalSource::Fuzzy));
        assert!(results[0].fuzzy_score.unwrap() > 0.99);
    }

    #[tokio::test]
    async fn tolerates_typos() {
        let matcher = FuzzyMatcher::new(memory_store(blog_corpus()), FuzzyConfig::default()).unwrap();
        let results = matcher.search("fasinating").await;
        assert_eq!(results[0].slug, "fascinating-world-of-cats");
    }

    #[tokio::test]
    async fn short_or_blank_queries_yield_nothing() {
        let matcher = FuzzyMatcher::new(memory_store(blog_corpus()), FuzzyConfig::default()).unwrap();
        assert!(matcher.search("").await.is_empty());
        assert!(matcher.search("   ").await.is_empty());
        assert!(matcher.search("n").await.is_empty());
    }

    #[tokio::test]
    async fn capped_and_non_increasing() {
        let docs = (0..40)
            .map(|i| {
                Document::new(format!("/blog/post-{i}"), format!("Post number {i}"))
                    .description("Notes about web development")
            })
            .collect();
        let matcher = FuzzyMatcher::new(memory_store(docs), FuzzyConfig::default()).unwrap();

        let results = matcher.search("post").await;
        assert_eq!(results.len(), 20);
        let relevance: Vec<f64> = results.iter().filter_map(|r| r.fuzzy_score).collect();
        assert!(relevance.windows(2).all(|w| w[0] >= w[1]));
        // all tie, corpus order wins
        assert_eq!(results[0].slug, "post-0");
        assert_eq!(results[19].slug, "post-19");
    }

    #[tokio::test]
    async fn best_tag_counts() {
        let docs = vec![
            Document::new("/blog/a", "Alpha").tags(["misc", "rust"]),
            Document::new("/blog/b", "Beta").tags(["misc"]),
        ];
        let matcher = FuzzyMatcher::new(memory_store(docs), FuzzyConfig::default()).unwrap();
        let results = matcher.search("rust").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].slug, "a");
    }

    #[tokio::test]
    async fn snapshot_rebuilds_when_store_changes() {
        let store = Arc::new(MemoryStore::from_documents(blog_corpus()).unwrap());
        let matcher = FuzzyMatcher::new(store.clone(), FuzzyConfig::default()).unwrap();
        assert!(matcher.search("svelte").await.is_empty());

        store.upsert(Document::new("/blog/svelte", "Svelte for Vue developers"));
        let results = matcher.search("svelte").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].slug, "svelte");
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let config = FuzzyConfig {
            threshold: 1.5,
            ..FuzzyConfig::default()
        };
        assert!(matches!(config.validate(), Err(SearchError::InvalidConfig(_))));
    }
}
