use crate::error::SearchError;
use postsearch_corpus::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which signal(s) contributed a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Keyword,
    Fuzzy,
    Semantic,
    Both,
}

impl SignalSource {
    /// Source of an item found by `self` and then by `other`.
    ///
    /// Keyword is a recall complement, so it never changes a fuzzy/semantic
    /// attribution; fuzzy plus semantic is `Both`.
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Keyword, x) | (x, Self::Keyword) => x,
            (Self::Fuzzy, Self::Fuzzy) => Self::Fuzzy,
            (Self::Semantic, Self::Semantic) => Self::Semantic,
            _ => Self::Both,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Fuzzy => "fuzzy",
            Self::Semantic => "semantic",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search result as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub date: String,
    /// Last path segment of `id` (empty when the id ends in `/`)
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    /// Fuzzy relevance (`1 - fuzzy score`, higher is better)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzzy_score: Option<f64>,
    /// Cosine similarity to the query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fused_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SignalSource>,
}

impl RankedItem {
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            description: doc.description.clone(),
            tags: doc.tags.clone(),
            date: doc.date.clone(),
            slug: doc.slug().unwrap_or_default().to_string(),
            excerpt: doc.excerpt(),
            content: doc.description.clone(),
            fuzzy_score: None,
            similarity: None,
            fused_score: None,
            source: None,
        }
    }

    /// Key used to merge the same document across ranked lists: slug, else id
    #[must_use]
    pub fn merge_key(&self) -> &str {
        if self.slug.is_empty() {
            &self.id
        } else {
            &self.slug
        }
    }

    #[must_use]
    pub const fn source(mut self, source: SignalSource) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub const fn fuzzy_score(mut self, score: f64) -> Self {
        self.fuzzy_score = Some(score);
        self
    }

    #[must_use]
    pub const fn similarity(mut self, similarity: f64) -> Self {
        self.similarity = Some(similarity);
        self
    }

    /// Fold another sighting of the same document into this one
    pub(crate) fn absorb(&mut self, other: &Self) {
        if self.fuzzy_score.is_none() {
            self.fuzzy_score = other.fuzzy_score;
        }
        if self.similarity.is_none() {
            self.similarity = other.similarity;
        }
        self.source = match (self.source, other.source) {
            (Some(a), Some(b)) => Some(a.combine(b)),
            (a, b) => a.or(b),
        };
    }
}

/// Per-signal counts for one search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInfo {
    pub total_keyword_results: usize,
    pub total_fuzzy_results: usize,
    pub total_semantic_results: usize,
    pub semantic_supported: bool,
    /// True when two or more signals produced results that were fused
    pub is_hybrid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<RankedItem>,
    pub info: SearchInfo,
}

impl SearchResponse {
    #[must_use]
    pub fn empty(semantic_supported: bool) -> Self {
        Self {
            results: Vec::new(),
            info: SearchInfo {
                semantic_supported,
                ..SearchInfo::default()
            },
        }
    }
}

/// Which signals a search runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Hybrid,
    Keyword,
    Fuzzy,
    Semantic,
}

impl SearchMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::Keyword => "keyword",
            Self::Fuzzy => "fuzzy",
            Self::Semantic => "semantic",
        }
    }
}

impl FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "keyword" => Ok(Self::Keyword),
            "fuzzy" => Ok(Self::Fuzzy),
            "semantic" => Ok(Self::Semantic),
            other => Err(SearchError::InvalidConfig(format!(
                "unknown search mode '{other}' (expected hybrid, keyword, fuzzy or semantic)"
            ))),
        }
    }
}

/// How hybrid search merges its signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionPolicy {
    /// Reciprocal rank fusion over keyword, fuzzy and semantic lists
    #[default]
    Rrf,
    /// Score blending of fuzzy and semantic lists, min-max normalised
    Weighted,
}

impl FusionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rrf => "rrf",
            Self::Weighted => "weighted",
        }
    }
}

impl FromStr for FusionPolicy {
    type Err = SearchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rrf" => Ok(Self::Rrf),
            "weighted" => Ok(Self::Weighted),
            other => Err(SearchError::InvalidConfig(format!(
                "unknown fusion policy '{other}' (expected rrf or weighted)"
            ))),
        }
    }
}
