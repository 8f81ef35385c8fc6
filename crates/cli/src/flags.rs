use clap::ValueEnum;
use postsearch_search::{FusionPolicy, SearchMode};
use postsearch_vector_store::{EmbeddingGranularity, EmbeddingMode};

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum EmbedMode {
    Fast,
    Stub,
}

impl EmbedMode {
    pub(crate) const fn as_domain(self) -> EmbeddingMode {
        match self {
            EmbedMode::Fast => EmbeddingMode::Fast,
            EmbedMode::Stub => EmbeddingMode::Stub,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum ModeFlag {
    Hybrid,
    Keyword,
    Fuzzy,
    Semantic,
}

impl ModeFlag {
    pub(crate) const fn as_domain(self) -> SearchMode {
        match self {
            ModeFlag::Hybrid => SearchMode::Hybrid,
            ModeFlag::Keyword => SearchMode::Keyword,
            ModeFlag::Fuzzy => SearchMode::Fuzzy,
            ModeFlag::Semantic => SearchMode::Semantic,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum FusionFlag {
    Rrf,
    Weighted,
}

impl FusionFlag {
    pub(crate) const fn as_domain(self) -> FusionPolicy {
        match self {
            FusionFlag::Rrf => FusionPolicy::Rrf,
            FusionFlag::Weighted => FusionPolicy::Weighted,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum GranularityFlag {
    Document,
    Chunks,
}

impl GranularityFlag {
    pub(crate) const fn as_domain(self) -> EmbeddingGranularity {
        match self {
            GranularityFlag::Document => EmbeddingGranularity::Document,
            GranularityFlag::Chunks => EmbeddingGranularity::Chunks,
        }
    }
}
