use crate::fusion::{RrfConfig, WeightedFusionConfig};
use crate::fuzzy::FuzzyConfig;
use crate::types::{FusionPolicy, SearchMode};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Search tunables, loadable from TOML. Every field is optional in the file.
///
/// ```toml
/// limit = 10
/// fusion = "weighted"
///
/// [fuzzy]
/// threshold = 0.3
///
/// [weighted]
/// semantic_threshold = 0.6
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Cap on every signal's list and on the fused output
    pub limit: usize,
    pub mode: SearchMode,
    pub fusion: FusionPolicy,
    pub fuzzy: FuzzyConfig,
    pub rrf: RrfConfig,
    pub weighted: WeightedFusionConfig,
    /// Quiet period before the pipeline runs the latest query
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: 20,
            mode: SearchMode::default(),
            fusion: FusionPolicy::default(),
            fuzzy: FuzzyConfig::default(),
            rrf: RrfConfig::default(),
            weighted: WeightedFusionConfig::default(),
            debounce_ms: 300,
        }
    }
}

impl SearchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read search config {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("Invalid search config {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("Search config is not valid TOML")?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(anyhow!("limit must be greater than zero"));
        }
        self.fuzzy.validate()?;

        if !self.rrf.k.is_finite() || self.rrf.k <= 0.0 {
            return Err(anyhow!("rrf.k must be positive, got {}", self.rrf.k));
        }
        check_weight("rrf.fuzzy_weight", self.rrf.fuzzy_weight)?;
        check_weight("rrf.semantic_weight", self.rrf.semantic_weight)?;
        check_weight("rrf.keyword_weight", self.rrf.keyword_weight)?;

        let threshold = self.weighted.semantic_threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "weighted.semantic_threshold must be within -1..=1, got {threshold}"
            ));
        }
        check_weight("weighted.fuzzy_weight", self.weighted.fuzzy_weight)?;
        check_weight("weighted.semantic_weight", self.weighted.semantic_weight)?;
        if !(0.0..=1.0).contains(&self.weighted.rank_decay) {
            return Err(anyhow!(
                "weighted.rank_decay must be within 0..=1, got {}",
                self.weighted.rank_decay
            ));
        }
        Ok(())
    }
}

fn check_weight(path: &str, weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(anyhow!("{path} must be a non-negative number, got {weight}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = SearchConfig::from_toml_str("").unwrap();
        assert_eq!(config, SearchConfig::default());
        assert_eq!(config.rrf.k, 60.0);
        assert_eq!(config.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = SearchConfig::from_toml_str(
            r#"
            limit = 5
            fusion = "weighted"

            [fuzzy]
            threshold = 0.25

            [weighted]
            semantic_threshold = 0.7
            "#,
        )
        .unwrap();

        assert_eq!(config.limit, 5);
        assert_eq!(config.fusion, FusionPolicy::Weighted);
        assert_eq!(config.fuzzy.threshold, 0.25);
        assert_eq!(config.fuzzy.min_match_char_length, 2);
        assert_eq!(config.weighted.semantic_threshold, 0.7);
        assert_eq!(config.weighted.semantic_weight, 0.6);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for raw in [
            "limit = 0",
            "[fuzzy]\nthreshold = 2.0",
            "[rrf]\nk = 0.0",
            "[rrf]\nsemantic_weight = -1.0",
            "[weighted]\nsemantic_threshold = 1.5",
        ] {
            assert!(SearchConfig::from_toml_str(raw).is_err(), "accepted: {raw}");
        }
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = SearchConfig::from_toml_str("limt = 3").unwrap_err();
        assert!(format!("{err:#}").contains("limt"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.toml");
        std::fs::write(&path, "mode = \"fuzzy\"\ndebounce_ms = 50\n").unwrap();

        let config = SearchConfig::load(&path).unwrap();
        assert_eq!(config.mode, SearchMode::Fuzzy);
        assert_eq!(config.debounce(), Duration::from_millis(50));

        let missing = SearchConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(missing.to_string().contains("Failed to read search config"));
    }
}
