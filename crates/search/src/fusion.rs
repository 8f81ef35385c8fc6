use crate::types::{RankedItem, SignalSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One ranked input to fusion: best first, with the weight of its signal
#[derive(Debug, Clone)]
pub struct RankedList {
    pub items: Vec<RankedItem>,
    pub weight: f64,
}

impl RankedList {
    #[must_use]
    pub const fn new(items: Vec<RankedItem>, weight: f64) -> Self {
        Self { items, weight }
    }
}

/// Tunables of reciprocal rank fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrfConfig {
    /// Smoothing constant; larger flattens the advantage of top ranks
    pub k: f64,
    pub fuzzy_weight: f64,
    pub semantic_weight: f64,
    pub keyword_weight: f64,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self {
            k: 60.0,
            fuzzy_weight: 0.5,
            semantic_weight: 0.5,
            keyword_weight: 0.25,
        }
    }
}

/// Reciprocal Rank Fusion for combining multiple rankings
#[derive(Debug, Clone, PartialEq)]
pub struct ReciprocalRankFusion {
    k: f64,
    limit: usize,
}

impl ReciprocalRankFusion {
    #[must_use]
    pub const fn new(k: f64, limit: usize) -> Self {
        Self { k, limit }
    }

    /// Fuse ranked lists.
    ///
    /// RRF formula: score(d) = Σ weight_i / (k + idx_i(d)), with `idx` zero-based.
    /// Items merge on [`RankedItem::merge_key`]; equal scores keep first-seen
    /// order. The result carries the fused score and is truncated to `limit`.
    #[must_use]
    pub fn fuse(&self, lists: &[RankedList]) -> Vec<RankedItem> {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut fused: Vec<(RankedItem, f64)> = Vec::new();

        for list in lists {
            for (idx, item) in list.items.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let score = list.weight / (idx as f64 + self.k);
                match slots.get(item.merge_key()) {
                    Some(&slot) => {
                        let (existing, total) = &mut fused[slot];
                        existing.absorb(item);
                        *total += score;
                    }
                    None => {
                        slots.insert(item.merge_key().to_string(), fused.len());
                        fused.push((item.clone(), score));
                    }
                }
            }
        }

        // stable: ties stay in first-seen order
        fused.sort_by(|a, b| b.1.total_cmp(&a.1));
        fused.truncate(self.limit);
        fused
            .into_iter()
            .map(|(mut item, score)| {
                item.fused_score = Some(score);
                item
            })
            .collect()
    }
}

impl Default for ReciprocalRankFusion {
    fn default() -> Self {
        Self::new(60.0, 20)
    }
}

/// Tunables of the weighted hybrid policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedFusionConfig {
    /// Minimum similarity for a semantic-only document to be included
    pub semantic_threshold: f64,
    pub fuzzy_weight: f64,
    pub semantic_weight: f64,
    /// Synthetic fuzzy score at rank r of n is `1 - (r / n) * rank_decay`
    pub rank_decay: f64,
}

impl Default for WeightedFusionConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: 0.5,
            fuzzy_weight: 0.4,
            semantic_weight: 0.6,
            rank_decay: 0.5,
        }
    }
}

/// Score-blending fusion of a fuzzy and a semantic list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedFusion {
    config: WeightedFusionConfig,
}

struct Blended {
    item: RankedItem,
    fuzzy: f64,
    score: f64,
}

impl WeightedFusion {
    #[must_use]
    pub const fn new(config: WeightedFusionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &WeightedFusionConfig {
        &self.config
    }

    /// Blend fuzzy presence and semantic similarity.
    ///
    /// Fuzzy hits get a synthetic rank score for blending (their `fuzzy_score`
    /// stays the matcher's relevance); a semantic-only hit is kept only
    /// when its similarity clears the threshold; documents found by both get the
    /// weighted sum. All scores are then min-max normalised (all equal → 0.5)
    /// and sorted descending.
    #[must_use]
    pub fn fuse(&self, fuzzy: &[RankedItem], semantic: &[RankedItem]) -> Vec<RankedItem> {
        let cfg = &self.config;
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut blended: Vec<Blended> = Vec::with_capacity(fuzzy.len() + semantic.len());

        #[allow(clippy::cast_precision_loss)]
        let len = fuzzy.len() as f64;
        for (rank, item) in fuzzy.iter().enumerate() {
            if slots.contains_key(item.merge_key()) {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let synthetic = 1.0 - (rank as f64 / len) * cfg.rank_decay;
            slots.insert(item.merge_key().to_string(), blended.len());
            blended.push(Blended {
                item: item.clone().source(SignalSource::Fuzzy),
                fuzzy: synthetic,
                score: synthetic,
            });
        }

        for item in semantic {
            let similarity = item.similarity.unwrap_or(0.0);
            match slots.get(item.merge_key()) {
                Some(&slot) => {
                    let entry = &mut blended[slot];
                    if entry.item.source != Some(SignalSource::Fuzzy) {
                        continue;
                    }
                    entry.item.similarity = Some(similarity);
                    entry.item.source = Some(SignalSource::Both);
                    entry.score = cfg
                        .fuzzy_weight
                        .mul_add(entry.fuzzy, cfg.semantic_weight * similarity);
                }
                None if similarity >= cfg.semantic_threshold => {
                    slots.insert(item.merge_key().to_string(), blended.len());
                    blended.push(Blended {
                        item: item.clone().source(SignalSource::Semantic),
                        fuzzy: 0.0,
                        score: similarity,
                    });
                }
                None => {}
            }
        }

        if blended.is_empty() {
            return Vec::new();
        }

        let min = blended.iter().map(|b| b.score).fold(f64::INFINITY, f64::min);
        let max = blended
            .iter()
            .map(|b| b.score)
            .fold(f64::NEG_INFINITY, f64::max);
        for entry in &mut blended {
            entry.score = normalize_score(entry.score, min, max);
        }

        blended.sort_by(|a, b| b.score.total_cmp(&a.score));
        blended
            .into_iter()
            .map(|Blended { mut item, score, .. }| {
                item.fused_score = Some(score);
                item
            })
            .collect()
    }
}

fn normalize_score(score: f64, min: f64, max: f64) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        return 0.5;
    }
    (score - min) / (max - min)
}
