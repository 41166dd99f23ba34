//! Weighted blending of two score lists

use crate::types::{rank, ScoredItem, ItemId};
use std::collections::HashMap;

/// Blend two ranked lists into one
///
/// Each id in either list scores `weight_a × a + weight_b × b`, a missing entry
/// counting as 0. The result is ranked but not truncated. Weights are expected
/// to have been validated once at configuration time
/// (see [`HybridWeights`](crate::config::HybridWeights)).
pub fn combine(list_a: &[ScoredItem], list_b: &[ScoredItem], weight_a: f64, weight_b: f64) -> Vec<ScoredItem> {
    let mut combined: HashMap<ItemId, f64> = HashMap::with_capacity(list_a.len() + list_b.len());

    for scored in list_a {
        *combined.entry(scored.id).or_insert(0.0) += weight_a * scored.score;
    }
    for scored in list_b {
        *combined.entry(scored.id).or_insert(0.0) += weight_b * scored.score;
    }

    let mut ranked: Vec<ScoredItem> = combined
        .into_iter()
        .map(|(id, score)| ScoredItem::new(id, score))
        .collect();
    rank(&mut ranked);
    ranked
}
