//! Content-based scoring over TF-IDF similarity

use crate::{
    config::EngineConfig,
    snapshot::ModelSnapshot,
    types::*,
};
use ndarray::Array1;
use tracing::debug;

/// Ranks items by their mean content similarity to what the user liked
#[derive(Debug, Clone)]
pub struct ContentScorer {
    threshold: f64,
}

impl ContentScorer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            threshold: config.similarity_threshold,
        }
    }

    /// Ranked items for `user`; empty when the user liked nothing with content
    pub fn recommend(&self, user: UserId, snapshot: &ModelSnapshot, limit: usize) -> Vec<ScoredItem> {
        let Some(liked) = snapshot.liked_items(user) else {
            return Vec::new();
        };

        let similarity = snapshot.content_similarity();
        let rows: Vec<_> = liked.iter().filter_map(|item| similarity.row(*item)).collect();
        if rows.is_empty() {
            return Vec::new();
        }

        let mut mean = Array1::<f64>::zeros(similarity.len());
        for row in &rows {
            mean += row;
        }
        mean /= rows.len() as f64;

        let mut ranked: Vec<ScoredItem> = similarity
            .ids()
            .iter()
            .zip(mean.iter())
            .filter(|(item, score)| !liked.contains(*item) && **score >= self.threshold && **score > 0.0)
            .map(|(item, score)| ScoredItem::new(*item, *score))
            .collect();
        rank(&mut ranked);
        ranked.truncate(limit);

        debug!(
            user = %user,
            liked = rows.len(),
            candidates = ranked.len(),
            "Content scoring complete"
        );

        ranked
    }

    /// Items most similar to `item`, excluding the item itself
    ///
    /// Uses content similarity, or collaborative item similarity when the item
    /// has no content vector. `None` when neither model knows the item.
    pub fn similar_items(&self, item: ItemId, snapshot: &ModelSnapshot, limit: usize) -> Option<Vec<ScoredItem>> {
        let content = snapshot.content_similarity();
        if content.contains(item) {
            return Some(content.most_similar(item, self.threshold, limit));
        }

        let collaborative = snapshot.item_similarity();
        if collaborative.contains(item) {
            return Some(collaborative.most_similar(item, self.threshold, limit));
        }

        None
    }
}
