//! User-based collaborative filtering

use crate::{
    config::EngineConfig,
    snapshot::ModelSnapshot,
    types::*,
};
use std::collections::HashMap;
use tracing::debug;

/// Ranks items for a user from what their nearest neighbours interacted with
///
/// `score[item] = Σ similarity(user, neighbour) × weight(neighbour, item)`
/// over the top-K neighbours at or above the similarity threshold.
#[derive(Debug, Clone)]
pub struct CollaborativeScorer {
    neighbors: usize,
    threshold: f64,
}

impl CollaborativeScorer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            neighbors: config.neighbors,
            threshold: config.similarity_threshold,
        }
    }

    /// Ranked items for `user`; empty when the user is not in the snapshot
    pub fn recommend(&self, user: UserId, snapshot: &ModelSnapshot, limit: usize) -> Vec<ScoredItem> {
        let matrix = snapshot.interactions();
        if !matrix.contains_user(user) {
            return Vec::new();
        }

        let neighbors = snapshot
            .user_similarity()
            .most_similar(user, self.threshold, self.neighbors);
        let seen = matrix.interacted(user);

        let mut scores: HashMap<ItemId, f64> = HashMap::new();
        for neighbor in &neighbors {
            for (item, weight) in matrix.user_items(neighbor.id) {
                if weight > 0.0 && !seen.contains(&item) {
                    *scores.entry(item).or_insert(0.0) += neighbor.score * weight;
                }
            }
        }

        let mut ranked: Vec<ScoredItem> = scores
            .into_iter()
            .map(|(item, score)| ScoredItem::new(item, score))
            .collect();
        rank(&mut ranked);
        ranked.truncate(limit);

        debug!(
            user = %user,
            neighbors = neighbors.len(),
            candidates = ranked.len(),
            "Collaborative scoring complete"
        );

        ranked
    }

    /// Users most similar to `user`, excluding the user itself
    pub fn similar_users(&self, user: UserId, snapshot: &ModelSnapshot, limit: usize) -> Vec<ScoredUser> {
        snapshot
            .user_similarity()
            .most_similar(user, self.threshold, limit)
    }
}
