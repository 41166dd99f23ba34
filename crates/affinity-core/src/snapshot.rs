//! Model snapshots
//!
//! A snapshot bundles every structure one refresh produces. It is built
//! wholesale from a single consistent input set and never mutated afterwards;
//! readers share it through `Arc`.

use crate::{
    aggregator::{InteractionAggregator, UserItemMatrix},
    config::EngineConfig,
    similarity::SimilarityMatrix,
    types::*,
    vectorizer::{ContentModel, ContentVectorizer},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;
use tracing::info;

/// Shape of a snapshot, reported in engine statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDimensions {
    /// Users in the interaction matrix
    pub users: usize,
    /// Items in the interaction matrix
    pub interacted_items: usize,
    /// Stored (user, item) pairs
    pub interactions: usize,
    /// Items with content vectors
    pub content_items: usize,
    /// Vocabulary size
    pub vocabulary: usize,
}

/// Immutable bundle of interaction, similarity and content structures
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    id: SnapshotId,
    built_at: DateTime<Utc>,
    interactions: UserItemMatrix,
    liked: HashMap<UserId, BTreeSet<ItemId>>,
    user_similarity: SimilarityMatrix<UserId>,
    item_similarity: SimilarityMatrix<ItemId>,
    content: ContentModel,
    content_similarity: SimilarityMatrix<ItemId>,
    catalog: Vec<ItemRecord>,
    catalog_index: HashMap<ItemId, usize>,
}

impl ModelSnapshot {
    /// Build every structure from one set of events and items
    pub fn build(
        events: &[InteractionEvent],
        items: Vec<ItemRecord>,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let start = Instant::now();

        let aggregated = InteractionAggregator::new(config).aggregate(events, now);
        let interactions = aggregated.matrix;

        let user_similarity =
            SimilarityMatrix::cosine(interactions.users().to_vec(), &interactions.user_rows());
        let item_similarity =
            SimilarityMatrix::cosine(interactions.items().to_vec(), &interactions.item_rows());

        let mut catalog = items;
        catalog.sort_by_key(|item| item.id);
        catalog.dedup_by_key(|item| item.id);
        let catalog_index = catalog
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id, i))
            .collect();

        let content = ContentVectorizer::new(config.vectorizer.clone()).fit_transform(&catalog);
        let content_similarity = SimilarityMatrix::cosine(content.item_ids(), &content.rows());

        let snapshot = Self {
            id: SnapshotId::new(),
            built_at: now,
            interactions,
            liked: aggregated.liked,
            user_similarity,
            item_similarity,
            content,
            content_similarity,
            catalog,
            catalog_index,
        };

        let dims = snapshot.dimensions();
        info!(
            snapshot_id = %snapshot.id,
            users = dims.users,
            items = dims.interacted_items,
            content_items = dims.content_items,
            vocabulary = dims.vocabulary,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model snapshot built"
        );

        snapshot
    }

    pub fn id(&self) -> SnapshotId {
        self.id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn interactions(&self) -> &UserItemMatrix {
        &self.interactions
    }

    pub fn user_similarity(&self) -> &SimilarityMatrix<UserId> {
        &self.user_similarity
    }

    pub fn item_similarity(&self) -> &SimilarityMatrix<ItemId> {
        &self.item_similarity
    }

    pub fn content(&self) -> &ContentModel {
        &self.content
    }

    pub fn content_similarity(&self) -> &SimilarityMatrix<ItemId> {
        &self.content_similarity
    }

    /// Items the user liked or authored within the lookback window
    pub fn liked_items(&self, user: UserId) -> Option<&BTreeSet<ItemId>> {
        self.liked.get(&user)
    }

    /// Item catalog, ordered by id
    pub fn catalog(&self) -> &[ItemRecord] {
        &self.catalog
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemRecord> {
        self.catalog_index.get(&id).map(|&i| &self.catalog[i])
    }

    pub fn dimensions(&self) -> SnapshotDimensions {
        let (users, interacted_items) = self.interactions.dimensions();
        SnapshotDimensions {
            users,
            interacted_items,
            interactions: self.interactions.nnz(),
            content_items: self.content.len(),
            vocabulary: self.content.vocabulary.len(),
        }
    }
}
