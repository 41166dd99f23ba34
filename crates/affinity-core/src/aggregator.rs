//! Interaction aggregation
//!
//! Folds raw interaction events into a weighted user × item matrix:
//! - Per-type base weights
//! - Exponential recency decay
//! - Lookback window cut-off
//! - Per-user "liked" sets for content scoring

use crate::{
    config::{EngineConfig, InteractionWeights},
    types::*,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Sparse row: (column index, value) pairs sorted by column
pub type SparseRow = Vec<(usize, f64)>;

/// Sparse user × item weight matrix
///
/// Users and items are ordered by ascending id; only observed pairs are stored.
#[derive(Debug, Clone, Default)]
pub struct UserItemMatrix {
    users: Vec<UserId>,
    items: Vec<ItemId>,
    user_index: HashMap<UserId, usize>,
    item_index: HashMap<ItemId, usize>,
    /// Per user row: item column -> weight
    rows: Vec<BTreeMap<usize, f64>>,
}

impl UserItemMatrix {
    /// Build from summed pair weights
    pub fn from_weights(weights: &BTreeMap<(UserId, ItemId), f64>) -> Self {
        let users: Vec<UserId> = weights
            .keys()
            .map(|(u, _)| *u)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let items: Vec<ItemId> = weights
            .keys()
            .map(|(_, i)| *i)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let user_index: HashMap<UserId, usize> =
            users.iter().enumerate().map(|(i, u)| (*u, i)).collect();
        let item_index: HashMap<ItemId, usize> =
            items.iter().enumerate().map(|(i, it)| (*it, i)).collect();

        let mut rows = vec![BTreeMap::new(); users.len()];
        for ((user, item), weight) in weights {
            rows[user_index[user]].insert(item_index[item], *weight);
        }

        Self {
            users,
            items,
            user_index,
            item_index,
            rows,
        }
    }

    /// Users, in row order
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    /// Items, in column order
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// (users, items)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.users.len(), self.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Number of stored (user, item) pairs
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(BTreeMap::len).sum()
    }

    pub fn contains_user(&self, user: UserId) -> bool {
        self.user_index.contains_key(&user)
    }

    /// Weight of a pair; `None` when the pair was never observed
    pub fn weight(&self, user: UserId, item: ItemId) -> Option<f64> {
        let row = self.user_index.get(&user)?;
        let col = self.item_index.get(&item)?;
        self.rows[*row].get(col).copied()
    }

    /// Items a user interacted with, and their weights
    pub fn user_items(&self, user: UserId) -> Vec<(ItemId, f64)> {
        self.user_index
            .get(&user)
            .map(|&row| {
                self.rows[row]
                    .iter()
                    .map(|(col, w)| (self.items[*col], *w))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Items with a positive weight for this user
    pub fn interacted(&self, user: UserId) -> HashSet<ItemId> {
        self.user_items(user)
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(item, _)| item)
            .collect()
    }

    /// One sparse row per user, columns are item positions
    pub fn user_rows(&self) -> Vec<SparseRow> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|(c, w)| (*c, *w)).collect())
            .collect()
    }

    /// One sparse row per item (the transpose), columns are user positions
    pub fn item_rows(&self) -> Vec<SparseRow> {
        let mut columns: Vec<SparseRow> = vec![Vec::new(); self.items.len()];
        // Iterating users in order keeps every column sorted
        for (user_pos, row) in self.rows.iter().enumerate() {
            for (item_pos, weight) in row {
                columns[*item_pos].push((user_pos, *weight));
            }
        }
        columns
    }
}

/// Output of one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct AggregatedInteractions {
    pub matrix: UserItemMatrix,
    /// Items each user liked or authored (configured interaction subset)
    pub liked: HashMap<UserId, BTreeSet<ItemId>>,
}

/// Folds interaction events into an [`AggregatedInteractions`]
#[derive(Debug, Clone)]
pub struct InteractionAggregator {
    weights: InteractionWeights,
    half_life_days: f64,
    lookback_days: i64,
    liked_kinds: Vec<InteractionKind>,
}

impl InteractionAggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            weights: config.interaction_weights.clone(),
            half_life_days: config.decay_half_life_days,
            lookback_days: config.lookback_days,
            liked_kinds: config.content_interactions.clone(),
        }
    }

    /// Recency multiplier for an event `days_ago` whole days old
    pub fn decay(&self, days_ago: i64) -> f64 {
        (-(days_ago.max(0) as f64) / self.half_life_days).exp()
    }

    /// Decayed weight of a single event relative to `now`
    pub fn event_weight(&self, event: &InteractionEvent, now: DateTime<Utc>) -> f64 {
        let days_ago = (now - event.timestamp).num_days();
        self.weights.weight(&event.kind) * self.decay(days_ago)
    }

    /// Aggregate events observed within the lookback window ending at `now`
    pub fn aggregate(&self, events: &[InteractionEvent], now: DateTime<Utc>) -> AggregatedInteractions {
        let cutoff = now - Duration::days(self.lookback_days);

        let mut weights: BTreeMap<(UserId, ItemId), f64> = BTreeMap::new();
        let mut liked: HashMap<UserId, BTreeSet<ItemId>> = HashMap::new();
        let mut skipped = 0usize;

        for event in events {
            if event.timestamp < cutoff {
                skipped += 1;
                continue;
            }

            *weights.entry((event.user_id, event.item_id)).or_insert(0.0) +=
                self.event_weight(event, now);

            if self.liked_kinds.contains(&event.kind) {
                liked.entry(event.user_id).or_default().insert(event.item_id);
            }
        }

        let matrix = UserItemMatrix::from_weights(&weights);
        let (users, items) = matrix.dimensions();

        debug!(
            events = events.len(),
            skipped,
            users,
            items,
            pairs = matrix.nnz(),
            "Interactions aggregated"
        );

        AggregatedInteractions { matrix, liked }
    }
}
