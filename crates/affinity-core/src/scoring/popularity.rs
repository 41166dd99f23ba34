//! Popularity fallback for cold-start users
//!
//! Engagement = likes × 3 + comments × 2 + views × 0.5

use crate::{
    config::EngineConfig,
    types::*,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Categories used for personalised popularity
pub const PREFERRED_CATEGORY_COUNT: usize = 3;

/// Engagement-based ranking
#[derive(Debug, Clone)]
pub struct PopularityRanker {
    recent_days: Option<i64>,
}

impl PopularityRanker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            recent_days: config.popularity_recent_days,
        }
    }

    /// Every item ranked by engagement
    ///
    /// With a recency window configured, only items created inside it are
    /// ranked, unless none are, in which case the whole catalog is.
    pub fn rank_global(&self, items: &[ItemRecord], now: DateTime<Utc>) -> Vec<ScoredItem> {
        if let Some(days) = self.recent_days {
            let cutoff = now - Duration::days(days);
            let recent: Vec<&ItemRecord> = items.iter().filter(|i| i.created_at >= cutoff).collect();
            if !recent.is_empty() {
                return rank_by_engagement(recent);
            }
        }
        rank_by_engagement(items.iter())
    }

    /// Items from the given categories ranked by engagement
    pub fn rank_categories(&self, items: &[ItemRecord], categories: &[i64]) -> Vec<ScoredItem> {
        rank_by_engagement(
            items
                .iter()
                .filter(|i| i.category_id.is_some_and(|c| categories.contains(&c))),
        )
    }

    /// Popular items from the user's favourite categories, or the global
    /// ranking when no category preference can be derived
    pub fn rank_personalized(
        &self,
        items: &[ItemRecord],
        interacted: &[ItemId],
        now: DateTime<Utc>,
    ) -> Vec<ScoredItem> {
        let categories = preferred_categories(items, interacted, PREFERRED_CATEGORY_COUNT);
        if !categories.is_empty() {
            let ranked = self.rank_categories(items, &categories);
            if !ranked.is_empty() {
                return ranked;
            }
        }
        self.rank_global(items, now)
    }
}

/// The user's most-interacted categories, most frequent first (ties by id)
///
/// `interacted` holds one entry per interaction, so repeat visits count.
pub fn preferred_categories(items: &[ItemRecord], interacted: &[ItemId], top: usize) -> Vec<i64> {
    let category_of: HashMap<ItemId, i64> = items
        .iter()
        .filter_map(|i| i.category_id.map(|c| (i.id, c)))
        .collect();

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for item in interacted {
        if let Some(category) = category_of.get(item) {
            *counts.entry(*category).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(i64, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(top).map(|(c, _)| c).collect()
}

fn rank_by_engagement<'a>(items: impl IntoIterator<Item = &'a ItemRecord>) -> Vec<ScoredItem> {
    let mut ranked: Vec<ScoredItem> = items
        .into_iter()
        .map(|i| ScoredItem::new(i.id, i.engagement()))
        .collect();
    rank(&mut ranked);
    ranked
}
