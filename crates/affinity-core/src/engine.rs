//! Recommendation Engine - request-layer entry point
//!
//! Coordinates:
//! - Cache lookups and stores
//! - Snapshot access and background refresh
//! - Cold-start policy (popularity, category popularity, hybrid)
//! - Storage fallbacks when the database is unreachable

use crate::{
    cache::{CacheBackend, CacheKey, CacheStats, MemoryCache, RecommendationCache},
    config::{EngineConfig, HybridWeights},
    refresh::{ModelRefreshController, RefreshOutcome},
    scoring::{combine, CollaborativeScorer, ContentScorer, PopularityRanker},
    snapshot::{ModelSnapshot, SnapshotDimensions},
    storage::InteractionStore,
    types::*,
    Error, Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Engine statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub state: ModelState,
    pub snapshot_id: Option<SnapshotId>,
    pub last_build_time: Option<DateTime<Utc>>,
    pub dimensions: SnapshotDimensions,
    pub cache_enabled: bool,
    pub cache: CacheStats,
    pub similarity_threshold: f64,
    pub min_interactions: usize,
    pub use_hybrid: bool,
    pub weights: HybridWeights,
    pub refresh_interval_secs: u64,
    pub build_attempts: u64,
    pub build_failures: u64,
}

/// Hybrid recommendation engine
pub struct RecommendationEngine {
    config: Arc<EngineConfig>,
    store: Arc<dyn InteractionStore>,
    cache: Arc<RecommendationCache>,
    controller: Arc<ModelRefreshController>,
    collaborative: CollaborativeScorer,
    content: ContentScorer,
    popularity: PopularityRanker,
}

impl RecommendationEngine {
    /// Create an engine; fails on an invalid configuration
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn InteractionStore>,
        cache_backend: Arc<dyn CacheBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let cache = Arc::new(RecommendationCache::new(
            cache_backend,
            config.cache_enabled,
            config.cache_ttl(),
        ));
        let controller = Arc::new(ModelRefreshController::new(
            config.clone(),
            store.clone(),
            cache.clone(),
        ));

        Ok(Self {
            collaborative: CollaborativeScorer::new(&config),
            content: ContentScorer::new(&config),
            popularity: PopularityRanker::new(&config),
            config,
            store,
            cache,
            controller,
        })
    }

    /// Create an engine backed by an in-process cache
    pub fn with_memory_cache(config: EngineConfig, store: Arc<dyn InteractionStore>) -> Result<Self> {
        Self::new(config, store, Arc::new(MemoryCache::new()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Refresh controller, for state subscriptions and snapshot access
    pub fn controller(&self) -> &Arc<ModelRefreshController> {
        &self.controller
    }

    /// Run the first model build
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let outcome = self.controller.refresh().await?;
        info!(snapshot_id = %outcome.snapshot().id(), "Recommendation engine initialized");
        Ok(())
    }

    /// Rebuild the model now
    #[instrument(skip(self))]
    pub async fn trigger_refresh(&self) -> Result<RefreshOutcome> {
        self.controller.refresh().await
    }

    /// Published snapshot, scheduling a background rebuild when it is due
    async fn current_snapshot(&self) -> Option<Arc<ModelSnapshot>> {
        if self.controller.needs_refresh().await {
            self.controller.mark_stale().await;
            if self.config.auto_refresh && self.controller.state().await != ModelState::Building {
                self.spawn_refresh();
            }
        }
        self.controller.snapshot().await
    }

    fn spawn_refresh(&self) {
        let controller = self.controller.clone();
        debug!("Scheduling background refresh");
        tokio::spawn(async move {
            if let Err(e) = controller.refresh().await {
                warn!(error = %e, "Background refresh failed");
            }
        });
    }

    /// Personalised items for a user
    ///
    /// Users with no history get the most engaging items overall; users with
    /// little history get popular items from their favourite categories.
    /// Everyone else gets hybrid (or collaborative-only) scores.
    #[instrument(skip(self))]
    pub async fn recommend_for_user(
        &self,
        user: UserId,
        limit: usize,
        exclude_seen: bool,
    ) -> Result<Vec<ScoredItem>> {
        let key = CacheKey::new(RecommendationKind::Posts, user.0)
            .param("limit", limit)
            .param("exclude_seen", exclude_seen);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let generation = self.controller.generation();
        let snapshot = self.current_snapshot().await;
        let catalog = self.catalog(snapshot.as_deref()).await?;
        let now = Utc::now();

        let history: Vec<ItemId> = match self.store.user_interactions(user).await {
            Ok(events) => events.into_iter().map(|e| e.item_id).collect(),
            Err(e) => {
                warn!(user = %user, error = %e, "User history unavailable, using snapshot");
                snapshot
                    .as_deref()
                    .map(|s| s.interactions().user_items(user).into_iter().map(|(item, _)| item).collect())
                    .unwrap_or_default()
            }
        };

        let (strategy, mut ranked) = if history.is_empty() {
            ("popular", self.popularity.rank_global(catalog.as_ref(), now))
        } else if history.len() < self.config.min_interactions {
            (
                "category_popular",
                self.popularity.rank_personalized(catalog.as_ref(), &history, now),
            )
        } else {
            let scored = snapshot
                .as_deref()
                .map(|s| self.score_personalized(user, s, limit))
                .unwrap_or_default();
            if scored.is_empty() {
                ("popular", self.popularity.rank_global(catalog.as_ref(), now))
            } else {
                (if self.config.use_hybrid { "hybrid" } else { "collaborative" }, scored)
            }
        };

        if exclude_seen && !history.is_empty() {
            let seen = self.seen_items(user, snapshot.as_deref(), &history).await;
            ranked.retain(|s| !seen.contains(&s.id));
        }
        ranked.truncate(limit);

        debug!(
            user = %user,
            strategy,
            interactions = history.len(),
            results = ranked.len(),
            "Recommendations computed"
        );

        self.put_if_current(&key, &ranked, generation).await;
        Ok(ranked)
    }

    /// Cache a list computed under publish `generation`
    ///
    /// A refresh that publishes while the list is being computed or written
    /// clears the cache; the list must not outlive that clear.
    async fn put_if_current<K: Serialize>(&self, key: &CacheKey, list: &[Scored<K>], generation: u64) {
        if self.controller.generation() != generation {
            debug!(key = %key, "Model replaced during request, skipping cache write");
            return;
        }
        self.cache.put(key, list).await;
        if self.controller.generation() != generation {
            self.cache.remove(key).await;
        }
    }

    fn score_personalized(&self, user: UserId, snapshot: &ModelSnapshot, limit: usize) -> Vec<ScoredItem> {
        let pool = limit.saturating_mul(2);
        let collaborative = self.collaborative.recommend(user, snapshot, pool);
        if !self.config.use_hybrid {
            return collaborative;
        }

        let content = self.content.recommend(user, snapshot, pool);
        let weights = &self.config.weights;
        combine(&collaborative, &content, weights.collaborative, weights.content)
    }

    /// Item catalog from the snapshot, or straight from storage before the
    /// first build
    async fn catalog<'a>(&self, snapshot: Option<&'a ModelSnapshot>) -> Result<Cow<'a, [ItemRecord]>> {
        match snapshot {
            Some(s) => Ok(Cow::Borrowed(s.catalog())),
            None => Ok(Cow::Owned(self.store.items().await?)),
        }
    }

    async fn seen_items(&self, user: UserId, snapshot: Option<&ModelSnapshot>, history: &[ItemId]) -> HashSet<ItemId> {
        match self.store.seen_items(user).await {
            Ok(seen) => seen,
            Err(e) => {
                warn!(user = %user, error = %e, "Seen items unavailable, using snapshot");
                let mut seen: HashSet<ItemId> = history.iter().copied().collect();
                if let Some(s) = snapshot {
                    seen.extend(s.interactions().interacted(user));
                }
                seen
            }
        }
    }

    /// Items most similar to an item
    #[instrument(skip(self))]
    pub async fn recommend_similar(&self, item: ItemId, limit: usize) -> Result<Vec<ScoredItem>> {
        let key = CacheKey::new(RecommendationKind::Similar, item.0).param("limit", limit);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let generation = self.controller.generation();
        let snapshot = self.current_snapshot().await.ok_or(Error::NotReady)?;
        let similar = self
            .content
            .similar_items(item, &snapshot, limit)
            .ok_or(Error::NotFound { kind: "item", id: item.0 })?;

        self.put_if_current(&key, &similar, generation).await;
        Ok(similar)
    }

    /// Users with the most similar interaction history
    ///
    /// Users unknown to the model get an empty list.
    #[instrument(skip(self))]
    pub async fn recommend_users(&self, user: UserId, limit: usize) -> Result<Vec<ScoredUser>> {
        let key = CacheKey::new(RecommendationKind::Users, user.0).param("limit", limit);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let generation = self.controller.generation();
        let snapshot = self.current_snapshot().await.ok_or(Error::NotReady)?;
        let similar = self.collaborative.similar_users(user, &snapshot, limit);

        self.put_if_current(&key, &similar, generation).await;
        Ok(similar)
    }

    /// Drop a user's cached recommendations, e.g. after new activity
    pub async fn invalidate_user(&self, user: UserId) -> usize {
        self.cache.invalidate_user(user).await
    }

    pub async fn get_statistics(&self) -> EngineStats {
        let snapshot = self.controller.snapshot().await;

        EngineStats {
            state: self.controller.state().await,
            snapshot_id: snapshot.as_ref().map(|s| s.id()),
            last_build_time: snapshot.as_ref().map(|s| s.built_at()),
            dimensions: snapshot.as_ref().map(|s| s.dimensions()).unwrap_or_default(),
            cache_enabled: self.cache.is_enabled(),
            cache: self.cache.stats(),
            similarity_threshold: self.config.similarity_threshold,
            min_interactions: self.config.min_interactions,
            use_hybrid: self.config.use_hybrid,
            weights: self.config.weights,
            refresh_interval_secs: self.config.refresh_interval_secs,
            build_attempts: self.controller.build_attempts(),
            build_failures: self.controller.build_failures(),
        }
    }
}
