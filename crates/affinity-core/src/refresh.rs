//! Model refresh controller
//!
//! Owns the published snapshot and the build lifecycle:
//! - at most one build at a time; concurrent callers share its outcome
//! - builds run on a blocking worker from one consistent storage read
//! - a successful build is swapped in atomically, then the cache is cleared
//! - a failed build leaves the previous snapshot published
//! - a build runs on its own task, so a cancelled caller never strands it

use crate::{
    cache::RecommendationCache,
    config::EngineConfig,
    snapshot::ModelSnapshot,
    storage::InteractionStore,
    types::*,
    Error, Result,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Result of a successful [`ModelRefreshController::refresh`]
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// This call ran the build
    Built(Arc<ModelSnapshot>),
    /// Another call's build was in progress; this is its snapshot
    Coalesced(Arc<ModelSnapshot>),
}

impl RefreshOutcome {
    pub fn snapshot(&self) -> &Arc<ModelSnapshot> {
        match self {
            RefreshOutcome::Built(s) | RefreshOutcome::Coalesced(s) => s,
        }
    }

    pub fn is_coalesced(&self) -> bool {
        matches!(self, RefreshOutcome::Coalesced(_))
    }
}

/// Builds and publishes model snapshots
pub struct ModelRefreshController {
    config: Arc<EngineConfig>,
    store: Arc<dyn InteractionStore>,
    cache: Arc<RecommendationCache>,
    /// Currently published snapshot; locked only for pointer clone/swap
    published: RwLock<Option<Arc<ModelSnapshot>>>,
    /// When the published snapshot was built (monotonic)
    last_success: RwLock<Option<Instant>>,
    state: RwLock<ModelState>,
    state_tx: watch::Sender<ModelState>,
    /// Held for the whole of a build
    build_lock: Arc<Mutex<()>>,
    /// Bumped on every publish, before the cache is cleared
    generation: AtomicU64,
    /// Outcome of the most recent build, shared with coalesced callers
    last_outcome: RwLock<Option<std::result::Result<Arc<ModelSnapshot>, String>>>,
    attempts: AtomicU64,
    failures: AtomicU64,
}

impl ModelRefreshController {
    pub fn new(
        config: Arc<EngineConfig>,
        store: Arc<dyn InteractionStore>,
        cache: Arc<RecommendationCache>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ModelState::Stale);

        Self {
            config,
            store,
            cache,
            published: RwLock::new(None),
            last_success: RwLock::new(None),
            state: RwLock::new(ModelState::Stale),
            state_tx,
            build_lock: Arc::new(Mutex::new(())),
            generation: AtomicU64::new(0),
            last_outcome: RwLock::new(None),
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Currently published snapshot
    pub async fn snapshot(&self) -> Option<Arc<ModelSnapshot>> {
        self.published.read().await.clone()
    }

    /// Get current state
    pub async fn state(&self) -> ModelState {
        *self.state.read().await
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ModelState> {
        self.state_tx.subscribe()
    }

    /// True when nothing is published or the interval has elapsed since the
    /// last successful build
    pub async fn needs_refresh(&self) -> bool {
        match *self.last_success.read().await {
            None => true,
            Some(built) => built.elapsed() >= self.config.refresh_interval(),
        }
    }

    /// Build time of the published snapshot
    pub async fn last_build_time(&self) -> Option<DateTime<Utc>> {
        self.published.read().await.as_ref().map(|s| s.built_at())
    }

    /// Publish counter; changes whenever a new snapshot replaces the old one
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Build attempts started so far
    pub fn build_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Build attempts that failed
    pub fn build_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Move a ready model to stale once its interval has passed
    pub async fn mark_stale(&self) {
        let mut state = self.state.write().await;
        if *state == ModelState::Ready {
            *state = ModelState::Stale;
            let _ = self.state_tx.send(ModelState::Stale);
            debug!("Model marked stale");
        }
    }

    /// Transition to new state
    async fn set_state(&self, new_state: ModelState) -> Result<()> {
        let mut state = self.state.write().await;
        let current = *state;

        if current == new_state {
            return Ok(());
        }
        if !current.can_transition_to(new_state) {
            return Err(Error::InvalidStateTransition {
                from: current.to_string(),
                to: new_state.to_string(),
            });
        }

        *state = new_state;
        let _ = self.state_tx.send(new_state);

        debug!(from = %current, to = %new_state, "Model state transition");

        Ok(())
    }

    /// Rebuild and publish the model
    ///
    /// If a build is already running this waits for it and returns its
    /// outcome instead of starting another. The build itself runs on a
    /// spawned task: dropping this future abandons the wait, not the build.
    #[instrument(skip(self))]
    pub async fn refresh(self: &Arc<Self>) -> Result<RefreshOutcome> {
        let guard = match self.build_lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Refresh in progress, waiting for its outcome");
                let _guard = self.build_lock.lock().await;
                return match self.last_outcome.read().await.clone() {
                    Some(Ok(snapshot)) => Ok(RefreshOutcome::Coalesced(snapshot)),
                    Some(Err(message)) => Err(Error::RefreshFailure(message)),
                    None => Err(Error::Internal("refresh finished without an outcome".into())),
                };
            }
        };

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            controller.build_and_publish().await
        })
        .await
        .map_err(|e| Error::Internal(format!("refresh task failed: {e}")))?
    }

    /// Runs with the build lock held
    async fn build_and_publish(&self) -> Result<RefreshOutcome> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        self.set_state(ModelState::Building).await?;
        let start = Instant::now();

        match self.build().await {
            Ok(snapshot) => {
                *self.published.write().await = Some(snapshot.clone());
                *self.last_success.write().await = Some(Instant::now());
                self.generation.fetch_add(1, Ordering::SeqCst);
                self.set_state(ModelState::Ready).await?;

                let invalidated = self.cache.invalidate_all().await;

                info!(
                    attempt,
                    snapshot_id = %snapshot.id(),
                    invalidated,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Model refreshed"
                );

                *self.last_outcome.write().await = Some(Ok(snapshot.clone()));
                Ok(RefreshOutcome::Built(snapshot))
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let message = e.to_string();

                let fallback = if self.published.read().await.is_some() {
                    warn!(attempt, error = %message, "Model refresh failed, keeping previous snapshot");
                    ModelState::Ready
                } else {
                    error!(attempt, error = %message, "Initial model build failed");
                    ModelState::Stale
                };
                self.set_state(fallback).await?;

                *self.last_outcome.write().await = Some(Err(message.clone()));
                Err(Error::RefreshFailure(message))
            }
        }
    }

    async fn build(&self) -> Result<Arc<ModelSnapshot>> {
        let now = Utc::now();
        let since = now - chrono::Duration::days(self.config.lookback_days);

        let events = self.store.interactions_since(since).await?;
        let items = self.store.items().await?;
        debug!(events = events.len(), items = items.len(), "Loaded build inputs");

        let config = self.config.clone();
        let snapshot = tokio::task::spawn_blocking(move || ModelSnapshot::build(&events, items, &config, now))
            .await
            .map_err(|e| Error::Internal(format!("build task failed: {e}")))?;

        Ok(Arc::new(snapshot))
    }
}

impl std::fmt::Debug for ModelRefreshController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRefreshController")
            .field("attempts", &self.build_attempts())
            .field("failures", &self.build_failures())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, MemoryCache};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    /// Slow store that counts reads and can be switched off
    struct FlakyStore {
        inner: MemoryStore,
        reads: AtomicU64,
        offline: AtomicBool,
        delay: Duration,
    }

    impl FlakyStore {
        fn new(delay: Duration) -> Self {
            let now = Utc::now();
            let dataset = crate::storage::Dataset {
                items: Vec::new(),
                interactions: vec![
                    InteractionEvent::new(1, 10, InteractionKind::Like, now),
                    InteractionEvent::new(2, 10, InteractionKind::Like, now),
                ],
            };
            Self {
                inner: MemoryStore::from_dataset(dataset),
                reads: AtomicU64::new(0),
                offline: AtomicBool::new(false),
                delay,
            }
        }
    }

    #[async_trait]
    impl InteractionStore for FlakyStore {
        async fn interactions_since(&self, since: DateTime<Utc>) -> Result<Vec<InteractionEvent>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::unavailable("database offline"));
            }
            self.inner.interactions_since(since).await
        }

        async fn items(&self) -> Result<Vec<ItemRecord>> {
            self.inner.items().await
        }

        async fn user_interactions(&self, user: UserId) -> Result<Vec<InteractionEvent>> {
            self.inner.user_interactions(user).await
        }

        async fn seen_items(&self, user: UserId) -> Result<HashSet<ItemId>> {
            self.inner.seen_items(user).await
        }
    }

    fn controller(store: Arc<FlakyStore>) -> (Arc<ModelRefreshController>, Arc<RecommendationCache>) {
        let config = Arc::new(EngineConfig::default());
        let cache = Arc::new(RecommendationCache::new(
            Arc::new(MemoryCache::new()),
            true,
            config.cache_ttl(),
        ));
        (Arc::new(ModelRefreshController::new(config, store, cache.clone())), cache)
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (controller, _) = controller(Arc::new(FlakyStore::new(Duration::ZERO)));
        assert_eq!(controller.state().await, ModelState::Stale);
        assert!(controller.snapshot().await.is_none());
        assert!(controller.needs_refresh().await);
        assert!(controller.last_build_time().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_publishes() {
        let (controller, _) = controller(Arc::new(FlakyStore::new(Duration::ZERO)));
        let mut states = controller.subscribe_state();

        let outcome = controller.refresh().await.unwrap();
        assert!(!outcome.is_coalesced());
        assert_eq!(controller.state().await, ModelState::Ready);
        assert_eq!(*states.borrow_and_update(), ModelState::Ready);
        assert!(!controller.needs_refresh().await);

        let published = controller.snapshot().await.unwrap();
        assert_eq!(published.id(), outcome.snapshot().id());
        assert_eq!(published.dimensions().users, 2);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_builds_once() {
        let store = Arc::new(FlakyStore::new(Duration::from_millis(100)));
        let (controller, _) = controller(store.clone());

        let (a, b) = tokio::join!(controller.refresh(), controller.refresh());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
        assert_eq!(controller.build_attempts(), 1);
        assert_eq!(a.snapshot().id(), b.snapshot().id());
        assert!(a.is_coalesced() != b.is_coalesced());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let store = Arc::new(FlakyStore::new(Duration::ZERO));
        let (controller, _) = controller(store.clone());

        let first = controller.refresh().await.unwrap();
        store.offline.store(true, Ordering::SeqCst);

        let err = controller.refresh().await.unwrap_err();
        assert!(matches!(err, Error::RefreshFailure(_)));
        assert_eq!(controller.state().await, ModelState::Ready);
        assert_eq!(controller.snapshot().await.unwrap().id(), first.snapshot().id());
        assert_eq!(controller.build_failures(), 1);
    }

    #[tokio::test]
    async fn test_failed_first_build_stays_stale() {
        let store = Arc::new(FlakyStore::new(Duration::ZERO));
        store.offline.store(true, Ordering::SeqCst);
        let (controller, _) = controller(store);

        assert!(controller.refresh().await.is_err());
        assert_eq!(controller.state().await, ModelState::Stale);
        assert!(controller.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_invalidates_cache() {
        let (controller, cache) = controller(Arc::new(FlakyStore::new(Duration::ZERO)));
        let key = CacheKey::new(RecommendationKind::Posts, 1).param("limit", 5);
        cache.put(&key, &[ScoredItem::new(ItemId(10), 1.0)]).await;
        assert!(cache.get::<ItemId>(&key).await.is_some());

        controller.refresh().await.unwrap();
        assert!(cache.get::<ItemId>(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_refresh_still_publishes() {
        let store = Arc::new(FlakyStore::new(Duration::from_millis(100)));
        let (controller, _) = controller(store.clone());

        let cancelled = tokio::time::timeout(Duration::from_millis(10), controller.refresh()).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(controller.state().await, ModelState::Ready);
        assert!(controller.snapshot().await.is_some());
        assert_eq!(controller.generation(), 1);

        // The next refresh runs a fresh build rather than hanging in Building
        let outcome = controller.refresh().await.unwrap();
        assert!(!outcome.is_coalesced());
        assert_eq!(controller.build_attempts(), 2);
        assert_eq!(controller.generation(), 2);
    }

    #[tokio::test]
    async fn test_mark_stale() {
        let (controller, _) = controller(Arc::new(FlakyStore::new(Duration::ZERO)));
        controller.mark_stale().await;
        assert_eq!(controller.state().await, ModelState::Stale);

        controller.refresh().await.unwrap();
        controller.mark_stale().await;
        assert_eq!(controller.state().await, ModelState::Stale);
        // A stale model can still be rebuilt
        controller.refresh().await.unwrap();
        assert_eq!(controller.state().await, ModelState::Ready);
    }
}
