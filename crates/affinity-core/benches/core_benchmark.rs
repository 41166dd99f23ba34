//! Benchmark tests for affinity-core operations
//!
//! Run with: cargo bench -p affinity-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chrono::{Duration, Utc};
use std::sync::Arc;

use affinity_core::cache::{CacheKey, MemoryCache, RecommendationCache};
use affinity_core::scoring::{combine, CollaborativeScorer, ContentScorer};
use affinity_core::storage::{Dataset, MemoryStore};
use affinity_core::types::*;
use affinity_core::{EngineConfig, ModelSnapshot, RecommendationEngine};

// ============================================================================
// Helpers
// ============================================================================

const WORDS: &[&str] = &[
    "rust", "async", "runtime", "garden", "bread", "travel", "camera", "music", "guitar",
    "python", "database", "index", "coffee", "mountain", "bike", "recipe", "novel", "film",
];

fn create_items(count: i64) -> Vec<ItemRecord> {
    (0..count)
        .map(|id| {
            let title: Vec<&str> = (0..4).map(|k| WORDS[((id * 7 + k * 5) as usize) % WORDS.len()]).collect();
            ItemRecord {
                id: ItemId(id),
                title: Some(title.join(" ")),
                content: Some(format!("{} {}", WORDS[(id as usize) % WORDS.len()], title[0])),
                tags: None,
                category_id: Some(id % 6),
                like_count: (id % 13) as u64,
                comment_count: (id % 5) as u64,
                view_count: (id % 40) as u64,
                created_at: Utc::now() - Duration::days(id % 30),
            }
        })
        .collect()
}

fn create_events(users: i64, items: i64, per_user: i64) -> Vec<InteractionEvent> {
    let now = Utc::now();
    let kinds = [InteractionKind::View, InteractionKind::Like, InteractionKind::Comment];
    let mut events = Vec::new();
    for user in 0..users {
        for k in 0..per_user {
            let item = (user * 31 + k * 17) % items;
            let kind = kinds[((user + k) % 3) as usize].clone();
            events.push(InteractionEvent::new(user, item, kind, now - Duration::days(k % 60)));
        }
    }
    events
}

fn create_snapshot(users: i64, items: i64) -> ModelSnapshot {
    ModelSnapshot::build(
        &create_events(users, items, 20),
        create_items(items),
        &EngineConfig::default(),
        Utc::now(),
    )
}

// ============================================================================
// Snapshot Benchmarks
// ============================================================================

fn bench_snapshot_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("Snapshot Build");
    group.sample_size(20);

    for (users, items) in [(50i64, 100i64), (200, 400), (500, 1000)] {
        let events = create_events(users, items, 20);
        let catalog = create_items(items);
        let config = EngineConfig::default();

        group.bench_with_input(
            BenchmarkId::new("users_items", format!("{users}x{items}")),
            &(events, catalog),
            |b, (events, catalog)| {
                b.iter(|| {
                    let snapshot = ModelSnapshot::build(events, catalog.clone(), &config, Utc::now());
                    black_box(snapshot.dimensions())
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Scoring Benchmarks
// ============================================================================

fn bench_scoring(c: &mut Criterion) {
    let snapshot = create_snapshot(300, 600);
    let config = EngineConfig::default();
    let collaborative = CollaborativeScorer::new(&config);
    let content = ContentScorer::new(&config);

    let mut group = c.benchmark_group("Scoring");

    group.bench_function("collaborative", |b| {
        b.iter(|| black_box(collaborative.recommend(black_box(UserId(42)), &snapshot, 20)))
    });

    group.bench_function("content", |b| {
        b.iter(|| black_box(content.recommend(black_box(UserId(42)), &snapshot, 20)))
    });

    group.bench_function("similar_items", |b| {
        b.iter(|| black_box(content.similar_items(black_box(ItemId(7)), &snapshot, 10)))
    });

    let a = collaborative.recommend(UserId(42), &snapshot, 40);
    let b_list = content.recommend(UserId(42), &snapshot, 40);
    group.bench_function("combine", |b| {
        b.iter(|| black_box(combine(&a, &b_list, 0.6, 0.4)))
    });

    group.finish();
}

// ============================================================================
// Cache Benchmarks
// ============================================================================

fn bench_cache(c: &mut Criterion) {
    let cache = RecommendationCache::new(
        Arc::new(MemoryCache::new()),
        true,
        std::time::Duration::from_secs(600),
    );
    let list: Vec<ScoredItem> = (0..20).map(|i| ScoredItem::new(ItemId(i), 1.0 / (i + 1) as f64)).collect();
    let key = CacheKey::new(RecommendationKind::Posts, 1).param("limit", 20);
    tokio_test::block_on(cache.put(&key, &list));

    let mut group = c.benchmark_group("Cache");

    group.bench_function("get_hit", |b| {
        b.iter(|| black_box(tokio_test::block_on(cache.get::<ItemId>(&key))))
    });

    group.bench_function("put", |b| {
        b.iter(|| tokio_test::block_on(cache.put(&key, black_box(&list))))
    });

    group.finish();
}

// ============================================================================
// Engine Benchmarks
// ============================================================================

fn bench_engine(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let store = Arc::new(MemoryStore::from_dataset(Dataset {
        items: create_items(400),
        interactions: create_events(200, 400, 20),
    }));
    let config = EngineConfig {
        auto_refresh: false,
        cache_enabled: false,
        ..EngineConfig::default()
    };
    let engine = RecommendationEngine::with_memory_cache(config, store).unwrap();
    rt.block_on(engine.initialize()).unwrap();

    let mut group = c.benchmark_group("Engine");
    group.sample_size(20);

    group.bench_function("recommend_for_user_hybrid", |b| {
        b.iter(|| rt.block_on(engine.recommend_for_user(UserId(17), 10, true)).unwrap())
    });

    group.bench_function("recommend_for_user_cold", |b| {
        b.iter(|| rt.block_on(engine.recommend_for_user(UserId(10_000), 10, true)).unwrap())
    });

    group.bench_function("refresh", |b| {
        b.iter(|| rt.block_on(engine.trigger_refresh()).unwrap())
    });

    group.finish();
}

criterion_group!(
    snapshot_benches,
    bench_snapshot_build,
);

criterion_group!(
    scoring_benches,
    bench_scoring,
);

criterion_group!(
    cache_benches,
    bench_cache,
);

criterion_group!(
    engine_benches,
    bench_engine,
);

criterion_main!(
    snapshot_benches,
    scoring_benches,
    cache_benches,
    engine_benches,
);
