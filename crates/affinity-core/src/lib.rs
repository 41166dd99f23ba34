//! Affinity Core - Hybrid Recommendation Engine
//!
//! This crate provides the core functionality for content recommendation:
//! - Interaction aggregation with type weights and recency decay
//! - TF-IDF content vectors over item text
//! - Cosine similarity for users, items and content
//! - Collaborative, content-based and hybrid scoring
//! - Popularity fallback for cold-start users
//! - Snapshot refresh with coalesced builds
//! - Recommendation caching with TTL and invalidation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Affinity Core                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │ Interaction  │  │   Content    │  │  Similarity  │           │
//! │  │  Aggregator  │  │  Vectorizer  │  │    Engine    │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐       ┌──────────────┐       │
//! │                    │   Model     │◄──────│   Refresh    │       │
//! │                    │  Snapshot   │       │  Controller  │       │
//! │                    └──────┬──────┘       └──────────────┘       │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │   Scorers    │──│   Engine    │──│    Cache     │            │
//! │  │ (CF/CB/Pop)  │  │             │  │              │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod aggregator;
pub mod vectorizer;
pub mod similarity;
pub mod snapshot;
pub mod scoring;
pub mod storage;
pub mod cache;
pub mod refresh;
pub mod engine;

pub use error::{Error, Result};
pub use types::*;
pub use config::{EngineConfig, HybridWeights, InteractionWeights, VectorizerConfig};
pub use aggregator::{InteractionAggregator, UserItemMatrix};
pub use vectorizer::{ContentModel, ContentVectorizer, Vocabulary};
pub use similarity::SimilarityMatrix;
pub use snapshot::{ModelSnapshot, SnapshotDimensions};
pub use scoring::{combine, CollaborativeScorer, ContentScorer, PopularityRanker};
pub use storage::{Dataset, InteractionStore, MemoryStore};
pub use cache::{CacheBackend, CacheKey, MemoryCache, RecommendationCache};
pub use refresh::{ModelRefreshController, RefreshOutcome};
pub use engine::{EngineStats, RecommendationEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the engine library
pub fn init() {
    tracing::info!(version = VERSION, "Affinity Core initialized");
}
