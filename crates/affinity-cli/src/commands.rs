//! CLI command implementations

use crate::output::{format_scores, format_stats};
use affinity_core::{EngineConfig, ItemId, MemoryStore, RecommendationEngine, UserId};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Load the engine config, falling back to defaults when no file is given
pub async fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: EngineConfig =
        serde_json::from_str(&json).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Load a dataset and build the first model snapshot
pub async fn load_engine(data: &Path, config: Option<&Path>) -> anyhow::Result<RecommendationEngine> {
    let config = load_config(config).await?;
    let store = MemoryStore::load(data)
        .await
        .with_context(|| format!("loading dataset {}", data.display()))?;

    let engine = RecommendationEngine::with_memory_cache(config, Arc::new(store))?;
    engine.initialize().await.context("building initial model")?;
    Ok(engine)
}

/// Personalised recommendations for a user
pub async fn recommend(
    engine: &RecommendationEngine,
    user: i64,
    limit: usize,
    include_seen: bool,
    format: &str,
) -> anyhow::Result<()> {
    let recs = engine.recommend_for_user(UserId(user), limit, !include_seen).await?;
    println!("{}", format_scores(&format!("Recommendations for user {user}"), &recs, format)?);
    Ok(())
}

/// Items similar to an item
pub async fn similar(engine: &RecommendationEngine, item: i64, limit: usize, format: &str) -> anyhow::Result<()> {
    let similar = engine.recommend_similar(ItemId(item), limit).await?;
    println!("{}", format_scores(&format!("Items similar to {item}"), &similar, format)?);
    Ok(())
}

/// Users with similar taste
pub async fn users(engine: &RecommendationEngine, user: i64, limit: usize, format: &str) -> anyhow::Result<()> {
    let users = engine.recommend_users(UserId(user), limit).await?;
    println!("{}", format_scores(&format!("Users similar to {user}"), &users, format)?);
    Ok(())
}

/// Engine statistics
pub async fn stats(engine: &RecommendationEngine, format: &str) -> anyhow::Result<()> {
    let stats = engine.get_statistics().await;
    println!("{}", format_stats(&stats, format)?);
    Ok(())
}

/// Rebuild the model and report the new snapshot
pub async fn refresh(engine: &RecommendationEngine, format: &str) -> anyhow::Result<()> {
    let outcome = engine.trigger_refresh().await?;
    info!(
        snapshot_id = %outcome.snapshot().id(),
        coalesced = outcome.is_coalesced(),
        "Refresh complete"
    );
    stats(engine, format).await
}
