//! Storage collaborator
//!
//! The engine reads interaction and item rows through [`InteractionStore`].
//! [`MemoryStore`] keeps a dataset in process; it backs the CLI and tests.

use crate::{types::*, Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Query interface over users, items and interactions
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Interaction events at or after `since`
    async fn interactions_since(&self, since: DateTime<Utc>) -> Result<Vec<InteractionEvent>>;

    /// Every item with its text and engagement counters
    async fn items(&self) -> Result<Vec<ItemRecord>>;

    /// All interactions of one user, any age
    async fn user_interactions(&self, user: UserId) -> Result<Vec<InteractionEvent>>;

    /// Ids of items the user has interacted with
    async fn seen_items(&self, user: UserId) -> Result<HashSet<ItemId>> {
        Ok(self
            .user_interactions(user)
            .await?
            .into_iter()
            .map(|e| e.item_id)
            .collect())
    }
}

/// Serialised form of a store's contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    #[serde(default)]
    pub interactions: Vec<InteractionEvent>,
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Dataset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
        }
    }

    /// Parse a JSON dataset (`{"items": [...], "interactions": [...]}`)
    pub fn from_json(json: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(json)?;
        Ok(Self::from_dataset(dataset))
    }

    /// Load a JSON dataset from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::unavailable(format!("{}: {e}", path.display())))?;
        let store = Self::from_json(&json)?;

        {
            let data = store.data.read().await;
            info!(
                path = %path.display(),
                items = data.items.len(),
                interactions = data.interactions.len(),
                "Dataset loaded"
            );
        }

        Ok(store)
    }

    /// Append an interaction event
    pub async fn record_interaction(&self, event: InteractionEvent) {
        debug!(user = %event.user_id, item = %event.item_id, kind = %event.kind, "Interaction recorded");
        self.data.write().await.interactions.push(event);
    }

    /// Insert an item, replacing any item with the same id
    pub async fn upsert_item(&self, item: ItemRecord) {
        let mut data = self.data.write().await;
        match data.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => data.items.push(item),
        }
    }

    /// Copy of the current contents
    pub async fn dataset(&self) -> Dataset {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl InteractionStore for MemoryStore {
    async fn interactions_since(&self, since: DateTime<Utc>) -> Result<Vec<InteractionEvent>> {
        let data = self.data.read().await;
        Ok(data
            .interactions
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect())
    }

    async fn items(&self) -> Result<Vec<ItemRecord>> {
        Ok(self.data.read().await.items.clone())
    }

    async fn user_interactions(&self, user: UserId) -> Result<Vec<InteractionEvent>> {
        let data = self.data.read().await;
        Ok(data
            .interactions
            .iter()
            .filter(|e| e.user_id == user)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const DATASET: &str = r#"{
        "items": [
            {"id": 1, "title": "Rust async", "like_count": 4, "created_at": "2024-05-01T00:00:00Z"},
            {"id": 2, "title": "Bread", "created_at": "2024-05-02T00:00:00Z"}
        ],
        "interactions": [
            {"user_id": 7, "item_id": 1, "type": "like", "timestamp": "2024-05-03T00:00:00Z"},
            {"user_id": 7, "item_id": 2, "type": "share", "timestamp": "2024-05-04T00:00:00Z"},
            {"user_id": 8, "item_id": 2, "type": "view", "timestamp": "2024-05-05T00:00:00Z"}
        ]
    }"#;

    #[tokio::test]
    async fn test_from_json() {
        let store = MemoryStore::from_json(DATASET).unwrap();
        let items = store.items().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].like_count, 4);
        assert_eq!(items[1].view_count, 0);

        let events = store.user_interactions(UserId(7)).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, InteractionKind::Other("share".to_string()));
    }

    #[tokio::test]
    async fn test_interactions_since() {
        let store = MemoryStore::from_json(DATASET).unwrap();
        let since = "2024-05-04T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let events = store.interactions_since(since).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.timestamp >= since));
    }

    #[tokio::test]
    async fn test_seen_items() {
        let store = MemoryStore::from_json(DATASET).unwrap();
        let seen = store.seen_items(UserId(7)).await.unwrap();
        assert_eq!(seen, HashSet::from([ItemId(1), ItemId(2)]));
        assert!(store.seen_items(UserId(99)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutation() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .record_interaction(InteractionEvent::new(1, 5, InteractionKind::View, now))
            .await;
        let item = ItemRecord {
            id: ItemId(5),
            title: Some("first".into()),
            content: None,
            tags: None,
            category_id: None,
            like_count: 0,
            comment_count: 0,
            view_count: 0,
            created_at: now - Duration::days(1),
        };
        store.upsert_item(item.clone()).await;
        store
            .upsert_item(ItemRecord {
                title: Some("second".into()),
                ..item
            })
            .await;

        let dataset = store.dataset().await;
        assert_eq!(dataset.interactions.len(), 1);
        assert_eq!(dataset.items.len(), 1);
        assert_eq!(dataset.items[0].title.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let err = MemoryStore::from_json("{not json").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION");
    }
}
