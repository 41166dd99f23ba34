//! Core types for the recommendation engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Platform user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content item (post) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a published model snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub Uuid);

impl SnapshotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interaction event types
///
/// Unrecognised type strings are kept as [`InteractionKind::Other`] so a new
/// event type in storage never breaks a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InteractionKind {
    View,
    Like,
    Comment,
    Post,
    Other(String),
}

impl InteractionKind {
    pub fn as_str(&self) -> &str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Like => "like",
            InteractionKind::Comment => "comment",
            InteractionKind::Post => "post",
            InteractionKind::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for InteractionKind {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "view" => InteractionKind::View,
            "like" => InteractionKind::Like,
            "comment" => InteractionKind::Comment,
            "post" => InteractionKind::Post,
            _ => InteractionKind::Other(s),
        }
    }
}

impl From<InteractionKind> for String {
    fn from(kind: InteractionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single user interaction with an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub user_id: UserId,
    pub item_id: ItemId,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(user_id: i64, item_id: i64, kind: InteractionKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id: UserId(user_id),
            item_id: ItemId(item_id),
            kind,
            timestamp,
        }
    }
}

/// Item row with text fields and engagement counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
}

impl ItemRecord {
    /// Combined text used for content vectors; missing fields count as empty
    pub fn text(&self) -> String {
        [&self.title, &self.content, &self.tags]
            .iter()
            .map(|field| field.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Engagement score used by the popularity fallback
    pub fn engagement(&self) -> f64 {
        self.like_count as f64 * 3.0 + self.comment_count as f64 * 2.0 + self.view_count as f64 * 0.5
    }
}

/// A ranked candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scored<K> {
    pub id: K,
    pub score: f64,
}

/// A ranked item
pub type ScoredItem = Scored<ItemId>;

/// A ranked user
pub type ScoredUser = Scored<UserId>;

impl<K: Ord> Scored<K> {
    pub fn new(id: K, score: f64) -> Self {
        Self { id, score }
    }

    /// Ranking order: score descending, then id ascending
    pub fn ranking_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sort a score list into ranking order
pub fn rank<K: Ord>(scored: &mut [Scored<K>]) {
    scored.sort_by(|a, b| a.ranking_cmp(b));
}

/// Kinds of recommendation lists, used in cache keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Personalised items for a user
    Posts,
    /// Items similar to an item
    Similar,
    /// Users similar to a user
    Users,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::Posts => "posts",
            RecommendationKind::Similar => "similar",
            RecommendationKind::Users => "users",
        }
    }

    /// Whether the subject of this kind is a user
    pub fn is_user_keyed(&self) -> bool {
        matches!(self, RecommendationKind::Posts | RecommendationKind::Users)
    }
}

impl std::fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    /// No snapshot, or the published one is past its refresh interval
    Stale,
    /// A build is in progress
    Building,
    /// A fresh snapshot is published
    Ready,
}

impl ModelState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: ModelState) -> bool {
        use ModelState::*;
        matches!(
            (self, target),
            (Stale, Building)
                | (Ready, Building)
                | (Ready, Stale)
                // Success, or failure with the previous snapshot kept
                | (Building, Ready)
                // Failure with nothing published
                | (Building, Stale)
        )
    }
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Stale => write!(f, "stale"),
            ModelState::Building => write!(f, "building"),
            ModelState::Ready => write!(f, "ready"),
        }
    }
}
