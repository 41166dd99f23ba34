//! Engine configuration

use crate::{types::InteractionKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tolerance for the hybrid weight sum check
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Base weight per interaction type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionWeights {
    pub view: f64,
    pub like: f64,
    pub comment: f64,
    pub post: f64,
    /// Weight for unrecognised interaction types
    pub unknown: f64,
}

impl InteractionWeights {
    /// Base weight for an interaction type
    pub fn weight(&self, kind: &InteractionKind) -> f64 {
        match kind {
            InteractionKind::View => self.view,
            InteractionKind::Like => self.like,
            InteractionKind::Comment => self.comment,
            InteractionKind::Post => self.post,
            InteractionKind::Other(_) => self.unknown,
        }
    }
}

impl Default for InteractionWeights {
    fn default() -> Self {
        Self {
            view: 1.0,
            like: 3.0,
            comment: 2.0,
            post: 3.0,
            unknown: 1.0,
        }
    }
}

/// Weights of the collaborative and content lists in the hybrid blend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    pub collaborative: f64,
    pub content: f64,
}

impl HybridWeights {
    /// Create validated weights
    pub fn new(collaborative: f64, content: f64) -> Result<Self> {
        let weights = Self { collaborative, content };
        weights.validate()?;
        Ok(weights)
    }

    /// Weights must be non-negative and sum to 1.0
    pub fn validate(&self) -> Result<()> {
        if self.collaborative < 0.0 || self.content < 0.0 {
            return Err(Error::config(format!(
                "hybrid weights must be non-negative (got {} and {})",
                self.collaborative, self.content
            )));
        }
        let sum = self.collaborative + self.content;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::config(format!(
                "hybrid weights must sum to 1.0 (got {})",
                sum
            )));
        }
        Ok(())
    }
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            collaborative: 0.6,
            content: 0.4,
        }
    }
}

/// TF-IDF vectorizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Vocabulary cap, by corpus-wide term frequency
    pub max_features: usize,
    /// Smallest n-gram length
    pub ngram_min: usize,
    /// Largest n-gram length
    pub ngram_max: usize,
    /// Drop English stop-words before forming n-grams
    pub stop_words: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: 1000,
            ngram_min: 1,
            ngram_max: 2,
            stop_words: true,
        }
    }
}

/// Recommendation engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interaction lookback window (days)
    pub lookback_days: i64,
    /// Recency decay constant (days)
    pub decay_half_life_days: f64,
    /// Base weight per interaction type
    pub interaction_weights: InteractionWeights,
    /// Interaction types that count as "liked" for content scoring
    pub content_interactions: Vec<InteractionKind>,
    /// TF-IDF settings
    pub vectorizer: VectorizerConfig,
    /// Neighbours considered by the collaborative scorer
    pub neighbors: usize,
    /// Minimum similarity for neighbours and candidates
    pub similarity_threshold: f64,
    /// Hybrid blend weights
    pub weights: HybridWeights,
    /// Blend content scores in; collaborative only when false
    pub use_hybrid: bool,
    /// Interactions needed before personalised scoring kicks in
    pub min_interactions: usize,
    /// Restrict the popularity fallback to items created in the last N days
    pub popularity_recent_days: Option<i64>,
    /// Seconds between model rebuilds
    pub refresh_interval_secs: u64,
    /// Spawn a background refresh when a request finds the model stale
    pub auto_refresh: bool,
    /// Enable the recommendation cache
    pub cache_enabled: bool,
    /// Cache entry lifetime (seconds)
    pub cache_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            decay_half_life_days: 30.0,
            interaction_weights: InteractionWeights::default(),
            content_interactions: vec![InteractionKind::Like, InteractionKind::Post],
            vectorizer: VectorizerConfig::default(),
            neighbors: 10,
            similarity_threshold: 0.1,
            weights: HybridWeights::default(),
            use_hybrid: true,
            min_interactions: 5,
            popularity_recent_days: None,
            refresh_interval_secs: 3600,
            auto_refresh: true,
            cache_enabled: true,
            cache_ttl_secs: 1800,
        }
    }
}

impl EngineConfig {
    /// Check every setting; called once at engine construction
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::config(format!(
                "similarity_threshold must be within [0, 1] (got {})",
                self.similarity_threshold
            )));
        }
        if self.lookback_days <= 0 {
            return Err(Error::config("lookback_days must be positive"));
        }
        if self.decay_half_life_days <= 0.0 {
            return Err(Error::config("decay_half_life_days must be positive"));
        }
        if self.neighbors == 0 {
            return Err(Error::config("neighbors must be at least 1"));
        }
        let v = &self.vectorizer;
        if v.max_features == 0 {
            return Err(Error::config("vectorizer.max_features must be at least 1"));
        }
        if v.ngram_min == 0 || v.ngram_min > v.ngram_max {
            return Err(Error::config(format!(
                "invalid n-gram range ({}, {})",
                v.ngram_min, v.ngram_max
            )));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
