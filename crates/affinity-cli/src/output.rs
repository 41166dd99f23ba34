//! Output formatting for CLI

use affinity_core::{EngineStats, Scored};
use serde::Serialize;
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

#[derive(Tabled)]
struct ScoreRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Score")]
    score: String,
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Render a ranked list
pub fn format_scores<K: Display + Serialize>(
    title: &str,
    list: &[Scored<K>],
    format: &str,
) -> anyhow::Result<String> {
    let rendered = match OutputFormat::from(format) {
        OutputFormat::Json => serde_json::to_string_pretty(list)?,
        OutputFormat::Table => {
            let rows = list.iter().enumerate().map(|(i, s)| ScoreRow {
                rank: i + 1,
                id: s.id.to_string(),
                score: format!("{:.4}", s.score),
            });
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Text => {
            if list.is_empty() {
                format!("{title}: none")
            } else {
                let mut out = format!("{title}:");
                for (i, s) in list.iter().enumerate() {
                    out.push_str(&format!("\n  {:>2}. {:<8} {:.4}", i + 1, s.id, s.score));
                }
                out
            }
        }
    };
    Ok(rendered)
}

/// Render engine statistics
pub fn format_stats(stats: &EngineStats, format: &str) -> anyhow::Result<String> {
    let rows = stat_rows(stats);
    let rendered = match OutputFormat::from(format) {
        OutputFormat::Json => serde_json::to_string_pretty(stats)?,
        OutputFormat::Table => Table::new(rows).with(Style::rounded()).to_string(),
        OutputFormat::Text => {
            let mut out = String::from("Engine Statistics:");
            for row in rows {
                out.push_str(&format!("\n  {:<22} {}", format!("{}:", row.metric), row.value));
            }
            out
        }
    };
    Ok(rendered)
}

fn stat_rows(stats: &EngineStats) -> Vec<StatRow> {
    let optional = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());

    vec![
        StatRow { metric: "State", value: stats.state.to_string() },
        StatRow {
            metric: "Snapshot",
            value: optional(stats.snapshot_id.map(|id| id.to_string())),
        },
        StatRow {
            metric: "Last build",
            value: optional(stats.last_build_time.map(|t| t.to_rfc3339())),
        },
        StatRow { metric: "Users", value: stats.dimensions.users.to_string() },
        StatRow { metric: "Interacted items", value: stats.dimensions.interacted_items.to_string() },
        StatRow { metric: "Interactions", value: stats.dimensions.interactions.to_string() },
        StatRow { metric: "Content items", value: stats.dimensions.content_items.to_string() },
        StatRow { metric: "Vocabulary", value: stats.dimensions.vocabulary.to_string() },
        StatRow { metric: "Similarity threshold", value: stats.similarity_threshold.to_string() },
        StatRow { metric: "Min interactions", value: stats.min_interactions.to_string() },
        StatRow {
            metric: "Hybrid weights",
            value: if stats.use_hybrid {
                format!("{} / {}", stats.weights.collaborative, stats.weights.content)
            } else {
                "off".to_string()
            },
        },
        StatRow { metric: "Refresh interval", value: format!("{}s", stats.refresh_interval_secs) },
        StatRow { metric: "Builds", value: format!("{} ({} failed)", stats.build_attempts, stats.build_failures) },
        StatRow {
            metric: "Cache",
            value: if stats.cache_enabled {
                format!("{} hits / {} misses", stats.cache.hits, stats.cache.misses)
            } else {
                "disabled".to_string()
            },
        },
    ]
}
