use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::{EnrichedItem, ItemDetail};

// ---------------------------------------------------------------------------
// CategoryStats — Aggregates over the enriched item set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub total_listings: u64,
    pub total_watchers: u64,
    pub avg_watchers: f64,
}

// ---------------------------------------------------------------------------
// EnrichmentSummary — Per-run enrichment outcome counts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentSummary {
    pub enriched: usize,
    pub grouped: usize,
    pub degraded: usize,
}

impl EnrichmentSummary {
    pub fn from_items(items: &[EnrichedItem]) -> Self {
        use super::item::EnrichmentStatus::*;
        let mut summary = Self::default();
        for item in items {
            match item.status {
                Enriched => summary.enriched += 1,
                Grouped { .. } => summary.grouped += 1,
                Degraded { .. } => summary.degraded += 1,
            }
        }
        summary
    }
}

// ---------------------------------------------------------------------------
// CategoryData — The cached payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryData {
    pub category_id: String,
    pub category_name: Option<String>,
    /// Total matches the upstream reported, which may exceed `items.len()`.
    pub total_available: u64,
    pub fetched_at: DateTime<Utc>,
    pub stats: CategoryStats,
    pub enrichment: EnrichmentSummary,
    pub items: Vec<EnrichedItem>,
}

impl CategoryData {
    pub fn details(&self) -> impl Iterator<Item = &ItemDetail> {
        self.items.iter().map(|i| &i.detail)
    }
}

// ---------------------------------------------------------------------------
// EnrichedResult — What the pipeline hands back
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Cached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMeta {
    pub source_freshness: Freshness,
    /// Snapshot age in whole seconds; present only for cached results.
    pub cache_age_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResult {
    pub data: CategoryData,
    pub meta: ResultMeta,
}

impl EnrichedResult {
    pub fn is_cached(&self) -> bool {
        self.meta.source_freshness == Freshness::Cached
    }
}
