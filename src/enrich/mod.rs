//! Per-item detail enrichment with bounded fan-out.
//!
//! Each search summary gets one detail lookup, plus an item-group lookup when
//! the detail says the listing is a variant. At most `max_in_flight` items are
//! being worked on at once, and results come back in input order. A failed
//! lookup never fails the batch: the item is kept with its summary fields and
//! marked [`EnrichmentStatus::Degraded`]. The exception is a token failure,
//! which aborts the whole batch.

pub mod group;
pub mod merge;

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::error::{ListingsError, Result};
use crate::models::wire::{ApiItem, ItemGroupResponse};
use crate::models::{EnrichedItem, EnrichmentStatus, ItemSummary};
use crate::transport::HttpRequest;

pub use group::aggregate_group;
pub use merge::{from_summary, merge};

/// Why a single lookup failed.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("{0}")]
    Request(#[from] ListingsError),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct DetailEnricher {
    api: Arc<ApiClient>,
    max_in_flight: usize,
}

impl DetailEnricher {
    pub fn new(api: Arc<ApiClient>, max_in_flight: usize) -> Self {
        Self {
            api,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Enrich every summary. The output has the same length and order as `items`.
    ///
    /// Fails only with [`ListingsError::Auth`], when a bearer token cannot be
    /// obtained mid-batch; lookups still in flight are dropped.
    pub async fn enrich(&self, items: &[ItemSummary]) -> Result<Vec<EnrichedItem>> {
        stream::iter(items)
            .map(|summary| self.enrich_one(summary))
            .buffered(self.max_in_flight)
            .try_collect()
            .await
    }

    async fn enrich_one(&self, summary: &ItemSummary) -> Result<EnrichedItem> {
        if summary.item_id.is_empty() {
            return Ok(degraded(summary, "listing has no item id".to_string()));
        }

        let raw = match self.fetch_item(&summary.item_id).await {
            Ok(raw) => raw,
            Err(LookupError::Request(err @ ListingsError::Auth(_))) => return Err(err),
            Err(e) => {
                warn!(item_id = %summary.item_id, error = %e, "detail lookup failed, keeping summary");
                return Ok(degraded(summary, e.to_string()));
            }
        };
        let detail = merge(summary, &raw);

        let group_id = detail.item_group_id.clone();
        if group_id.is_empty() {
            return Ok(EnrichedItem {
                detail,
                status: EnrichmentStatus::Enriched,
            });
        }

        let item = match self.fetch_group(&group_id).await {
            Ok(variants) => match aggregate_group(summary, &group_id, &variants) {
                Some(representative) => {
                    debug!(item_id = %summary.item_id, group_id = %group_id, variants = representative.variant_count, "aggregated item group");
                    let variants = representative.variant_count;
                    EnrichedItem {
                        detail: representative,
                        status: EnrichmentStatus::Grouped { variants },
                    }
                }
                None => EnrichedItem {
                    detail,
                    status: EnrichmentStatus::Enriched,
                },
            },
            Err(LookupError::Request(err @ ListingsError::Auth(_))) => return Err(err),
            Err(e) => {
                warn!(item_id = %summary.item_id, group_id = %group_id, error = %e, "group lookup failed, keeping single item");
                EnrichedItem {
                    detail,
                    status: EnrichmentStatus::Enriched,
                }
            }
        };
        Ok(item)
    }

    async fn fetch_item(&self, item_id: &str) -> std::result::Result<ApiItem, LookupError> {
        let url = format!(
            "{}/{}",
            self.api.endpoints().item,
            urlencoding::encode(item_id)
        );
        let response = self.api.get(HttpRequest::get(url)).await?;
        if !response.is_success() {
            return Err(status_error(response.status, &response.body));
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    async fn fetch_group(&self, group_id: &str) -> std::result::Result<Vec<ApiItem>, LookupError> {
        let request = HttpRequest::get(self.api.endpoints().item_group.clone())
            .query("item_group_id", group_id);
        let response = self.api.get(request).await?;
        if !response.is_success() {
            return Err(status_error(response.status, &response.body));
        }
        let group: ItemGroupResponse = serde_json::from_str(&response.body)?;
        Ok(group.items)
    }
}

fn degraded(summary: &ItemSummary, reason: String) -> EnrichedItem {
    EnrichedItem {
        detail: from_summary(summary),
        status: EnrichmentStatus::Degraded { reason },
    }
}

fn status_error(status: u16, body: &str) -> LookupError {
    let message = serde_json::from_str::<crate::models::wire::ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.summary())
        .unwrap_or_else(|| body.chars().take(200).collect());
    LookupError::Status { status, message }
}
