//! Category search against the item summary endpoint.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::client::ApiClient;
use crate::config::{MAX_SEARCH_LIMIT, RATE_LIMIT_ERROR_ID};
use crate::error::{ListingsError, Result};
use crate::models::wire::{ApiErrorBody, SearchResponse};
use crate::models::ItemSummary;
use crate::transport::{HttpRequest, HttpResponse};

/// One page of search results plus the upstream's pagination metadata.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub items: Vec<ItemSummary>,
    /// Total matches across all pages.
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    /// URL of the following page, when there is one.
    pub next: Option<String>,
}

pub struct SearchClient {
    api: Arc<ApiClient>,
    currency: String,
    cool_down: Duration,
}

impl SearchClient {
    pub fn new(api: Arc<ApiClient>, currency: impl Into<String>, cool_down: Duration) -> Self {
        Self {
            api,
            currency: currency.into(),
            cool_down,
        }
    }

    /// Fetch the first page of fixed-price, positively priced listings in a category.
    pub async fn search(&self, category_id: &str, limit: usize) -> Result<SearchResults> {
        self.search_page(category_id, limit, 0).await
    }

    /// Fetch a single page starting at `offset`. `limit` is clamped to `1..=200`.
    pub async fn search_page(
        &self,
        category_id: &str,
        limit: usize,
        offset: u64,
    ) -> Result<SearchResults> {
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        let request = HttpRequest::get(self.api.endpoints().search.clone())
            .query("category_ids", category_id)
            .query("limit", limit.to_string())
            .query("offset", offset.to_string())
            .query("filter", self.filter());

        let response = self.api.get(request).await?;
        if !response.is_success() {
            return Err(self.classify_failure(category_id, &response));
        }

        let page: SearchResponse = serde_json::from_str(&response.body)?;
        if page.item_summaries.is_empty() {
            info!(category_id, "search returned no listings");
            return Err(ListingsError::NoResults {
                category_id: category_id.to_string(),
            });
        }

        let items: Vec<ItemSummary> = page.item_summaries.into_iter().map(ItemSummary::from).collect();
        let total = page.total.unwrap_or(items.len() as u64);
        info!(category_id, returned = items.len(), total, "search complete");
        Ok(SearchResults {
            items,
            total,
            offset: page.offset.unwrap_or(offset),
            limit: page.limit.unwrap_or(limit as u64),
            next: page.next,
        })
    }

    fn filter(&self) -> String {
        format!(
            "price:[0.01..],priceCurrency:{},buyingOptions:{{FIXED_PRICE}}",
            self.currency
        )
    }

    fn classify_failure(&self, category_id: &str, response: &HttpResponse) -> ListingsError {
        let body = serde_json::from_str::<ApiErrorBody>(&response.body).ok();
        let rate_limited = response.status == 429
            || body
                .as_ref()
                .is_some_and(|b| b.has_error_id(RATE_LIMIT_ERROR_ID));
        if rate_limited {
            warn!(category_id, status = response.status, "search rate limited");
            return ListingsError::RateLimited {
                category_id: category_id.to_string(),
                cool_down: self.cool_down,
            };
        }

        let message = body
            .and_then(|b| b.summary())
            .unwrap_or_else(|| response.body.clone());
        warn!(category_id, status = response.status, %message, "search failed");
        ListingsError::Upstream {
            category_id: category_id.to_string(),
            status: response.status,
            message,
        }
    }
}
