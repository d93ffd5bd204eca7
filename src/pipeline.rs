//! The `get_category_data` state machine.
//!
//! `CacheCheck -> Fetch -> Enrich -> Aggregate -> Persist -> Done`, with
//! `Failed` reachable from `Fetch` (which includes authentication) and from
//! `Enrich` when a token refresh fails mid-batch. Nothing is retried here; a
//! failed run returns one descriptive error. Cache reads and writes run on
//! the blocking thread pool.

use std::sync::Arc;

use tokio::task;
use tracing::{info, instrument, warn};

use crate::cache::{CacheStore, CachedSnapshot};
use crate::clock::Clock;
use crate::config;
use crate::enrich::DetailEnricher;
use crate::error::{ListingsError, Result, Stage};
use crate::models::{CategoryData, EnrichedResult, EnrichmentSummary, Freshness, ResultMeta};
use crate::search::SearchClient;
use crate::stats;

pub struct Pipeline {
    search: SearchClient,
    enricher: DetailEnricher,
    cache: CacheStore,
    clock: Arc<dyn Clock>,
    search_limit: usize,
}

impl Pipeline {
    pub fn new(
        search: SearchClient,
        enricher: DetailEnricher,
        cache: CacheStore,
        clock: Arc<dyn Clock>,
        search_limit: usize,
    ) -> Self {
        Self {
            search,
            enricher,
            cache,
            clock,
            search_limit,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Serve `category_id` from cache when possible, otherwise fetch, enrich,
    /// aggregate and persist it.
    ///
    /// If the returned future is dropped before enrichment finishes, in-flight
    /// lookups are cancelled and nothing is written to the cache. A token
    /// failure during enrichment fails the run and also skips the write.
    #[instrument(skip(self))]
    pub async fn get_category_data(&self, category_id: &str) -> Result<EnrichedResult> {
        let key = CacheStore::key_for(category_id);

        if let Some(snapshot) = self.cached(&key).await {
            info!(age_secs = snapshot.age.as_secs(), "serving cached snapshot");
            return Ok(EnrichedResult {
                data: snapshot.payload,
                meta: ResultMeta {
                    source_freshness: Freshness::Cached,
                    cache_age_secs: Some(snapshot.age.as_secs()),
                },
            });
        }

        let results = self
            .search
            .search(category_id, self.search_limit)
            .await
            .map_err(|e| fail(category_id, e))?;

        let items = self
            .enricher
            .enrich(&results.items)
            .await
            .map_err(|e| fail(category_id, e))?;
        let enrichment = EnrichmentSummary::from_items(&items);
        if enrichment.degraded > 0 {
            warn!(
                degraded = enrichment.degraded,
                total = items.len(),
                "some listings could not be enriched"
            );
        }

        let stats = stats::compute(items.iter().map(|i| &i.detail));
        let data = CategoryData {
            category_id: category_id.to_string(),
            category_name: config::category_name(category_id).map(str::to_string),
            total_available: results.total,
            fetched_at: self.clock.now(),
            stats,
            enrichment,
            items,
        };

        self.persist(key, data.clone()).await;

        info!(
            listings = data.items.len(),
            grouped = enrichment.grouped,
            "category data fetched"
        );
        Ok(EnrichedResult {
            data,
            meta: ResultMeta {
                source_freshness: Freshness::Fresh,
                cache_age_secs: None,
            },
        })
    }
}

impl Pipeline {
    async fn cached(&self, key: &str) -> Option<CachedSnapshot> {
        let cache = self.cache.clone();
        let key = key.to_string();
        match task::spawn_blocking(move || cache.get(&key)).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "cache read task failed, treating as miss");
                None
            }
        }
    }

    /// Write a snapshot. Failures are logged, never returned.
    async fn persist(&self, key: String, data: CategoryData) {
        let cache = self.cache.clone();
        match task::spawn_blocking(move || cache.set(&key, &data)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "failed to persist snapshot; returning fresh result anyway")
            }
            Err(e) => warn!(error = %e, "cache write task failed"),
        }
    }
}

/// Attach category and stage context to a fatal error.
fn fail(category_id: &str, error: ListingsError) -> ListingsError {
    let stage = match &error {
        ListingsError::Auth(_) => Stage::Authenticate,
        _ => Stage::Search,
    };
    warn!(category_id, %stage, error = %error, "pipeline run failed");
    ListingsError::Failed {
        category_id: category_id.to_string(),
        stage,
        source: Box::new(error),
    }
}
