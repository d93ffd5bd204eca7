//! Marketplace category data SDK for Rust.
//!
//! Given a category id, [`ListingsSdk::get_category_data`] authenticates with
//! the client-credentials grant, searches the category, enriches every
//! listing with its item detail (collapsing variant groups into one
//! representative), computes category stats and caches the whole snapshot
//! with a TTL so repeat calls skip the network.
//!
//! # Quick start
//!
//! ```no_run
//! use listings_sdk::{Credentials, ListingsSdk};
//!
//! # async fn run() -> listings_sdk::Result<()> {
//! let sdk = ListingsSdk::builder()
//!     .credentials(Credentials::from_env()?)
//!     .build()?;
//!
//! let result = sdk.get_category_data("9355").await?;
//! println!("{} listings, avg {:.2}", result.data.items.len(), result.data.stats.avg_price);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod enrich;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod stats;
pub mod token;
pub mod transport;

pub use cache::{CacheStore, FileStorage, MemoryStorage, Storage};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Credentials, Endpoints, Environment};
pub use error::{ListingsError, Result, Stage};
pub use models::{
    CategoryData, CategoryStats, EnrichedItem, EnrichedResult, EnrichmentStatus, Freshness,
    ItemDetail, ItemSummary,
};
pub use pipeline::Pipeline;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use client::ApiClient;
use enrich::DetailEnricher;
use search::SearchClient;
use token::TokenProvider;

// ---------------------------------------------------------------------------
// ListingsSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`ListingsSdk`] instance.
///
/// Use [`ListingsSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](ListingsSdkBuilder::build) to create the SDK.
pub struct ListingsSdkBuilder {
    credentials: Option<Credentials>,
    environment: Environment,
    api_base: Option<String>,
    marketplace_id: String,
    currency: String,
    cache_dir: Option<PathBuf>,
    cache_ttl: Duration,
    token_margin: Duration,
    max_in_flight: usize,
    timeout: Duration,
    search_limit: usize,
    rate_limit_cool_down: Duration,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
    storage: Option<Arc<dyn Storage>>,
}

impl Default for ListingsSdkBuilder {
    fn default() -> Self {
        Self {
            credentials: None,
            environment: Environment::default(),
            api_base: None,
            marketplace_id: config::DEFAULT_MARKETPLACE.to_string(),
            currency: config::DEFAULT_CURRENCY.to_string(),
            cache_dir: None,
            cache_ttl: config::DEFAULT_CACHE_TTL,
            token_margin: config::DEFAULT_TOKEN_MARGIN,
            max_in_flight: config::DEFAULT_MAX_IN_FLIGHT,
            timeout: config::DEFAULT_TIMEOUT,
            search_limit: config::DEFAULT_SEARCH_LIMIT,
            rate_limit_cool_down: config::DEFAULT_RATE_LIMIT_COOL_DOWN,
            transport: None,
            clock: None,
            storage: None,
        }
    }
}

impl ListingsSdkBuilder {
    /// Application credentials for the token exchange. Required.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Production or sandbox hosts. Defaults to production.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Override the API host entirely (e.g. a local mock server).
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Marketplace header value. Defaults to `EBAY_US`.
    pub fn marketplace_id(mut self, id: impl Into<String>) -> Self {
        self.marketplace_id = id.into();
        self
    }

    /// Currency used in the search price filter. Defaults to `USD`.
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set a custom cache directory.
    ///
    /// If not set, the platform-appropriate default cache directory is used
    /// (e.g. `~/.cache/listings-sdk` on Linux). Ignored when a custom
    /// [`storage`](Self::storage) is supplied.
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// How long a snapshot stays servable. Defaults to one hour.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// How long before expiry a token stops being reused. Defaults to five minutes.
    pub fn token_margin(mut self, margin: Duration) -> Self {
        self.token_margin = margin;
        self
    }

    /// Maximum listings enriched concurrently. Defaults to 5.
    pub fn max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n;
        self
    }

    /// Per-call timeout for every upstream request. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Listings requested per search. Clamped to the endpoint maximum of 200.
    pub fn search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Cool-down reported in [`ListingsError::RateLimited`]. Defaults to 60 seconds.
    pub fn rate_limit_cool_down(mut self, cool_down: Duration) -> Self {
        self.rate_limit_cool_down = cool_down;
        self
    }

    /// Replace the HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the snapshot storage backend.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Validate settings and wire up the components.
    ///
    /// No network calls are made; the first token exchange happens lazily
    /// on the first cache miss.
    pub fn build(self) -> Result<ListingsSdk> {
        let credentials = self.credentials.ok_or_else(|| {
            ListingsError::InvalidArgument("credentials are required".into())
        })?;
        if !credentials.is_complete() {
            return Err(ListingsError::InvalidArgument(
                "client id and client secret must be non-empty".into(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(ListingsError::InvalidArgument(
                "max_in_flight must be at least 1".into(),
            ));
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(self.timeout)?),
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let storage: Arc<dyn Storage> = match self.storage {
            Some(s) => s,
            None => Arc::new(FileStorage::new(self.cache_dir)?),
        };
        let endpoints = match &self.api_base {
            Some(base) => Endpoints::with_base(base),
            None => Endpoints::for_environment(self.environment),
        };

        let tokens = Arc::new(TokenProvider::new(
            transport.clone(),
            clock.clone(),
            credentials,
            endpoints.token.clone(),
            self.token_margin,
            self.timeout,
        ));
        let api = Arc::new(ApiClient::new(
            transport,
            tokens.clone(),
            endpoints,
            self.marketplace_id.clone(),
            self.timeout,
        ));
        let search = SearchClient::new(api.clone(), self.currency, self.rate_limit_cool_down);
        let enricher = DetailEnricher::new(api, self.max_in_flight);
        let cache = CacheStore::new(storage, clock.clone(), self.cache_ttl);
        let pipeline = Pipeline::new(search, enricher, cache, clock, self.search_limit);

        Ok(ListingsSdk {
            pipeline,
            tokens,
            marketplace_id: self.marketplace_id,
            max_in_flight: self.max_in_flight,
        })
    }
}

// ---------------------------------------------------------------------------
// ListingsSdk
// ---------------------------------------------------------------------------

/// The main entry point for the SDK.
///
/// Owns the token provider, clients and cache. Safe to share across tasks
/// behind an `Arc`; concurrent runs share one cached token.
pub struct ListingsSdk {
    pipeline: Pipeline,
    tokens: Arc<TokenProvider>,
    marketplace_id: String,
    max_in_flight: usize,
}

impl ListingsSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> ListingsSdkBuilder {
        ListingsSdkBuilder::default()
    }

    /// Fetch (or serve from cache) the enriched listings and stats for a category.
    pub async fn get_category_data(&self, category_id: &str) -> Result<EnrichedResult> {
        self.pipeline.get_category_data(category_id).await
    }

    /// Supported category ids and their descriptions.
    pub fn categories(&self) -> Vec<(&'static str, &'static str)> {
        config::categories()
    }

    /// Drop the cached snapshot for one category.
    pub fn invalidate(&self, category_id: &str) -> Result<()> {
        self.pipeline.cache().delete(&CacheStore::key_for(category_id))
    }

    /// Age of the cached snapshot for a category, if one is live.
    pub fn cache_age(&self, category_id: &str) -> Option<Duration> {
        self.pipeline.cache().age(&CacheStore::key_for(category_id))
    }

    /// Remove every cached snapshot.
    pub fn clear_cache(&self) -> Result<()> {
        self.pipeline.cache().clear()
    }

    /// Forget the cached access token so the next fetch re-authenticates.
    pub async fn reset_token(&self) {
        self.tokens.invalidate().await;
    }

    /// Return a reference to the underlying [`CacheStore`] for advanced usage.
    pub fn cache(&self) -> &CacheStore {
        self.pipeline.cache()
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for ListingsSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ListingsSdk(marketplace={}, cache_ttl={}s, max_in_flight={})",
            self.marketplace_id,
            self.pipeline.cache().ttl().as_secs(),
            self.max_in_flight
        )
    }
}
