use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ListingsError, Result};

pub const PRODUCTION_API_BASE: &str = "https://api.ebay.com";
pub const SANDBOX_API_BASE: &str = "https://api.sandbox.ebay.com";

pub const TOKEN_PATH: &str = "/identity/v1/oauth2/token";
pub const SEARCH_PATH: &str = "/buy/browse/v1/item_summary/search";
pub const ITEM_PATH: &str = "/buy/browse/v1/item";
pub const ITEM_GROUP_PATH: &str = "/buy/browse/v1/item/get_items_by_item_group";

pub const API_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";
pub const MARKETPLACE_HEADER: &str = "X-EBAY-C-MARKETPLACE-ID";

/// Largest page the search endpoint accepts.
pub const MAX_SEARCH_LIMIT: usize = 200;

/// Upstream error id for "too many requests".
pub const RATE_LIMIT_ERROR_ID: i64 = 2001;

pub const DEFAULT_MARKETPLACE: &str = "EBAY_US";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_TOKEN_MARGIN: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SEARCH_LIMIT: usize = 50;
pub const DEFAULT_RATE_LIMIT_COOL_DOWN: Duration = Duration::from_secs(60);

pub const CLIENT_ID_ENV: &str = "EBAY_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "EBAY_CLIENT_SECRET";

/// Which set of upstream hosts to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Sandbox,
}

/// Resolved endpoint URLs for one environment (or a custom base for tests).
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub token: String,
    pub search: String,
    pub item: String,
    pub item_group: String,
}

impl Endpoints {
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Production => Self::with_base(PRODUCTION_API_BASE),
            Environment::Sandbox => Self::with_base(SANDBOX_API_BASE),
        }
    }

    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            token: format!("{}{}", base, TOKEN_PATH),
            search: format!("{}{}", base, SEARCH_PATH),
            item: format!("{}{}", base, ITEM_PATH),
            item_group: format!("{}{}", base, ITEM_GROUP_PATH),
        }
    }
}

/// Application credentials for the client-credentials grant.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Read credentials from `EBAY_CLIENT_ID` / `EBAY_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self> {
        let id = std::env::var(CLIENT_ID_ENV).map_err(|_| {
            ListingsError::InvalidArgument(format!("missing env: {}", CLIENT_ID_ENV))
        })?;
        let secret = std::env::var(CLIENT_SECRET_ENV).map_err(|_| {
            ListingsError::InvalidArgument(format!("missing env: {}", CLIENT_SECRET_ENV))
        })?;
        Ok(Self::new(id, secret))
    }

    pub(crate) fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

// Never print the secret.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Supported marketplace categories as `(id, description)` pairs.
pub fn categories() -> Vec<(&'static str, &'static str)> {
    vec![
        ("9355", "Cell Phones & Smartphones"),
        ("175672", "PC Laptops & Netbooks"),
        ("171485", "Tablets & eBook Readers"),
        ("31388", "Digital Cameras"),
        ("139971", "Video Game Consoles"),
        ("139973", "Video Games"),
        ("112529", "Headphones"),
        ("178893", "Smart Watches"),
        ("11071", "Televisions"),
        ("27386", "Graphics & Video Cards"),
        ("164", "CPUs/Processors"),
        ("183454", "Trading Card Singles"),
    ]
}

/// Description for a known category id.
pub fn category_name(category_id: &str) -> Option<&'static str> {
    categories()
        .into_iter()
        .find(|(id, _)| *id == category_id)
        .map(|(_, name)| name)
}

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("listings-sdk")
    } else {
        PathBuf::from(".listings-sdk-cache")
    }
}
