//! Shared test fixtures for the listings SDK integration tests.
//!
//! Provides a [`FakeMarket`] that answers token, search, item and item-group
//! requests from in-memory data, and a [`FakeTransport`] that routes requests
//! to it while recording calls and peak concurrency.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use listings_sdk::{
    Credentials, HttpRequest, HttpResponse, ListingsSdk, ListingsSdkBuilder, ManualClock, Transport,
};
use serde_json::{json, Value};

pub const BASE: &str = "http://fake.test";
pub const CLIENT_ID: &str = "test-app";
pub const CLIENT_SECRET: &str = "test-secret";

// ---------------------------------------------------------------------------
// FakeMarket
// ---------------------------------------------------------------------------

/// In-memory upstream. Unknown item ids answer 404.
pub struct FakeMarket {
    pub summaries: Vec<Value>,
    pub total: Option<u64>,
    pub search_status: u16,
    pub search_body: Option<Value>,
    pub details: HashMap<String, Value>,
    pub failing_details: HashSet<String>,
    pub groups: HashMap<String, Vec<Value>>,
    pub failing_groups: HashSet<String>,
    pub token_status: u16,
    pub token_expires_in: u64,
    /// Refuse further exchanges once this many tokens were issued.
    pub max_tokens: Option<usize>,
    pub tokens_issued: AtomicUsize,
}

impl Default for FakeMarket {
    fn default() -> Self {
        Self {
            summaries: Vec::new(),
            total: None,
            search_status: 200,
            search_body: None,
            details: HashMap::new(),
            failing_details: HashSet::new(),
            groups: HashMap::new(),
            failing_groups: HashSet::new(),
            token_status: 200,
            token_expires_in: 7200,
            max_tokens: None,
            tokens_issued: AtomicUsize::new(0),
        }
    }
}

impl FakeMarket {
    /// A market with one summary and one plain detail per id.
    pub fn with_items(items: &[(&str, &str)]) -> Self {
        let mut market = Self::default();
        for (id, price) in items {
            market.summaries.push(summary(id, price));
            market.details.insert(id.to_string(), detail(id, price, 1, 0));
        }
        market
    }

    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }

    pub fn respond(&self, req: &HttpRequest) -> HttpResponse {
        let url = req.url.as_str();
        if url.ends_with("/identity/v1/oauth2/token") {
            return self.token(req);
        }
        if url.ends_with("/item_summary/search") {
            return self.search();
        }
        if url.ends_with("/item/get_items_by_item_group") {
            let group_id = req.query_value("item_group_id").unwrap_or_default();
            return self.group(group_id);
        }
        if let Some(encoded) = url.split("/buy/browse/v1/item/").nth(1) {
            let id = urlencoding::decode(encoded)
                .map(|s| s.into_owned())
                .unwrap_or_default();
            return self.detail(&id);
        }
        HttpResponse::new(404, "{}")
    }

    fn token(&self, req: &HttpRequest) -> HttpResponse {
        let exhausted = self
            .max_tokens
            .is_some_and(|max| self.tokens_issued() >= max);
        if self.token_status != 200 || exhausted {
            let status = if exhausted { 401 } else { self.token_status };
            return HttpResponse::new(
                status,
                json!({"error": "invalid_client", "error_description": "client authentication failed"})
                    .to_string(),
            );
        }
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(req.header_value("Authorization").is_some());
        HttpResponse::new(
            200,
            json!({
                "access_token": format!("token-{}", n),
                "expires_in": self.token_expires_in,
                "token_type": "Application Access Token"
            })
            .to_string(),
        )
    }

    fn search(&self) -> HttpResponse {
        if let Some(body) = &self.search_body {
            return HttpResponse::new(self.search_status, body.to_string());
        }
        let total = self.total.unwrap_or(self.summaries.len() as u64);
        let mut body = json!({"total": total, "offset": 0, "limit": 50});
        if !self.summaries.is_empty() {
            body["itemSummaries"] = Value::Array(self.summaries.clone());
        }
        HttpResponse::new(self.search_status, body.to_string())
    }

    fn detail(&self, id: &str) -> HttpResponse {
        if self.failing_details.contains(id) {
            return HttpResponse::new(
                500,
                json!({"errors": [{"errorId": 12000, "message": "internal error"}]}).to_string(),
            );
        }
        match self.details.get(id) {
            Some(detail) => HttpResponse::new(200, detail.to_string()),
            None => HttpResponse::new(
                404,
                json!({"errors": [{"errorId": 11001, "message": "item not found"}]}).to_string(),
            ),
        }
    }

    fn group(&self, group_id: &str) -> HttpResponse {
        if self.failing_groups.contains(group_id) {
            return HttpResponse::new(503, "service unavailable");
        }
        match self.groups.get(group_id) {
            Some(items) => HttpResponse::new(200, json!({"items": items}).to_string()),
            None => HttpResponse::new(404, "{}"),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeTransport
// ---------------------------------------------------------------------------

type DelayFn = dyn Fn(&HttpRequest) -> Duration + Send + Sync;

/// Routes every request to a [`FakeMarket`], optionally sleeping first.
pub struct FakeTransport {
    pub market: Arc<FakeMarket>,
    delay: Box<DelayFn>,
    calls: Mutex<Vec<HttpRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new(market: FakeMarket) -> Self {
        Self {
            market: Arc::new(market),
            delay: Box::new(|_: &HttpRequest| Duration::ZERO),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&HttpRequest) -> Duration + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded requests whose URL contains `fragment`.
    pub fn count(&self, fragment: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> listings_sdk::Result<HttpResponse> {
        self.calls.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let wait = (self.delay)(&request);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        Ok(self.market.respond(&request))
    }
}

// ---------------------------------------------------------------------------
// Builders and JSON fixtures
// ---------------------------------------------------------------------------

pub fn credentials() -> Credentials {
    Credentials::new(CLIENT_ID, CLIENT_SECRET)
}

pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    ))
}

/// Builder pointed at the fake upstream with test credentials.
pub fn builder(transport: Arc<FakeTransport>, clock: Arc<ManualClock>) -> ListingsSdkBuilder {
    ListingsSdk::builder()
        .credentials(credentials())
        .api_base(BASE)
        .transport(transport)
        .clock(clock)
}

/// SDK wired to `transport`, `clock` and a cache in `dir`.
pub fn sdk(
    transport: Arc<FakeTransport>,
    clock: Arc<ManualClock>,
    dir: &std::path::Path,
) -> ListingsSdk {
    builder(transport, clock).cache_dir(dir).build().unwrap()
}

pub fn summary(id: &str, price: &str) -> Value {
    json!({
        "itemId": id,
        "title": format!("Summary {}", id),
        "price": {"value": price, "currency": "USD"},
        "itemWebUrl": format!("https://www.example.test/itm/{}", id),
        "condition": "New",
        "image": {"imageUrl": format!("https://img.example.test/{}.jpg", id)},
        "seller": {"username": "summary_seller", "feedbackPercentage": "99.1", "feedbackScore": 42}
    })
}

pub fn detail(id: &str, price: &str, watchers: u64, sold: u64) -> Value {
    json!({
        "itemId": id,
        "title": format!("Detail {}", id),
        "price": {"value": price, "currency": "USD"},
        "watchCount": watchers,
        "estimatedAvailabilities": [{
            "estimatedAvailableQuantity": 5,
            "estimatedSoldQuantity": sold,
            "estimatedAvailabilityStatus": "IN_STOCK"
        }],
        "shippingOptions": [{"shippingCost": {"value": "0.00", "currency": "USD"}, "shippingCostType": "FIXED"}],
        "returnTerms": {"returnsAccepted": true, "returnPeriod": {"value": 30, "unit": "CALENDAR_DAY"}},
        "seller": {"username": "detail_seller", "feedbackPercentage": "100.0", "feedbackScore": 900},
        "itemLocation": {"city": "Austin", "postalCode": "787**", "country": "US"}
    })
}

pub fn grouped_detail(id: &str, price: &str, group_id: &str) -> Value {
    let mut value = detail(id, price, 0, 0);
    value["primaryItemGroup"] = json!({"itemGroupId": group_id, "itemGroupType": "SELLER_DEFINED_VARIATIONS"});
    value
}

pub fn variant(id: &str, price: &str, sold: u64) -> Value {
    json!({
        "itemId": id,
        "title": format!("Variant {}", id),
        "price": {"value": price, "currency": "USD"},
        "estimatedAvailabilities": [{"estimatedAvailableQuantity": 1, "estimatedSoldQuantity": sold}]
    })
}
