//! Detail enrichment tests: partial failure, group aggregation, bounded fan-out.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeMarket, FakeTransport};
use listings_sdk::client::ApiClient;
use listings_sdk::enrich::DetailEnricher;
use listings_sdk::models::{EnrichmentSummary, ItemSummary};
use listings_sdk::token::TokenProvider;
use listings_sdk::{EnrichmentStatus, Endpoints, ListingsError, ManualClock};

fn enricher(transport: Arc<FakeTransport>, max_in_flight: usize, timeout: Duration) -> DetailEnricher {
    enricher_with_clock(transport, common::fixed_clock(), max_in_flight, timeout)
}

fn enricher_with_clock(
    transport: Arc<FakeTransport>,
    clock: Arc<ManualClock>,
    max_in_flight: usize,
    timeout: Duration,
) -> DetailEnricher {
    let endpoints = Endpoints::with_base(common::BASE);
    let tokens = Arc::new(TokenProvider::new(
        transport.clone(),
        clock,
        common::credentials(),
        endpoints.token.clone(),
        Duration::from_secs(300),
        Duration::from_secs(5),
    ));
    let api = Arc::new(ApiClient::new(transport, tokens, endpoints, "EBAY_US", timeout));
    DetailEnricher::new(api, max_in_flight)
}

fn summaries(market: &FakeMarket) -> Vec<ItemSummary> {
    market
        .summaries
        .iter()
        .map(|v| serde_json::from_value::<listings_sdk::models::wire::ApiItem>(v.clone()).unwrap())
        .map(ItemSummary::from)
        .collect()
}

// ---------------------------------------------------------------------------
// partial failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_lookup_keeps_summary_fields() {
    let mut market = FakeMarket::with_items(&[("A", "10.00"), ("B", "11.00"), ("C", "12.00")]);
    market.failing_details.insert("B".to_string());
    let items = summaries(&market);
    let transport = Arc::new(FakeTransport::new(market));

    let enriched = enricher(transport, 4, Duration::from_secs(5)).enrich(&items).await.unwrap();

    assert_eq!(enriched.len(), 3);
    assert_eq!(enriched[0].detail.title, "Detail A");
    assert_eq!(enriched[2].detail.title, "Detail C");

    let b = &enriched[1];
    assert!(b.is_degraded());
    assert_eq!(b.detail.item_id, "B");
    assert_eq!(b.detail.title, "Summary B");
    assert_eq!(b.detail.price, "11.00");
    assert_eq!(b.detail.seller.username, "summary_seller");
    assert_eq!(b.detail.watch_count, 0);
    assert_eq!(b.detail.location.city, "");
    match &b.status {
        EnrichmentStatus::Degraded { reason } => assert!(reason.contains("500"), "{}", reason),
        other => panic!("expected Degraded, got {:?}", other),
    }

    let counts = EnrichmentSummary::from_items(&enriched);
    assert_eq!(counts.enriched, 2);
    assert_eq!(counts.degraded, 1);
}

#[tokio::test]
async fn missing_item_is_degraded_not_dropped() {
    let mut market = FakeMarket::with_items(&[("A", "10.00")]);
    market.summaries.push(common::summary("GONE", "3.00"));
    let items = summaries(&market);
    let transport = Arc::new(FakeTransport::new(market));

    let enriched = enricher(transport, 2, Duration::from_secs(5)).enrich(&items).await.unwrap();
    assert_eq!(enriched.len(), 2);
    assert!(enriched[1].is_degraded());
    assert_eq!(enriched[1].detail.item_id, "GONE");
}

#[tokio::test]
async fn summary_without_id_is_degraded_without_a_call() {
    let items = vec![ItemSummary {
        title: "No id".into(),
        price: "4.00".into(),
        ..Default::default()
    }];
    let transport = Arc::new(FakeTransport::new(FakeMarket::default()));
    let enriched = enricher(transport.clone(), 2, Duration::from_secs(5))
        .enrich(&items)
        .await
        .unwrap();

    assert!(enriched[0].is_degraded());
    assert_eq!(enriched[0].detail.title, "No id");
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn slow_lookup_times_out_into_degraded_item() {
    let market = FakeMarket::with_items(&[("FAST", "1.00"), ("SLOW", "2.00")]);
    let items = summaries(&market);
    let transport = Arc::new(FakeTransport::new(market).with_delay(|req| {
        if req.url.ends_with("/SLOW") {
            Duration::from_millis(300)
        } else {
            Duration::ZERO
        }
    }));

    let enriched = enricher(transport, 2, Duration::from_millis(50))
        .enrich(&items)
        .await
        .unwrap();
    assert_eq!(enriched[0].status, EnrichmentStatus::Enriched);
    match &enriched[1].status {
        EnrichmentStatus::Degraded { reason } => assert!(reason.contains("timed out"), "{}", reason),
        other => panic!("expected Degraded, got {:?}", other),
    }
}

#[tokio::test]
async fn item_ids_are_url_encoded() {
    let market = FakeMarket::with_items(&[("v1|1234|0", "5.00")]);
    let items = summaries(&market);
    let transport = Arc::new(FakeTransport::new(market));

    let enriched = enricher(transport.clone(), 1, Duration::from_secs(5))
        .enrich(&items)
        .await
        .unwrap();
    assert_eq!(enriched[0].status, EnrichmentStatus::Enriched);
    assert_eq!(transport.count("/buy/browse/v1/item/v1%7C1234%7C0"), 1);
}

#[tokio::test]
async fn token_failure_mid_batch_aborts_enrichment() {
    let mut market = FakeMarket::with_items(&[("A", "1.00"), ("B", "2.00"), ("C", "3.00")]);
    market.max_tokens = Some(1);
    let items = summaries(&market);
    let clock = common::fixed_clock();
    let ticking = clock.clone();
    // The first lookup pushes the clock into the token's safety margin.
    let transport = Arc::new(FakeTransport::new(market).with_delay(move |req| {
        if req.url.contains("/buy/browse/v1/item/") {
            ticking.advance(Duration::from_secs(7000));
        }
        Duration::ZERO
    }));

    let err = enricher_with_clock(transport.clone(), clock, 1, Duration::from_secs(5))
        .enrich(&items)
        .await
        .unwrap_err();
    assert!(matches!(err, ListingsError::Auth(_)), "{:?}", err);
    assert_eq!(transport.market.tokens_issued(), 1);
}

// ---------------------------------------------------------------------------
// item groups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn variant_group_is_aggregated() {
    let mut market = FakeMarket::default();
    market.summaries.push(common::summary("P", "9.00"));
    market
        .details
        .insert("P".into(), common::grouped_detail("P", "9.00", "G1"));
    market.groups.insert(
        "G1".into(),
        vec![
            common::variant("V1", "10.00", 2),
            common::variant("V2", "7.50", 1),
            common::variant("V3", "9.00", 3),
        ],
    );
    let items = summaries(&market);
    let transport = Arc::new(FakeTransport::new(market));

    let enriched = enricher(transport.clone(), 2, Duration::from_secs(5))
        .enrich(&items)
        .await
        .unwrap();
    let rep = &enriched[0];
    assert_eq!(rep.status, EnrichmentStatus::Grouped { variants: 3 });
    assert_eq!(rep.detail.item_id, "V2");
    assert_eq!(rep.detail.price, "7.50");
    assert_eq!(rep.detail.sold_quantity, 6);
    assert_eq!(rep.detail.available_quantity, 3);
    assert_eq!(rep.detail.item_group_id, "G1");
    assert_eq!(rep.detail.title, "Variant V2");
    // Not in the variant payload: falls back to the search summary.
    assert_eq!(rep.detail.seller.username, "summary_seller");
    assert_eq!(transport.count("get_items_by_item_group"), 1);
}

#[tokio::test]
async fn failed_group_lookup_keeps_single_item_detail() {
    let mut market = FakeMarket::default();
    market.summaries.push(common::summary("P", "9.00"));
    market
        .details
        .insert("P".into(), common::grouped_detail("P", "9.00", "G2"));
    market.failing_groups.insert("G2".into());
    let items = summaries(&market);
    let transport = Arc::new(FakeTransport::new(market));

    let enriched = enricher(transport, 2, Duration::from_secs(5))
        .enrich(&items)
        .await
        .unwrap();
    assert_eq!(enriched[0].status, EnrichmentStatus::Enriched);
    assert_eq!(enriched[0].detail.item_id, "P");
    assert_eq!(enriched[0].detail.title, "Detail P");
    assert_eq!(enriched[0].detail.item_group_id, "G2");
    assert_eq!(enriched[0].detail.variant_count, 1);
}

// ---------------------------------------------------------------------------
// concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn in_flight_lookups_never_exceed_cap() {
    let ids: Vec<String> = (0..12).map(|i| format!("ITEM{}", i)).collect();
    let pairs: Vec<(&str, &str)> = ids.iter().map(|id| (id.as_str(), "1.00")).collect();
    let market = FakeMarket::with_items(&pairs);
    let items = summaries(&market);
    let transport = Arc::new(
        FakeTransport::new(market).with_delay(|_| Duration::from_millis(15)),
    );

    let enriched = enricher(transport.clone(), 3, Duration::from_secs(5))
        .enrich(&items)
        .await
        .unwrap();

    assert_eq!(enriched.len(), 12);
    assert!(transport.peak_in_flight() <= 3, "peak {}", transport.peak_in_flight());
    assert!(transport.peak_in_flight() > 1, "lookups should overlap");
}

#[tokio::test]
async fn group_lookups_share_the_item_slot() {
    let mut market = FakeMarket::default();
    for i in 0..8 {
        let id = format!("P{}", i);
        let group = format!("G{}", i);
        market.summaries.push(common::summary(&id, "9.00"));
        market
            .details
            .insert(id.clone(), common::grouped_detail(&id, "9.00", &group));
        market.groups.insert(
            group,
            vec![
                common::variant(&format!("{}a", id), "8.00", 1),
                common::variant(&format!("{}b", id), "7.00", 1),
            ],
        );
    }
    let items = summaries(&market);
    let transport = Arc::new(
        FakeTransport::new(market).with_delay(|_| Duration::from_millis(15)),
    );

    let enriched = enricher(transport.clone(), 2, Duration::from_secs(5))
        .enrich(&items)
        .await
        .unwrap();

    assert_eq!(enriched.len(), 8);
    assert!(enriched
        .iter()
        .all(|e| e.status == EnrichmentStatus::Grouped { variants: 2 }));
    assert_eq!(transport.count("get_items_by_item_group"), 8);
    assert!(transport.peak_in_flight() <= 2, "peak {}", transport.peak_in_flight());
}

#[tokio::test]
async fn output_order_matches_input_despite_completion_order() {
    let market = FakeMarket::with_items(&[("A", "1.00"), ("B", "2.00"), ("C", "3.00"), ("D", "4.00")]);
    let items = summaries(&market);
    // Earlier items take longer, so they finish last.
    let transport = Arc::new(FakeTransport::new(market).with_delay(|req| {
        let ms = if req.url.ends_with("/A") {
            60
        } else if req.url.ends_with("/B") {
            40
        } else if req.url.ends_with("/C") {
            20
        } else {
            0
        };
        Duration::from_millis(ms)
    }));

    let enriched = enricher(transport, 4, Duration::from_secs(5))
        .enrich(&items)
        .await
        .unwrap();
    let ids: Vec<&str> = enriched.iter().map(|e| e.detail.item_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C", "D"]);
}
