use serde::{Deserialize, Serialize};

use super::wire::ApiItem;

// ---------------------------------------------------------------------------
// ItemSummary — Minimal listing identity returned by search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub item_id: String,
    pub title: String,
    pub price: String,
    pub currency: String,
    pub item_web_url: String,
    pub condition: Option<String>,
    pub image_url: Option<String>,
    pub seller: Option<SellerInfo>,
    pub location: Option<ItemLocation>,
}

impl From<ApiItem> for ItemSummary {
    fn from(raw: ApiItem) -> Self {
        let (price, currency) = match raw.price {
            Some(amount) => (
                amount.value.unwrap_or_default(),
                amount.currency.unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };
        Self {
            item_id: raw.item_id.unwrap_or_default(),
            title: raw.title.unwrap_or_default(),
            price,
            currency,
            item_web_url: raw.item_web_url.unwrap_or_default(),
            condition: raw.condition,
            image_url: raw.image.and_then(|i| i.image_url),
            seller: raw.seller.map(|s| SellerInfo {
                username: s.username.unwrap_or_default(),
                feedback_percentage: s.feedback_percentage.unwrap_or_default(),
                feedback_score: s.feedback_score.unwrap_or(0),
            }),
            location: raw.item_location.map(|l| ItemLocation {
                city: l.city.unwrap_or_default(),
                postal_code: l.postal_code.unwrap_or_default(),
                country: l.country.unwrap_or_default(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ItemDetail — Fully enriched listing
// ---------------------------------------------------------------------------

/// A listing with every field resolved. Missing upstream values are empty
/// strings or zero, never absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    pub item_id: String,
    pub title: String,
    /// Decimal price exactly as the upstream reported it.
    pub price: String,
    pub currency: String,
    pub item_web_url: String,
    pub condition: String,
    pub image_url: String,
    pub additional_images: Vec<String>,
    pub watch_count: u64,
    pub sold_quantity: u64,
    pub available_quantity: u64,
    pub availability_status: String,
    pub shipping: ShippingTerms,
    pub return_policy: ReturnPolicy,
    pub seller: SellerInfo,
    pub location: ItemLocation,
    /// Empty unless the listing is one variant of a group.
    pub item_group_id: String,
    pub variant_count: u32,
}

impl ItemDetail {
    /// Numeric price, if the raw string parses to a finite number.
    pub fn price_value(&self) -> Option<f64> {
        parse_price(&self.price)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingTerms {
    pub cost: String,
    pub currency: String,
    pub cost_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPolicy {
    pub returns_accepted: bool,
    pub period_value: u64,
    pub period_unit: String,
    pub shipping_cost_payer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerInfo {
    pub username: String,
    pub feedback_percentage: String,
    pub feedback_score: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLocation {
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

// ---------------------------------------------------------------------------
// EnrichedItem — Detail plus how it was obtained
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EnrichmentStatus {
    /// Detail lookup succeeded for a single listing.
    Enriched,
    /// Detail lookup succeeded and the variant group was aggregated.
    Grouped { variants: u32 },
    /// Detail lookup failed; only summary fields are present.
    Degraded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedItem {
    pub detail: ItemDetail,
    pub status: EnrichmentStatus,
}

impl EnrichedItem {
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, EnrichmentStatus::Degraded { .. })
    }
}

/// Parse an upstream decimal string. Rejects empty, non-numeric and non-finite values.
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
