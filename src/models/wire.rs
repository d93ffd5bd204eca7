//! Raw upstream JSON shapes.
//!
//! Every field is optional: the upstream omits keys freely, and the merge
//! step in [`crate::enrich`] decides what an absent key turns into.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// OAuth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
    /// OAuth endpoints report failures as `{error, error_description}`.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorDetail {
    pub error_id: Option<i64>,
    pub domain: Option<String>,
    pub category: Option<String>,
    pub message: Option<String>,
    pub long_message: Option<String>,
}

impl ApiErrorBody {
    /// Human readable summary, preferring the upstream's own messages.
    pub fn summary(&self) -> Option<String> {
        let messages: Vec<&str> = self
            .errors
            .iter()
            .filter_map(|e| e.long_message.as_deref().or(e.message.as_deref()))
            .collect();
        if !messages.is_empty() {
            return Some(messages.join("; "));
        }
        match (&self.error, &self.error_description) {
            (Some(code), Some(desc)) => Some(format!("{}: {}", code, desc)),
            (Some(code), None) => Some(code.clone()),
            (None, Some(desc)) => Some(desc.clone()),
            (None, None) => None,
        }
    }

    pub fn has_error_id(&self, id: i64) -> bool {
        self.errors.iter().any(|e| e.error_id == Some(id))
    }
}

// ---------------------------------------------------------------------------
// Search / item / item group
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub total: Option<u64>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub next: Option<String>,
    #[serde(default)]
    pub item_summaries: Vec<ApiItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemGroupResponse {
    #[serde(default)]
    pub items: Vec<ApiItem>,
}

/// One listing as returned by search, item detail or item group lookups.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiItem {
    pub item_id: Option<String>,
    pub title: Option<String>,
    pub price: Option<ApiAmount>,
    pub item_web_url: Option<String>,
    pub condition: Option<String>,
    pub image: Option<ApiImage>,
    pub additional_images: Option<Vec<ApiImage>>,
    pub watch_count: Option<u64>,
    pub estimated_availabilities: Option<Vec<ApiAvailability>>,
    pub shipping_options: Option<Vec<ApiShippingOption>>,
    pub return_terms: Option<ApiReturnTerms>,
    pub seller: Option<ApiSeller>,
    pub item_location: Option<ApiLocation>,
    pub primary_item_group: Option<ApiItemGroupRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAmount {
    pub value: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiImage {
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAvailability {
    pub estimated_available_quantity: Option<u64>,
    pub estimated_sold_quantity: Option<u64>,
    pub estimated_availability_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiShippingOption {
    pub shipping_cost: Option<ApiAmount>,
    pub shipping_cost_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReturnTerms {
    pub returns_accepted: Option<bool>,
    pub return_period: Option<ApiTimeDuration>,
    pub return_shipping_cost_payer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTimeDuration {
    pub value: Option<u64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSeller {
    pub username: Option<String>,
    pub feedback_percentage: Option<String>,
    pub feedback_score: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLocation {
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiItemGroupRef {
    pub item_group_id: Option<String>,
    pub item_group_type: Option<String>,
}
