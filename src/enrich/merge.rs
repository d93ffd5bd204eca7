//! Field-by-field merge of an item detail response over its search summary.
//!
//! Detail values win when present and non-empty, summary values fill the
//! gaps, and anything absent from both becomes an empty string or zero.

use crate::models::wire::ApiItem;
use crate::models::{
    ItemDetail, ItemLocation, ItemSummary, ReturnPolicy, SellerInfo, ShippingTerms,
};

/// Detail built from summary fields alone, for items whose lookup failed.
pub fn from_summary(summary: &ItemSummary) -> ItemDetail {
    merge(summary, &ApiItem::default())
}

pub fn merge(summary: &ItemSummary, detail: &ApiItem) -> ItemDetail {
    let price = detail.price.as_ref();
    let availability = detail
        .estimated_availabilities
        .as_ref()
        .and_then(|a| a.first());
    let shipping = detail.shipping_options.as_ref().and_then(|s| s.first());
    let shipping_cost = shipping.and_then(|s| s.shipping_cost.as_ref());
    let returns = detail.return_terms.as_ref();
    let return_period = returns.and_then(|r| r.return_period.as_ref());

    ItemDetail {
        item_id: pick(detail.item_id.as_deref(), &summary.item_id),
        title: pick(detail.title.as_deref(), &summary.title),
        price: pick(price.and_then(|p| p.value.as_deref()), &summary.price),
        currency: pick(price.and_then(|p| p.currency.as_deref()), &summary.currency),
        item_web_url: pick(detail.item_web_url.as_deref(), &summary.item_web_url),
        condition: pick(
            detail.condition.as_deref(),
            summary.condition.as_deref().unwrap_or_default(),
        ),
        image_url: pick(
            detail.image.as_ref().and_then(|i| i.image_url.as_deref()),
            summary.image_url.as_deref().unwrap_or_default(),
        ),
        additional_images: detail
            .additional_images
            .iter()
            .flatten()
            .filter_map(|i| i.image_url.clone())
            .filter(|url| !url.is_empty())
            .collect(),
        watch_count: detail.watch_count.unwrap_or(0),
        sold_quantity: availability
            .and_then(|a| a.estimated_sold_quantity)
            .unwrap_or(0),
        available_quantity: availability
            .and_then(|a| a.estimated_available_quantity)
            .unwrap_or(0),
        availability_status: availability
            .and_then(|a| a.estimated_availability_status.clone())
            .unwrap_or_default(),
        shipping: ShippingTerms {
            cost: shipping_cost
                .and_then(|c| c.value.clone())
                .unwrap_or_default(),
            currency: shipping_cost
                .and_then(|c| c.currency.clone())
                .unwrap_or_default(),
            cost_type: shipping
                .and_then(|s| s.shipping_cost_type.clone())
                .unwrap_or_default(),
        },
        return_policy: ReturnPolicy {
            returns_accepted: returns.and_then(|r| r.returns_accepted).unwrap_or(false),
            period_value: return_period.and_then(|p| p.value).unwrap_or(0),
            period_unit: return_period
                .and_then(|p| p.unit.clone())
                .unwrap_or_default(),
            shipping_cost_payer: returns
                .and_then(|r| r.return_shipping_cost_payer.clone())
                .unwrap_or_default(),
        },
        seller: merge_seller(summary.seller.as_ref(), detail),
        location: merge_location(summary.location.as_ref(), detail),
        item_group_id: detail
            .primary_item_group
            .as_ref()
            .and_then(|g| g.item_group_id.clone())
            .unwrap_or_default(),
        variant_count: 1,
    }
}

fn merge_seller(summary: Option<&SellerInfo>, detail: &ApiItem) -> SellerInfo {
    let fallback = summary.cloned().unwrap_or_default();
    let Some(seller) = detail.seller.as_ref() else {
        return fallback;
    };
    SellerInfo {
        username: pick(seller.username.as_deref(), &fallback.username),
        feedback_percentage: pick(
            seller.feedback_percentage.as_deref(),
            &fallback.feedback_percentage,
        ),
        feedback_score: seller.feedback_score.unwrap_or(fallback.feedback_score),
    }
}

fn merge_location(summary: Option<&ItemLocation>, detail: &ApiItem) -> ItemLocation {
    let fallback = summary.cloned().unwrap_or_default();
    let Some(location) = detail.item_location.as_ref() else {
        return fallback;
    };
    ItemLocation {
        city: pick(location.city.as_deref(), &fallback.city),
        postal_code: pick(location.postal_code.as_deref(), &fallback.postal_code),
        country: pick(location.country.as_deref(), &fallback.country),
    }
}

fn pick(preferred: Option<&str>, fallback: &str) -> String {
    match preferred {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}
