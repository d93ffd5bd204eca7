//! Collapse a variant group into one representative listing.

use crate::models::wire::ApiItem;
use crate::models::{ItemDetail, ItemSummary};

use super::merge::merge;

/// Aggregate `variants` of `group_id` into a single detail.
///
/// The representative is the variant with the lowest parsed price, first one
/// wins on ties. Variants with unparseable prices only qualify when no
/// variant parses. Sold and available quantities are summed over every
/// variant; all other fields come from the representative. Returns `None`
/// for an empty group.
pub fn aggregate_group(
    summary: &ItemSummary,
    group_id: &str,
    variants: &[ApiItem],
) -> Option<ItemDetail> {
    let details: Vec<ItemDetail> = variants.iter().map(|v| merge(summary, v)).collect();

    let mut best: Option<(usize, f64)> = None;
    for (idx, detail) in details.iter().enumerate() {
        if let Some(price) = detail.price_value() {
            match best {
                Some((_, lowest)) if price >= lowest => {}
                _ => best = Some((idx, price)),
            }
        }
    }
    let rep_idx = match best {
        Some((idx, _)) => idx,
        None if !details.is_empty() => 0,
        None => return None,
    };

    let sold_quantity = details
        .iter()
        .fold(0u64, |acc, d| acc.saturating_add(d.sold_quantity));
    let available_quantity = details
        .iter()
        .fold(0u64, |acc, d| acc.saturating_add(d.available_quantity));
    let variant_count = u32::try_from(details.len()).unwrap_or(u32::MAX);

    let mut representative = details.into_iter().nth(rep_idx)?;
    representative.sold_quantity = sold_quantity;
    representative.available_quantity = available_quantity;
    representative.item_group_id = group_id.to_string();
    representative.variant_count = variant_count;
    Some(representative)
}
