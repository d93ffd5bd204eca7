//! Category-wide aggregates over enriched listings.

use crate::models::{CategoryStats, ItemDetail};

/// Compute stats for a set of listings.
///
/// Price figures only consider positive, parseable prices. Watcher figures
/// use every listing, counting a missing watch count as zero. An empty input
/// (or one with no usable prices) yields zeros rather than NaN.
pub fn compute<'a, I>(items: I) -> CategoryStats
where
    I: IntoIterator<Item = &'a ItemDetail>,
{
    let mut listings = 0u64;
    let mut watchers = 0u64;
    let mut priced = 0u64;
    let mut price_sum = 0.0f64;
    let mut min_price = f64::INFINITY;
    let mut max_price = f64::NEG_INFINITY;

    for item in items {
        listings += 1;
        watchers = watchers.saturating_add(item.watch_count);
        if let Some(price) = item.price_value().filter(|p| *p > 0.0) {
            priced += 1;
            price_sum += price;
            min_price = min_price.min(price);
            max_price = max_price.max(price);
        }
    }

    let (avg_price, min_price, max_price) = if priced == 0 {
        (0.0, 0.0, 0.0)
    } else {
        (price_sum / priced as f64, min_price, max_price)
    };
    let avg_watchers = if listings == 0 {
        0.0
    } else {
        watchers as f64 / listings as f64
    };

    CategoryStats {
        avg_price,
        min_price,
        max_price,
        total_listings: listings,
        total_watchers: watchers,
        avg_watchers,
    }
}
