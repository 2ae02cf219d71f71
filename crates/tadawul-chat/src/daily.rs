//! Daily aggregation of price ticks
//!
//! Turns an irregular tick sequence into one bar per calendar day. Friday and
//! Saturday, when the exchange is closed, are backfilled from the most recent
//! Thursday bar so charts stay continuous over the weekend.

use crate::models::{DailyBar, PriceTick};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeMap;
use tracing::warn;

/// Aggregate ticks into ascending daily bars
///
/// Within a day ticks are folded in encounter order: `open`, `x` and `y` come
/// from the first tick, `close` from the last, `high`/`low` are the extremes
/// and volumes are summed. Weekdays without ticks are skipped, as are ticks
/// whose date cannot be read. An empty input yields an empty output.
pub fn aggregate(ticks: &[PriceTick]) -> Vec<DailyBar> {
    let buckets = group_by_day(ticks);

    let (Some(&start), Some(&end)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Vec::new();
    };

    let mut bars = Vec::with_capacity(buckets.len());
    let mut last_thursday: Option<DailyBar> = None;

    for day in start.iter_days().take_while(|d| *d <= end) {
        if let Some(bar) = buckets.get(&day) {
            if day.weekday() == Weekday::Thu {
                last_thursday = Some(*bar);
            }
            bars.push(*bar);
        } else if is_regional_weekend(day) {
            let mut filler = last_thursday.unwrap_or_else(|| DailyBar::empty(day));
            filler.date = day;
            bars.push(filler);
        }
    }

    bars
}

fn group_by_day(ticks: &[PriceTick]) -> BTreeMap<NaiveDate, DailyBar> {
    let mut buckets: BTreeMap<NaiveDate, DailyBar> = BTreeMap::new();

    for tick in ticks {
        let Some(timestamp) = tick.timestamp() else {
            warn!(date = %tick.date, "Skipping tick with unreadable date");
            continue;
        };
        let day = timestamp.date();
        buckets
            .entry(day)
            .and_modify(|bar| {
                bar.high = bar.high.max(tick.high);
                bar.low = bar.low.min(tick.low);
                bar.close = tick.close;
                bar.volume = bar.volume.saturating_add(tick.volume);
            })
            .or_insert(DailyBar {
                date: day,
                open: tick.open,
                high: tick.high,
                low: tick.low,
                close: tick.close,
                volume: tick.volume,
                x: tick.x,
                y: tick.y,
            });
    }

    buckets
}

fn is_regional_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Fri | Weekday::Sat)
}
