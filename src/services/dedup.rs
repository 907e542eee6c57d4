use std::collections::HashMap;

use tracing::debug;

use crate::models::calendar::{CalendarItem, ItemKind};
use crate::models::records::RawBooking;
use crate::services::schedule_utils;

/// Rule B: collapse duplicate raw bookings that share
/// `(counterpartyId, startTime)`, keeping the numerically highest id —
/// the most recently created copy supersedes the earlier ones.
///
/// This runs on the raw collection, before normalization and bucketing.
/// Running the cross-type rule first could let a stale duplicate survive
/// just because it happened to sort ahead of its replacement.
pub fn dedup_raw_bookings(bookings: Vec<RawBooking>) -> Vec<RawBooking> {
    let mut kept: Vec<RawBooking> = Vec::with_capacity(bookings.len());
    let mut index_by_key: HashMap<(i64, i64), usize> = HashMap::new();
    let mut dropped = 0usize;

    for booking in bookings {
        let key = match booking
            .confirmed_date
            .as_ref()
            .and_then(|raw| schedule_utils::parse_datetime(raw).ok())
        {
            Some(start) => (booking.counterparty_id, start.timestamp()),
            // No usable timestamp: nothing to collide on, the normalizer
            // drops these later anyway.
            Option::None => {
                kept.push(booking);
                continue;
            }
        };

        match index_by_key.get(&key) {
            Some(&position) => {
                dropped += 1;
                if booking.id > kept[position].id {
                    kept[position] = booking;
                }
            }
            Option::None => {
                index_by_key.insert(key, kept.len());
                kept.push(booking);
            }
        }
    }

    if dropped > 0 {
        debug!(target: "app::calendar", dropped, "duplicate raw bookings collapsed");
    }

    kept
}

/// Rule A: within one day bucket, collapse items that share
/// `(startTime, counterpartyName)` across the two record kinds. A session
/// wins over a booking unconditionally; ties between equal kinds keep the
/// first item after the kind-priority sort. Output is ascending by start
/// time.
pub fn dedup_bucket_items(mut items: Vec<CalendarItem>) -> Vec<CalendarItem> {
    items.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.counterparty_name.cmp(&b.counterparty_name))
            .then_with(|| kind_rank(a.kind).cmp(&kind_rank(b.kind)))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut result: Vec<CalendarItem> = Vec::with_capacity(items.len());
    for item in items {
        let duplicate = result.last().map(|prev| {
            prev.start_time == item.start_time && prev.counterparty_name == item.counterparty_name
        });
        if duplicate == Some(true) {
            debug!(
                target: "app::calendar",
                kind = ?item.kind,
                id = item.id,
                "cross-type duplicate dropped from bucket"
            );
            continue;
        }
        result.push(item);
    }

    result
}

fn kind_rank(kind: ItemKind) -> u8 {
    match kind {
        ItemKind::Session => 0,
        ItemKind::Booking => 1,
    }
}
