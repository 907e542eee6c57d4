use tracing::warn;

use crate::models::calendar::{CalendarItem, ItemKind};
use crate::models::records::{ProfileRef, RawBooking, RawSession};
use crate::services::schedule_utils;

/// Shown when neither the denormalized name nor the nested profile carries
/// a usable counterparty name.
pub const COUNTERPARTY_PLACEHOLDER: &str = "待确认客户";

/// Convert both raw collections into the canonical calendar item shape.
///
/// Records without a nominal timestamp are an expected input state (an
/// unconfirmed booking has no `confirmedDate` yet) and are excluded
/// silently. An unparseable timestamp is upstream data rot and is excluded
/// with a warning instead.
pub fn normalize_records(bookings: &[RawBooking], sessions: &[RawSession]) -> Vec<CalendarItem> {
    let mut items = Vec::with_capacity(bookings.len() + sessions.len());

    for booking in bookings {
        if let Some(item) = normalize_booking(booking) {
            items.push(item);
        }
    }
    for session in sessions {
        if let Some(item) = normalize_session(session) {
            items.push(item);
        }
    }

    items
}

fn normalize_booking(booking: &RawBooking) -> Option<CalendarItem> {
    let start_time = nominal_time(
        ItemKind::Booking,
        booking.id,
        booking.confirmed_date.as_ref(),
    )?;

    if booking.duration_minutes <= 0 {
        warn!(
            target: "app::calendar",
            id = booking.id,
            duration = booking.duration_minutes,
            "booking dropped: non-positive duration"
        );
        return None;
    }

    Some(CalendarItem {
        kind: ItemKind::Booking,
        id: booking.id,
        counterparty_id: booking.counterparty_id,
        counterparty_name: resolve_counterparty_name(
            booking.counterparty_name.as_ref(),
            booking.counterparty_profile.as_ref(),
        ),
        session_type: booking.session_type.clone().unwrap_or_default(),
        start_time,
        duration_minutes: booking.duration_minutes,
        location: booking.location.clone(),
    })
}

fn normalize_session(session: &RawSession) -> Option<CalendarItem> {
    let start_time = nominal_time(
        ItemKind::Session,
        session.id,
        session.scheduled_date.as_ref(),
    )?;

    if session.duration_minutes <= 0 {
        warn!(
            target: "app::calendar",
            id = session.id,
            duration = session.duration_minutes,
            "session dropped: non-positive duration"
        );
        return None;
    }

    Some(CalendarItem {
        kind: ItemKind::Session,
        id: session.id,
        counterparty_id: session.counterparty_id,
        counterparty_name: resolve_counterparty_name(
            session.counterparty_name.as_ref(),
            session.counterparty_profile.as_ref(),
        ),
        session_type: session.session_type.clone().unwrap_or_default(),
        start_time,
        duration_minutes: session.duration_minutes,
        location: session.location.clone(),
    })
}

fn nominal_time(
    kind: ItemKind,
    id: i64,
    raw: Option<&String>,
) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    let raw = raw?;
    match schedule_utils::parse_datetime(raw) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(
                target: "app::calendar",
                kind = ?kind,
                id,
                value = %raw,
                "record dropped: unparseable nominal timestamp"
            );
            Option::None
        }
    }
}

/// Resolution order is load-bearing: denormalized field, then the nested
/// profile, then the placeholder. Upstream rows may carry any one of the
/// three.
fn resolve_counterparty_name(denormalized: Option<&String>, profile: Option<&ProfileRef>) -> String {
    if let Some(name) = denormalized {
        if !name.trim().is_empty() {
            return name.clone();
        }
    }
    if let Some(profile) = profile {
        if let Some(name) = &profile.display_name {
            if !name.trim().is_empty() {
                return name.clone();
            }
        }
    }
    COUNTERPARTY_PLACEHOLDER.to_string()
}
