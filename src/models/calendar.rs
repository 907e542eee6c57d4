use chrono::{DateTime, FixedOffset, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Which confirmation path produced a calendar item. A `Session` is the
/// authoritative record once an appointment went through the newer path;
/// a `Booking` is the legacy confirmation of the same event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    Booking,
    Session,
}

/// Canonical calendar item derived from the two raw record streams.
/// Never persisted; recomputed from fetched snapshots on every load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarItem {
    pub kind: ItemKind,
    /// Unique within its source collection only. A booking id 7 and a
    /// session id 7 are distinct records.
    pub id: i64,
    pub counterparty_id: i64,
    pub counterparty_name: String,
    pub session_type: String,
    pub start_time: DateTime<FixedOffset>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub location: Option<String>,
}

impl CalendarItem {
    pub fn end_time(&self) -> DateTime<FixedOffset> {
        self.start_time + chrono::Duration::minutes(self.duration_minutes)
    }
}

/// One day of the week view. Items are ordered ascending by start time and
/// every item's local calendar date equals `date`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub date: NaiveDate,
    pub items: Vec<CalendarItem>,
}

/// A seven-day window anchored at `anchor_start`; `days[i].date` is always
/// `anchor_start + i`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeekWindow {
    pub anchor_start: NaiveDate,
    pub days: Vec<DayBucket>,
}

/// Week-start convention. The surrounding product uses Sunday-anchored
/// weeks for clients and Monday-anchored weeks for trainers; both are
/// plain configurations of the same bucketing algorithm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WeekStart {
    Sunday,
    Monday,
}

impl WeekStart {
    /// Days elapsed since the configured start of week for `weekday`.
    pub fn days_from_start(self, weekday: Weekday) -> i64 {
        match self {
            WeekStart::Sunday => weekday.num_days_from_sunday() as i64,
            WeekStart::Monday => weekday.num_days_from_monday() as i64,
        }
    }
}
