use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::models::calendar::{CalendarItem, DayBucket, WeekStart, WeekWindow};
use crate::services::{dedup, schedule_utils};

pub const DAYS_PER_WEEK: i64 = 7;

/// Most recent date at or before `date` that falls on the configured
/// start-of-week day.
pub fn week_anchor(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    date - Duration::days(week_start.days_from_start(date.weekday()))
}

/// Bucket normalized items into the seven-day window containing `anchor`,
/// then collapse cross-type duplicates per bucket (Rule A). Items whose
/// local date falls outside the window belong to another week and are
/// dropped for this render.
pub fn assemble_week(
    anchor: NaiveDate,
    week_start: WeekStart,
    timezone: Tz,
    items: &[CalendarItem],
) -> WeekWindow {
    let anchor_start = week_anchor(anchor, week_start);
    let mut buckets: Vec<Vec<CalendarItem>> = (0..DAYS_PER_WEEK).map(|_| Vec::new()).collect();
    let mut outside = 0usize;

    for item in items {
        let local_date = schedule_utils::local_date_in(item.start_time, timezone);
        let offset = (local_date - anchor_start).num_days();
        if (0..DAYS_PER_WEEK).contains(&offset) {
            buckets[offset as usize].push(item.clone());
        } else {
            outside += 1;
        }
    }

    if outside > 0 {
        debug!(
            target: "app::calendar",
            outside,
            anchor = %anchor_start,
            "items outside the week window skipped for this render"
        );
    }

    let days = buckets
        .into_iter()
        .enumerate()
        .map(|(index, bucket)| DayBucket {
            date: anchor_start + Duration::days(index as i64),
            items: dedup::dedup_bucket_items(bucket),
        })
        .collect();

    WeekWindow { anchor_start, days }
}

/// Pure date arithmetic over the week anchor. Navigation never refetches;
/// bucketing is recomputed from the already-fetched item set by the owner.
#[derive(Debug, Clone)]
pub struct WeekNavigator {
    week_start: WeekStart,
    timezone: Tz,
    anchor_start: NaiveDate,
}

impl WeekNavigator {
    pub fn new(week_start: WeekStart, timezone: Tz) -> Self {
        let today = today_in(timezone, Utc::now());
        Self {
            week_start,
            timezone,
            anchor_start: week_anchor(today, week_start),
        }
    }

    pub fn anchor_start(&self) -> NaiveDate {
        self.anchor_start
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn next(&mut self) {
        self.anchor_start += Duration::days(DAYS_PER_WEEK);
    }

    pub fn previous(&mut self) {
        self.anchor_start -= Duration::days(DAYS_PER_WEEK);
    }

    pub fn go_to_current(&mut self) {
        self.go_to_date(today_in(self.timezone, Utc::now()));
    }

    pub fn is_current_week(&self) -> bool {
        self.is_week_of(today_in(self.timezone, Utc::now()))
    }

    /// Jump to the week containing `date`.
    pub fn go_to_date(&mut self, date: NaiveDate) {
        self.anchor_start = week_anchor(date, self.week_start);
    }

    pub fn is_week_of(&self, date: NaiveDate) -> bool {
        self.anchor_start == week_anchor(date, self.week_start)
    }
}

fn today_in(timezone: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}
