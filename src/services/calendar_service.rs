use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::models::calendar::{CalendarItem, WeekStart, WeekWindow};
use crate::models::records::{BookingStatus, SessionStatus};
use crate::services::backend::ScheduleBackend;
use crate::services::week::{assemble_week, WeekNavigator};
use crate::services::{dedup, normalizer};

/// Owns the reconciled week view: fetches the two record streams, runs the
/// reconciliation pipeline (intra-booking dedup → normalize → bucket →
/// cross-type dedup) and recomputes the window on navigation without
/// refetching. There is no backing store; every refresh recomputes from
/// the fetched snapshot.
pub struct CalendarService {
    backend: Arc<dyn ScheduleBackend>,
    timezone: Tz,
    navigator: RwLock<WeekNavigator>,
    items: RwLock<Vec<CalendarItem>>,
    fetch_generation: AtomicU64,
}

impl CalendarService {
    pub fn new(backend: Arc<dyn ScheduleBackend>, week_start: WeekStart, timezone: Tz) -> Self {
        Self {
            backend,
            timezone,
            navigator: RwLock::new(WeekNavigator::new(week_start, timezone)),
            items: RwLock::new(Vec::new()),
            fetch_generation: AtomicU64::new(0),
        }
    }

    /// Refetch both source collections and rebuild the current window.
    ///
    /// The two fetches run concurrently and are awaited jointly; a failed
    /// source degrades to an empty collection so the other still renders.
    /// If a newer refresh was started while this one was in flight, this
    /// result is discarded (last-requested-wins) and the window is served
    /// from the newer snapshot.
    pub async fn refresh(&self) -> WeekWindow {
        let generation = self.fetch_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (bookings, sessions) = tokio::join!(
            self.backend.list_bookings(BookingStatus::Confirmed),
            self.backend.list_sessions(SessionStatus::Scheduled),
        );

        let bookings = bookings.unwrap_or_else(|err| {
            warn!(target: "app::calendar", error = %err, "预约列表拉取失败，按空集合处理");
            Vec::new()
        });
        let sessions = sessions.unwrap_or_else(|err| {
            warn!(target: "app::calendar", error = %err, "课程列表拉取失败，按空集合处理");
            Vec::new()
        });

        if self.fetch_generation.load(Ordering::SeqCst) != generation {
            debug!(
                target: "app::calendar",
                generation,
                "stale fetch result discarded"
            );
            return self.current_window();
        }

        let bookings = dedup::dedup_raw_bookings(bookings);
        let normalized = normalizer::normalize_records(&bookings, &sessions);

        info!(
            target: "app::calendar",
            bookings = bookings.len(),
            items = normalized.len(),
            "calendar snapshot refreshed"
        );

        *self.items.write().expect("items lock poisoned") = normalized;
        self.current_window()
    }

    /// Rebuild the window for the current anchor from the cached snapshot.
    pub fn current_window(&self) -> WeekWindow {
        let navigator = self.navigator.read().expect("navigator lock poisoned");
        let items = self.items.read().expect("items lock poisoned");
        assemble_week(
            navigator.anchor_start(),
            navigator.week_start(),
            self.timezone,
            &items,
        )
    }

    pub fn next_week(&self) -> WeekWindow {
        self.navigator
            .write()
            .expect("navigator lock poisoned")
            .next();
        self.current_window()
    }

    pub fn previous_week(&self) -> WeekWindow {
        self.navigator
            .write()
            .expect("navigator lock poisoned")
            .previous();
        self.current_window()
    }

    pub fn go_to_current_week(&self) -> WeekWindow {
        self.navigator
            .write()
            .expect("navigator lock poisoned")
            .go_to_current();
        self.current_window()
    }

    /// Jump to the week containing `date` (deep links, date pickers).
    pub fn go_to_week_of(&self, date: NaiveDate) -> WeekWindow {
        self.navigator
            .write()
            .expect("navigator lock poisoned")
            .go_to_date(date);
        self.current_window()
    }

    pub fn is_current_week(&self) -> bool {
        self.navigator
            .read()
            .expect("navigator lock poisoned")
            .is_current_week()
    }

    pub fn anchor_start(&self) -> NaiveDate {
        self.navigator
            .read()
            .expect("navigator lock poisoned")
            .anchor_start()
    }

    /// Confirmed items of the cached snapshot, for the advisory conflict
    /// pre-check against the live calendar.
    pub fn confirmed_items(&self) -> Vec<CalendarItem> {
        self.items.read().expect("items lock poisoned").clone()
    }
}
