use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::NaiveDate;
use coachcal_core::models::calendar::{ItemKind, WeekStart};
use coachcal_core::services::backend::{BackendConfig, HttpScheduleBackend, ScheduleBackend};
use coachcal_core::services::calendar_service::CalendarService;
use httpmock::prelude::*;
use serde_json::json;

fn backend_for(server: &MockServer) -> Arc<dyn ScheduleBackend> {
    let config = BackendConfig {
        base_url: server.base_url(),
        api_token: Some("test-token".to_string()),
        http_timeout: StdDuration::from_secs(5),
    };
    Arc::new(HttpScheduleBackend::try_new(&config).expect("http backend"))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[tokio::test]
async fn reconciles_both_sources_into_one_week() {
    let server = MockServer::start_async().await;

    // Three duplicate bookings for the same client/time (ids 5, 9, 7),
    // one booking that collides with a session, and one without a date.
    let bookings_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/bookings")
                .query_param("status", "confirmed")
                .header("authorization", "Bearer test-token");
            then.status(200).json_body(json!([
                {"id": 5, "counterpartyId": 7, "confirmedDate": "2024-06-03T09:00:00Z",
                 "durationMinutes": 60, "counterpartyName": "王强"},
                {"id": 9, "counterpartyId": 7, "confirmedDate": "2024-06-03T09:00:00Z",
                 "durationMinutes": 60, "counterpartyName": "王强"},
                {"id": 7, "counterpartyId": 7, "confirmedDate": "2024-06-03T09:00:00Z",
                 "durationMinutes": 60, "counterpartyName": "王强"},
                {"id": 11, "counterpartyId": 8, "confirmedDate": "2024-06-04T10:00:00Z",
                 "durationMinutes": 60, "counterpartyName": "李娜"},
                {"id": 12, "counterpartyId": 9, "confirmedDate": null,
                 "durationMinutes": 60, "counterpartyName": "陈平"}
            ]));
        })
        .await;

    let sessions_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/sessions")
                .query_param("status", "scheduled")
                .header("authorization", "Bearer test-token");
            then.status(200).json_body(json!([
                {"id": 3, "counterpartyId": 8, "scheduledDate": "2024-06-04T10:00:00Z",
                 "durationMinutes": 60, "counterpartyName": "李娜"},
                {"id": 4, "counterpartyId": 10, "scheduledDate": "2024-06-05T08:00:00Z",
                 "durationMinutes": 45,
                 "counterpartyProfile": {"displayName": "赵云"}}
            ]));
        })
        .await;

    let service = CalendarService::new(backend_for(&server), WeekStart::Monday, chrono_tz::UTC);
    service.refresh().await;
    let window = service.go_to_week_of(date(2024, 6, 5));

    bookings_mock.assert_async().await;
    sessions_mock.assert_async().await;

    assert_eq!(window.anchor_start, date(2024, 6, 3));
    assert_eq!(window.days.len(), 7);

    // Monday: the duplicate bookings collapse to the highest id.
    let monday = &window.days[0];
    assert_eq!(monday.items.len(), 1);
    assert_eq!(monday.items[0].kind, ItemKind::Booking);
    assert_eq!(monday.items[0].id, 9);

    // Tuesday: session 3 wins over booking 11 at the same time/name.
    let tuesday = &window.days[1];
    assert_eq!(tuesday.items.len(), 1);
    assert_eq!(tuesday.items[0].kind, ItemKind::Session);
    assert_eq!(tuesday.items[0].id, 3);

    // Wednesday: the profile display name fills the missing field.
    let wednesday = &window.days[2];
    assert_eq!(wednesday.items.len(), 1);
    assert_eq!(wednesday.items[0].counterparty_name, "赵云");

    // The undated booking never reached bucketing.
    let total: usize = window.days.iter().map(|d| d.items.len()).sum();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn one_failing_source_still_renders_the_other() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/bookings");
            then.status(200).json_body(json!([
                {"id": 1, "counterpartyId": 7, "confirmedDate": "2024-06-03T09:00:00Z",
                 "durationMinutes": 60, "counterpartyName": "王强"}
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/sessions");
            then.status(500);
        })
        .await;

    let service = CalendarService::new(backend_for(&server), WeekStart::Monday, chrono_tz::UTC);
    service.refresh().await;
    let window = service.go_to_week_of(date(2024, 6, 3));

    let total: usize = window.days.iter().map(|d| d.items.len()).sum();
    assert_eq!(total, 1);
    assert_eq!(window.days[0].items[0].counterparty_name, "王强");
}

#[tokio::test]
async fn navigation_recomputes_without_refetching() {
    let server = MockServer::start_async().await;

    let bookings_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/bookings");
            then.status(200).json_body(json!([
                {"id": 1, "counterpartyId": 7, "confirmedDate": "2024-06-03T09:00:00Z",
                 "durationMinutes": 60, "counterpartyName": "王强"}
            ]));
        })
        .await;
    let sessions_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/sessions");
            then.status(200).json_body(json!([]));
        })
        .await;

    let service = CalendarService::new(backend_for(&server), WeekStart::Monday, chrono_tz::UTC);
    service.refresh().await;

    let origin = service.go_to_week_of(date(2024, 6, 3)).anchor_start;
    let next = service.next_week();
    assert_eq!(next.anchor_start, origin + chrono::Duration::days(7));
    let total_next: usize = next.days.iter().map(|d| d.items.len()).sum();
    assert_eq!(total_next, 0);

    let back = service.previous_week();
    assert_eq!(back.anchor_start, origin);
    let total_back: usize = back.days.iter().map(|d| d.items.len()).sum();
    assert_eq!(total_back, 1);

    // Navigation is pure date arithmetic over the cached snapshot.
    bookings_mock.assert_hits_async(1).await;
    sessions_mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn sunday_convention_buckets_the_same_items_one_day_later() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/bookings");
            then.status(200).json_body(json!([
                {"id": 1, "counterpartyId": 7, "confirmedDate": "2024-06-03T09:00:00Z",
                 "durationMinutes": 60, "counterpartyName": "王强"}
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/sessions");
            then.status(200).json_body(json!([]));
        })
        .await;

    let service = CalendarService::new(backend_for(&server), WeekStart::Sunday, chrono_tz::UTC);
    service.refresh().await;
    let window = service.go_to_week_of(date(2024, 6, 3));

    // Sunday-anchored: the week starts 2024-06-02 and the Monday booking
    // sits in day index 1.
    assert_eq!(window.anchor_start, date(2024, 6, 2));
    assert_eq!(window.days[1].items.len(), 1);
}
