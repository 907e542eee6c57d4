use std::sync::Arc;
use std::time::Duration as StdDuration;

use coachcal_core::models::calendar::WeekStart;
use coachcal_core::services::backend::{BackendConfig, HttpScheduleBackend, ScheduleBackend};
use coachcal_core::services::calendar_service::CalendarService;
use coachcal_core::services::conflict::ConflictReason;
use coachcal_core::services::review_service::ReviewService;
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

fn proposal_entry(request_id: i64, start: &str, end: &str) -> serde_json::Value {
    json!({
        "requestId": request_id,
        "counterpartyName": format!("客户{request_id}"),
        "sessionType": "私教训练",
        "trainingType": "力量",
        "durationMinutes": 60,
        "startTime": start,
        "endTime": end,
        "slotIds": [request_id * 10, request_id * 10 + 1],
        "priorityScore": 0.5 + request_id as f64 / 10.0
    })
}

async fn mock_schedule(server: &MockServer, entries: Vec<serde_json::Value>) {
    server
        .mock_async(move |when, then| {
            let scheduled_count = entries.len();
            when.method(GET)
                .path("/trainers/7/optimal-schedule")
                .header("authorization", "Bearer test-token");
            then.status(200).json_body(json!({
                "proposedEntries": entries,
                "statistics": {
                    "totalRequests": 6,
                    "scheduledCount": scheduled_count,
                    "totalHours": 4.0,
                    "utilizationRate": 0.62,
                    "gapsMinimized": 2
                }
            }));
        })
        .await;
}

async fn mock_apply(server: &MockServer, request_id: i64, body: serde_json::Value) {
    server
        .mock_async(move |when, then| {
            when.method(POST)
                .path("/schedule/apply")
                .json_body(json!({ "requestId": request_id }));
            then.status(200).json_body(body.clone());
        })
        .await;
}

#[tokio::test]
async fn full_review_cycle_with_partial_failure() {
    let server = MockServer::start_async().await;

    mock_schedule(
        &server,
        vec![
            proposal_entry(1, "2024-06-10T09:00:00Z", "2024-06-10T10:00:00Z"),
            proposal_entry(2, "2024-06-10T10:30:00Z", "2024-06-10T11:30:00Z"),
            proposal_entry(3, "2024-06-10T14:00:00Z", "2024-06-10T15:00:00Z"),
        ],
    )
    .await;

    mock_apply(&server, 1, json!({"status": "applied"})).await;
    mock_apply(
        &server,
        2,
        json!({"status": "rejected", "reason": "时段已被其他提交占用"}),
    )
    .await;
    mock_apply(&server, 3, json!({"status": "applied"})).await;

    let service = ReviewService::new(backend_for(&server), 7, 15);
    let entries = service.fetch_proposals().await.expect("fetch proposals");
    assert_eq!(entries.len(), 3);

    service.select_all();
    let outcome = service.apply_batch().await.expect("batch outcome");

    assert_eq!(outcome.applied_count, 2);
    assert_eq!(outcome.failed_count, 1);
    assert_eq!(outcome.applied_details, vec![1, 3]);
    assert_eq!(outcome.failed_details[0].request_id, 2);
    assert_eq!(outcome.failed_details[0].reason, "时段已被其他提交占用");
}

#[tokio::test]
async fn selection_never_survives_a_refetch() {
    let server = MockServer::start_async().await;

    mock_schedule(
        &server,
        vec![
            proposal_entry(1, "2024-06-10T09:00:00Z", "2024-06-10T10:00:00Z"),
            proposal_entry(2, "2024-06-10T10:30:00Z", "2024-06-10T11:30:00Z"),
            proposal_entry(3, "2024-06-10T12:00:00Z", "2024-06-10T13:00:00Z"),
            proposal_entry(4, "2024-06-10T14:00:00Z", "2024-06-10T15:00:00Z"),
        ],
    )
    .await;
    for id in 1..=2 {
        mock_apply(&server, id, json!({"status": "applied"})).await;
    }
    for id in 3..=4 {
        mock_apply(&server, id, json!({"status": "rejected", "reason": "校验失败"})).await;
    }

    let service = ReviewService::new(backend_for(&server), 7, 15);
    service.fetch_proposals().await.expect("fetch proposals");
    service.select_all();
    assert_eq!(service.selected_request_ids().len(), 4);

    let outcome = service.apply_batch().await.expect("batch outcome");
    assert_eq!(outcome.applied_count + outcome.failed_count, 4);

    // However many entries failed, a subsequent fetch starts clean.
    service.fetch_proposals().await.expect("refetch proposals");
    assert!(service.selected_request_ids().is_empty());
}

#[tokio::test]
async fn local_precheck_flags_tight_schedule_as_advisory() {
    let server = MockServer::start_async().await;

    // 5-minute gap between the two entries, against a 15-minute break
    // preference.
    mock_schedule(
        &server,
        vec![
            proposal_entry(1, "2024-06-10T09:00:00Z", "2024-06-10T10:00:00Z"),
            proposal_entry(2, "2024-06-10T10:05:00Z", "2024-06-10T11:05:00Z"),
        ],
    )
    .await;

    let service = ReviewService::new(backend_for(&server), 7, 15);
    service.fetch_proposals().await.expect("fetch proposals");
    service.select_all();

    let conflicts = service.precheck_selected(&[]).expect("precheck");
    assert!(!conflicts.is_empty());
    assert!(conflicts
        .iter()
        .all(|c| c.reason != ConflictReason::DirectOverlap));

    // Advisory only: the reviewer can still commit after confirming.
    assert_eq!(service.selected_request_ids().len(), 2);
}

#[tokio::test]
async fn precheck_runs_against_the_confirmed_calendar() {
    let server = MockServer::start_async().await;

    // One confirmed session at 09:30-10:30 on the trainer's calendar.
    server
        .mock_async(|when, then| {
            when.method(GET).path("/bookings");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/sessions");
            then.status(200).json_body(json!([
                {"id": 42, "counterpartyId": 8, "scheduledDate": "2024-06-10T09:30:00Z",
                 "durationMinutes": 60, "counterpartyName": "李娜"}
            ]));
        })
        .await;
    // The optimizer proposes an entry overlapping that session.
    mock_schedule(
        &server,
        vec![proposal_entry(
            1,
            "2024-06-10T09:00:00Z",
            "2024-06-10T10:00:00Z",
        )],
    )
    .await;

    let backend = backend_for(&server);
    let calendar =
        CalendarService::new(Arc::clone(&backend), WeekStart::Monday, chrono_tz::UTC);
    calendar.refresh().await;

    let review = ReviewService::new(backend, 7, 15);
    review.fetch_proposals().await.expect("fetch proposals");
    review.select_all();

    let conflicts = review
        .precheck_selected(&calendar.confirmed_items())
        .expect("precheck");
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].reason, ConflictReason::DirectOverlap);
    assert_eq!(conflicts[0].conflicting_item_id, Some(42));
}

#[tokio::test]
async fn remote_precheck_surfaces_server_side_conflicts() {
    let server = MockServer::start_async().await;

    mock_schedule(
        &server,
        vec![proposal_entry(
            1,
            "2024-06-10T09:00:00Z",
            "2024-06-10T10:00:00Z",
        )],
    )
    .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/schedule/check-availability");
            then.status(200).json_body(json!({
                "conflicts": [
                    {"requestId": 1, "conflictReasons": ["时段已被占用"]}
                ]
            }));
        })
        .await;

    let service = ReviewService::new(backend_for(&server), 7, 15);
    service.fetch_proposals().await.expect("fetch proposals");

    let report = service.remote_precheck().await.expect("availability report");
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].request_id, 1);
    assert_eq!(report.conflicts[0].conflict_reasons, vec!["时段已被占用"]);
}

#[tokio::test]
async fn remote_statistics_are_kept_beside_local_ones() {
    let server = MockServer::start_async().await;

    mock_schedule(
        &server,
        vec![
            proposal_entry(1, "2024-06-10T09:00:00Z", "2024-06-10T10:00:00Z"),
            proposal_entry(2, "2024-06-10T10:15:00Z", "2024-06-10T11:15:00Z"),
        ],
    )
    .await;

    let service = ReviewService::new(backend_for(&server), 7, 15);
    service.fetch_proposals().await.expect("fetch proposals");

    let remote = service.remote_statistics().expect("remote statistics");
    assert_eq!(remote.total_requests, 6);

    // Local stats are recomputed over the actual list, not trusted from
    // the optimizer.
    let local = service.stats();
    assert_eq!(local.total_requests, 2);
    assert_eq!(local.scheduled_count, 2);
    assert!((local.total_hours - 2.0).abs() < f64::EPSILON);
}
