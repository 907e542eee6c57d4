use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::calendar::CalendarItem;
use crate::models::proposal::ProposedEntry;
use crate::services::schedule_utils;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConflictReason {
    DirectOverlap,
    InsufficientBreakBefore,
    InsufficientBreakAfter,
}

/// One advisory finding. Exactly one of the `conflicting_*` fields is set,
/// depending on whether the other side is a proposed entry or an item
/// already on the confirmed calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConflict {
    pub request_id: i64,
    pub reason: ConflictReason,
    pub message: String,
    #[serde(default)]
    pub conflicting_request_id: Option<i64>,
    #[serde(default)]
    pub conflicting_item_id: Option<i64>,
}

/// Check a set of proposed entries against each other and against the
/// confirmed calendar, under the trainer's minimum-break preference.
///
/// Each range is widened by half the break on both sides; two entries
/// conflict when the widened ranges strictly overlap. Ranges that already
/// overlap unwidened are reported as a direct overlap instead of a break
/// violation. Findings are advisory: the caller may proceed after explicit
/// confirmation, the service-side apply step re-validates independently.
pub fn check_conflicts(
    entries: &[ProposedEntry],
    confirmed: &[CalendarItem],
    min_break_minutes: i64,
) -> AppResult<Vec<ScheduleConflict>> {
    // Half the break in seconds keeps odd minute counts exact.
    let half_break = Duration::seconds(min_break_minutes.max(0) * 30);
    let mut conflicts = Vec::new();

    let parsed = entries
        .iter()
        .map(|entry| -> AppResult<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
            let start = schedule_utils::parse_datetime(&entry.start_time)?;
            let end = schedule_utils::parse_datetime(&entry.end_time)?;
            schedule_utils::ensure_window(start, end)?;
            Ok((start, end))
        })
        .collect::<AppResult<Vec<_>>>()?;

    for (i, entry) in entries.iter().enumerate() {
        let (start, end) = parsed[i];

        for (j, other) in entries.iter().enumerate() {
            if i == j {
                continue;
            }
            let (other_start, other_end) = parsed[j];
            if let Some(reason) = classify(start, end, other_start, other_end, half_break)? {
                conflicts.push(ScheduleConflict {
                    request_id: entry.request_id,
                    reason,
                    message: format!(
                        "预约时段 [{} - {}] 与请求 {} 冲突",
                        entry.start_time, entry.end_time, other.request_id
                    ),
                    conflicting_request_id: Some(other.request_id),
                    conflicting_item_id: None,
                });
            }
        }

        for item in confirmed {
            let item_start = item.start_time;
            let item_end = item.end_time();
            if let Some(reason) = classify(start, end, item_start, item_end, half_break)? {
                conflicts.push(ScheduleConflict {
                    request_id: entry.request_id,
                    reason,
                    message: format!(
                        "预约时段 [{} - {}] 与已确认日程 {} ({}) 冲突",
                        entry.start_time,
                        entry.end_time,
                        item.counterparty_name,
                        schedule_utils::format_datetime(item_start)
                    ),
                    conflicting_request_id: None,
                    conflicting_item_id: Some(item.id),
                });
            }
        }
    }

    conflicts.sort_by(|a, b| {
        reason_rank(a.reason)
            .cmp(&reason_rank(b.reason))
            .then_with(|| a.request_id.cmp(&b.request_id))
    });

    Ok(conflicts)
}

fn classify(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    other_start: DateTime<FixedOffset>,
    other_end: DateTime<FixedOffset>,
    half_break: Duration,
) -> AppResult<Option<ConflictReason>> {
    if schedule_utils::overlaps(start, end, other_start, other_end)? {
        return Ok(Some(ConflictReason::DirectOverlap));
    }

    let widened = schedule_utils::overlaps(
        start - half_break,
        end + half_break,
        other_start - half_break,
        other_end + half_break,
    )?;
    if !widened {
        return Ok(Option::None);
    }

    if other_end <= start {
        Ok(Some(ConflictReason::InsufficientBreakBefore))
    } else {
        Ok(Some(ConflictReason::InsufficientBreakAfter))
    }
}

fn reason_rank(reason: ConflictReason) -> u8 {
    match reason {
        ConflictReason::DirectOverlap => 0,
        ConflictReason::InsufficientBreakBefore | ConflictReason::InsufficientBreakAfter => 1,
    }
}

pub fn has_direct_overlap(conflicts: &[ScheduleConflict]) -> bool {
    conflicts
        .iter()
        .any(|c| matches!(c.reason, ConflictReason::DirectOverlap))
}
