use chrono::{DateTime, FixedOffset, NaiveDate};
use chrono_tz::Tz;
use serde_json::json;

use crate::error::{AppError, AppResult};

pub fn parse_datetime(value: &str) -> AppResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|err| {
        AppError::validation_with_details(
            "无效的时间格式",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_datetime(dt: DateTime<FixedOffset>) -> String {
    dt.to_rfc3339()
}

pub fn overlaps(
    a_start: DateTime<FixedOffset>,
    a_end: DateTime<FixedOffset>,
    b_start: DateTime<FixedOffset>,
    b_end: DateTime<FixedOffset>,
) -> AppResult<bool> {
    if a_end <= a_start {
        return Err(AppError::validation("时间范围无效"));
    }
    if b_end <= b_start {
        return Err(AppError::validation("时间范围无效"));
    }
    Ok(a_start < b_end && b_start < a_end)
}

pub fn ensure_window(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> AppResult<()> {
    if end <= start {
        Err(AppError::validation("时间窗口结束时间必须晚于开始"))
    } else {
        Ok(())
    }
}

/// Calendar date of `dt` in the viewer's zone. Bucketing must go through
/// this conversion; truncating the raw timestamp string shifts items by a
/// day across offsets.
pub fn local_date_in(dt: DateTime<FixedOffset>, tz: Tz) -> NaiveDate {
    dt.with_timezone(&tz).date_naive()
}
