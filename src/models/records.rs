use serde::{Deserialize, Serialize};

/// Raw record shapes as returned by the booking/session store. The two
/// collections model the same real-world appointments through different
/// confirmation paths, so their nominal timestamp fields differ
/// (`confirmedDate` vs `scheduledDate`) and both may be absent for records
/// that are not yet pinned to a concrete time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawBooking {
    pub id: i64,
    pub counterparty_id: i64,
    #[serde(default)]
    pub confirmed_date: Option<String>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub session_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub counterparty_name: Option<String>,
    #[serde(default)]
    pub counterparty_profile: Option<ProfileRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawSession {
    pub id: i64,
    pub counterparty_id: i64,
    #[serde(default)]
    pub scheduled_date: Option<String>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub session_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub counterparty_name: Option<String>,
    #[serde(default)]
    pub counterparty_profile: Option<ProfileRef>,
}

/// Nested profile row carried by records that lack the denormalized name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRef {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}
