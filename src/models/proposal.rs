use serde::{Deserialize, Serialize};

/// One machine-proposed time assignment from the external optimizer.
/// Created fresh on every fetch, never mutated locally; the next fetch
/// supersedes the whole list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposedEntry {
    pub request_id: i64,
    pub counterparty_name: String,
    pub session_type: String,
    #[serde(default)]
    pub training_type: Option<String>,
    pub duration_minutes: i64,
    /// RFC 3339. `end_time - start_time` always equals `duration_minutes`.
    pub start_time: String,
    pub end_time: String,
    /// Granular slot ids consumed by this entry; more than one means the
    /// entry spans contiguous slots.
    pub slot_ids: Vec<i64>,
    /// Higher is more urgent.
    pub priority_score: f64,
}

/// Aggregate view over a proposal list. The optimizer returns its own copy
/// of this block; `ProposalReviewer::stats` recomputes it locally and the
/// local numbers are the ones surfaced.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleStatistics {
    pub total_requests: usize,
    pub scheduled_count: usize,
    pub total_hours: f64,
    pub utilization_rate: f64,
    pub gaps_minimized: usize,
}

/// Response of the assignment service's schedule endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimalScheduleDto {
    pub proposed_entries: Vec<ProposedEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ScheduleStatistics>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplyStatus {
    Applied,
    Rejected,
}

/// Per-entry response of the apply endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcomeDto {
    pub status: ApplyStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Server-side availability pre-check result for a batch of entries.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailabilityReport {
    pub conflicts: Vec<AvailabilityConflict>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityConflict {
    pub request_id: i64,
    #[serde(default)]
    pub conflict_reasons: Vec<String>,
}

/// Aggregated result of a sequential batch commit. Individual failures do
/// not abort the batch; they land in `failed_details` verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CommitOutcome {
    pub applied_count: usize,
    pub failed_count: usize,
    pub applied_details: Vec<i64>,
    pub failed_details: Vec<FailedCommit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailedCommit {
    pub request_id: i64,
    pub reason: String,
}
