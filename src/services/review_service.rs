use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::calendar::CalendarItem;
use crate::models::proposal::{
    ApplyStatus, AvailabilityReport, CommitOutcome, FailedCommit, ProposedEntry,
    ScheduleStatistics,
};
use crate::services::backend::ScheduleBackend;
use crate::services::conflict::{check_conflicts, ScheduleConflict};
use crate::services::schedule_utils;

/// Two back-to-back entries this close together count as a minimized gap
/// in the aggregate statistics.
const GAP_MINIMIZED_MINUTES: i64 = 30;

/// Holds the fetched proposal list and the reviewer's selection. Both are
/// owned by one reviewing session; the next fetch supersedes the list
/// entirely and always clears the selection, because request ids may no
/// longer refer to the same entries.
#[derive(Debug, Default)]
pub struct ProposalReviewer {
    entries: Vec<ProposedEntry>,
    selection: HashSet<i64>,
}

impl ProposalReviewer {
    pub fn load(&mut self, entries: Vec<ProposedEntry>) {
        self.entries = entries;
        self.selection.clear();
    }

    pub fn entries(&self) -> &[ProposedEntry] {
        &self.entries
    }

    /// Flip membership. Toggling a request id that is not in the current
    /// list is a stale action after a refetch and is ignored, not an
    /// error.
    pub fn toggle(&mut self, request_id: i64) {
        if !self.entries.iter().any(|e| e.request_id == request_id) {
            debug!(
                target: "app::review",
                request_id,
                "stale toggle ignored"
            );
            return;
        }
        if !self.selection.remove(&request_id) {
            self.selection.insert(request_id);
        }
    }

    pub fn select_all(&mut self) {
        self.selection = self.entries.iter().map(|e| e.request_id).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, request_id: i64) -> bool {
        self.selection.contains(&request_id)
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    /// Selected ids in proposal-list order, which is also the commit
    /// order.
    pub fn selected_request_ids(&self) -> Vec<i64> {
        self.entries
            .iter()
            .filter(|e| self.selection.contains(&e.request_id))
            .map(|e| e.request_id)
            .collect()
    }

    pub fn selected_entries(&self) -> Vec<ProposedEntry> {
        self.entries
            .iter()
            .filter(|e| self.selection.contains(&e.request_id))
            .cloned()
            .collect()
    }

    /// Aggregate view over the current proposal list. Always recomputed
    /// locally; the optimizer's own statistics block is display-only.
    pub fn stats(&self) -> ScheduleStatistics {
        let total_requests = self
            .entries
            .iter()
            .map(|e| e.request_id)
            .collect::<HashSet<_>>()
            .len();
        let scheduled_count = self.entries.len();
        let total_minutes: i64 = self.entries.iter().map(|e| e.duration_minutes).sum();

        let mut timed: Vec<_> = self
            .entries
            .iter()
            .filter_map(|e| {
                let start = schedule_utils::parse_datetime(&e.start_time).ok()?;
                let end = schedule_utils::parse_datetime(&e.end_time).ok()?;
                Some((start, end))
            })
            .collect();
        timed.sort_by_key(|(start, _)| *start);

        let utilization_rate = match (timed.first(), timed.last()) {
            (Some((span_start, _)), Some(_)) => {
                let span_end = timed
                    .iter()
                    .map(|(_, end)| *end)
                    .max()
                    .expect("non-empty timed entries");
                let span_minutes = (span_end - *span_start).num_minutes();
                if span_minutes > 0 {
                    (total_minutes as f64 / span_minutes as f64).min(1.0)
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        let gaps_minimized = timed
            .windows(2)
            .filter(|pair| {
                let (_, prev_end) = pair[0];
                let (next_start, _) = pair[1];
                let gap = (next_start - prev_end).num_minutes();
                prev_end.date_naive() == next_start.date_naive()
                    && (0..=GAP_MINIMIZED_MINUTES).contains(&gap)
            })
            .count();

        ScheduleStatistics {
            total_requests,
            scheduled_count,
            total_hours: total_minutes as f64 / 60.0,
            utilization_rate,
            gaps_minimized,
        }
    }
}

/// Fronts one trainer's review queue: fetching proposals, tracking the
/// selection, running the advisory conflict pre-checks and committing a
/// selected batch against the remote service.
pub struct ReviewService {
    backend: Arc<dyn ScheduleBackend>,
    trainer_id: i64,
    min_break_minutes: i64,
    reviewer: RwLock<ProposalReviewer>,
    remote_statistics: RwLock<Option<ScheduleStatistics>>,
}

impl ReviewService {
    pub fn new(backend: Arc<dyn ScheduleBackend>, trainer_id: i64, min_break_minutes: i64) -> Self {
        Self {
            backend,
            trainer_id,
            min_break_minutes,
            reviewer: RwLock::new(ProposalReviewer::default()),
            remote_statistics: RwLock::new(Option::None),
        }
    }

    /// Replace the proposal list with a fresh fetch. The selection never
    /// survives a fetch.
    pub async fn fetch_proposals(&self) -> AppResult<Vec<ProposedEntry>> {
        let dto = self.backend.get_optimal_schedule(self.trainer_id).await?;

        info!(
            target: "app::review",
            trainer_id = self.trainer_id,
            entries = dto.proposed_entries.len(),
            "proposal list fetched"
        );

        *self
            .remote_statistics
            .write()
            .expect("statistics lock poisoned") = dto.statistics;

        let mut reviewer = self.reviewer.write().expect("reviewer lock poisoned");
        reviewer.load(dto.proposed_entries.clone());
        Ok(dto.proposed_entries)
    }

    pub fn toggle(&self, request_id: i64) {
        self.reviewer
            .write()
            .expect("reviewer lock poisoned")
            .toggle(request_id);
    }

    pub fn select_all(&self) {
        self.reviewer
            .write()
            .expect("reviewer lock poisoned")
            .select_all();
    }

    pub fn deselect_all(&self) {
        self.reviewer
            .write()
            .expect("reviewer lock poisoned")
            .deselect_all();
    }

    pub fn selected_request_ids(&self) -> Vec<i64> {
        self.reviewer
            .read()
            .expect("reviewer lock poisoned")
            .selected_request_ids()
    }

    pub fn stats(&self) -> ScheduleStatistics {
        self.reviewer
            .read()
            .expect("reviewer lock poisoned")
            .stats()
    }

    /// Statistics block as reported by the optimizer, for display beside
    /// the locally recomputed numbers.
    pub fn remote_statistics(&self) -> Option<ScheduleStatistics> {
        self.remote_statistics
            .read()
            .expect("statistics lock poisoned")
            .clone()
    }

    /// Advisory check of the selected subset against the confirmed
    /// calendar. The caller decides whether to proceed.
    pub fn precheck_selected(&self, confirmed: &[CalendarItem]) -> AppResult<Vec<ScheduleConflict>> {
        let selected = self
            .reviewer
            .read()
            .expect("reviewer lock poisoned")
            .selected_entries();
        check_conflicts(&selected, confirmed, self.min_break_minutes)
    }

    /// Advisory check of the full proposed set, independent of selection.
    pub fn precheck_all(&self, confirmed: &[CalendarItem]) -> AppResult<Vec<ScheduleConflict>> {
        let reviewer = self.reviewer.read().expect("reviewer lock poisoned");
        check_conflicts(reviewer.entries(), confirmed, self.min_break_minutes)
    }

    /// Server-side availability pre-check over the full proposal list.
    pub async fn remote_precheck(&self) -> AppResult<AvailabilityReport> {
        let entries = {
            let reviewer = self.reviewer.read().expect("reviewer lock poisoned");
            reviewer.entries().to_vec()
        };
        self.backend.check_availability_batch(&entries).await
    }

    /// Commit the selected entries, sequentially and independently.
    ///
    /// Each entry is applied with its own request; a rejection or a
    /// transport failure is recorded and the batch continues, because the
    /// remaining entries are still valid candidates. Applying strictly in
    /// order keeps the service-side re-validation running against the
    /// calendar as it stands after each prior commit. On completion the
    /// proposal list and selection are discarded: applied entries are no
    /// longer pending and failed ones need a fresh pre-check against the
    /// changed calendar.
    pub async fn apply_batch(&self) -> AppResult<CommitOutcome> {
        let selected = self.selected_request_ids();
        if selected.is_empty() {
            return Err(AppError::validation("没有选中的排期请求"));
        }

        info!(
            target: "app::review",
            count = selected.len(),
            "applying selected schedule entries"
        );

        let mut outcome = CommitOutcome::default();

        for request_id in selected {
            match self.backend.apply_proposed_entry(request_id).await {
                Ok(applied) => match applied.status {
                    ApplyStatus::Applied => {
                        debug!(target: "app::review", request_id, "entry applied");
                        outcome.applied_details.push(request_id);
                    }
                    ApplyStatus::Rejected => {
                        let reason = applied
                            .reason
                            .unwrap_or_else(|| "远端拒绝了该排期请求".to_string());
                        warn!(target: "app::review", request_id, %reason, "entry rejected");
                        outcome.failed_details.push(FailedCommit { request_id, reason });
                    }
                },
                Err(err) => {
                    let reason = err.to_string();
                    warn!(target: "app::review", request_id, %reason, "entry apply failed");
                    outcome.failed_details.push(FailedCommit { request_id, reason });
                }
            }
        }

        outcome.applied_count = outcome.applied_details.len();
        outcome.failed_count = outcome.failed_details.len();

        info!(
            target: "app::review",
            applied = outcome.applied_count,
            failed = outcome.failed_count,
            "batch commit finished, proposal list is stale"
        );

        // The snapshot no longer reflects the remote state either way.
        let mut reviewer = self.reviewer.write().expect("reviewer lock poisoned");
        reviewer.load(Vec::new());

        Ok(outcome)
    }
}
