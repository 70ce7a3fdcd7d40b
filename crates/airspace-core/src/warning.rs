//! Per-airspace warning state machine.
//!
//! A warning is created on the first predicted or actual intrusion and lives
//! until its per-tick liveness check fails. Within one tick the four
//! prediction passes run in decreasing severity, so `update_solution` only
//! accepts states at or above the current one; `save_state` resets the
//! working state each tick and snapshots the previous one for edge-trigger
//! detection.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::airspace::AirspaceRef;
use crate::performance::InterceptSolution;

/// Warning severity, ascending. The ordinal encodes how confident and
/// imminent the predicted incursion is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WarningState {
    /// No active prediction.
    Clear,
    /// Intrusion predicted along the remaining task leg.
    Task,
    /// Intrusion predicted by the low-pass state filter.
    Filter,
    /// Intrusion predicted by straight glide extrapolation.
    Glide,
    /// Aircraft is inside the volume now.
    Inside,
}

/// Warning bookkeeping for one airspace.
#[derive(Debug, Clone)]
pub struct AirspaceWarning {
    airspace: AirspaceRef,
    state: WarningState,
    state_last: WarningState,
    solution: Option<InterceptSolution>,
    /// Remaining acknowledgement for predicted (non-inside) warnings, seconds.
    acktime_warning: f64,
    /// Remaining acknowledgement for inside warnings, seconds.
    acktime_inside: f64,
    /// Acknowledged for the whole session.
    ack_day: bool,
    expired: bool,
    expired_last: bool,
}

impl AirspaceWarning {
    pub fn new(airspace: AirspaceRef) -> Self {
        Self {
            airspace,
            state: WarningState::Clear,
            state_last: WarningState::Clear,
            solution: None,
            acktime_warning: 0.0,
            acktime_inside: 0.0,
            ack_day: false,
            expired: true,
            expired_last: true,
        }
    }

    pub fn airspace(&self) -> &AirspaceRef {
        &self.airspace
    }

    /// Whether this warning tracks the given airspace handle.
    pub fn is_for(&self, airspace: &AirspaceRef) -> bool {
        Arc::ptr_eq(&self.airspace, airspace)
    }

    pub fn state(&self) -> WarningState {
        self.state
    }

    pub fn solution(&self) -> Option<&InterceptSolution> {
        self.solution.as_ref()
    }

    /// Snapshot the pre-tick state and reset the working state. Runs once at
    /// the start of every manager tick, before the prediction passes.
    pub fn save_state(&mut self) {
        self.state_last = self.state;
        self.state = WarningState::Clear;
        self.expired_last = self.expired;
    }

    /// Whether an update at `state` would be applied. Higher severity wins
    /// within one tick; later lower-severity passes are silently ignored.
    pub fn state_accepted(&self, state: WarningState) -> bool {
        state >= self.state
    }

    /// Apply a prediction result if its severity is not below the current
    /// working state.
    pub fn update_solution(&mut self, state: WarningState, solution: InterceptSolution) {
        if self.state_accepted(state) {
            if state != self.state {
                trace!(airspace = self.airspace.name(), ?state, "warning state raised");
            }
            self.state = state;
            self.solution = Some(solution);
        }
    }

    /// Start (or cancel) the predicted-warning acknowledgement countdown.
    pub fn acknowledge_warning(&mut self, set: bool, duration: f64) {
        self.acktime_warning = if set { duration } else { 0.0 };
    }

    /// Start (or cancel) the inside-warning acknowledgement countdown.
    pub fn acknowledge_inside(&mut self, set: bool, duration: f64) {
        self.acktime_inside = if set { duration } else { 0.0 };
    }

    /// Pin (or release) a permanent session acknowledgement.
    pub fn acknowledge_day(&mut self, set: bool) {
        self.ack_day = set;
    }

    pub fn is_ack_day(&self) -> bool {
        self.ack_day
    }

    /// Whether the acknowledgement relevant to the current state has lapsed,
    /// i.e. the warning should (re)surface.
    pub fn is_ack_expired(&self) -> bool {
        if self.ack_day {
            return false;
        }
        match self.state {
            WarningState::Inside => self.acktime_inside <= 0.0,
            _ => self.acktime_warning <= 0.0,
        }
    }

    /// Whether the state machine took an edge the UI should report: a fresh
    /// warning, an upgrade to inside, or an acknowledgement running out.
    pub fn changed_state(&self) -> bool {
        if self.expired && !self.expired_last {
            return true;
        }
        if self.state_last == WarningState::Clear && self.state > WarningState::Clear {
            return self.is_ack_expired();
        }
        if self.state_last < WarningState::Inside && self.state == WarningState::Inside {
            return self.is_ack_expired();
        }
        false
    }

    /// Per-tick timer/expiry bookkeeping. Returns whether the warning is
    /// still live; a dead warning is purged from the list.
    pub fn warning_live(&mut self, dt: f64) -> bool {
        // downgrading from inside keeps the warning acknowledged for at
        // least the remaining inside acknowledgement
        if self.state != WarningState::Clear
            && self.state < self.state_last
            && self.state_last == WarningState::Inside
        {
            self.acktime_warning = self.acktime_warning.max(self.acktime_inside);
        }

        self.acktime_warning = (self.acktime_warning - dt).max(0.0);
        self.acktime_inside = (self.acktime_inside - dt).max(0.0);

        self.expired = self.is_ack_expired();
        if self.state == WarningState::Clear {
            self.expired_last = self.expired;
        }

        self.state != WarningState::Clear || !self.expired_last || self.ack_day
    }

    /// Ranking: least-acknowledged first, then most severe, then soonest.
    /// A missing solution sorts after any present one.
    pub fn ranking_cmp(&self, other: &Self) -> Ordering {
        other
            .is_ack_expired()
            .cmp(&self.is_ack_expired())
            .then_with(|| other.state.cmp(&self.state))
            .then_with(|| match (&self.solution, &other.solution) {
                (Some(a), Some(b)) => a.elapsed_time.total_cmp(&b.elapsed_time),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }
}
