//! Period locks: temporal freezes over the settlement timeline.

use serde::Serialize;

use crate::domain::{TimeMs, UserId};

/// A global (deal-independent) freeze of the inclusive interval
/// [period_from, period_to]. While active, every approval, payout, and
/// reversal whose effective time falls inside the interval is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodLock {
    pub id: i64,
    pub period_from: TimeMs,
    pub period_to: TimeMs,
    pub reason: String,
    pub is_active: bool,
    pub created_by: UserId,
    pub created_at: TimeMs,
    pub unlocked_at: Option<TimeMs>,
    pub unlocked_by: Option<UserId>,
}

impl PeriodLock {
    /// Inclusive interval containment.
    pub fn covers(&self, at: TimeMs) -> bool {
        self.period_from <= at && at <= self.period_to
    }

    /// Inclusive interval intersection with another lock's range.
    pub fn overlaps(&self, from: TimeMs, to: TimeMs) -> bool {
        self.period_from <= to && from <= self.period_to
    }
}
