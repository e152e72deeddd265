//! Disputes over a deal's commission outcome.
//!
//! Disputes are a pure audit/workflow trail: resolving one never touches the
//! ledger or allocations. A resolution implying a monetary correction is
//! driven separately through a reversal or a new snapshot.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{DealId, TimeMs, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeType {
    Attribution,
    Amount,
    Role,
    Other,
}

impl DisputeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeType::Attribution => "ATTRIBUTION",
            DisputeType::Amount => "AMOUNT",
            DisputeType::Role => "ROLE",
            DisputeType::Other => "OTHER",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown dispute type: {0}")]
pub struct ParseDisputeTypeError(String);

impl FromStr for DisputeType {
    type Err = ParseDisputeTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ATTRIBUTION" => Ok(DisputeType::Attribution),
            "AMOUNT" => Ok(DisputeType::Amount),
            "ROLE" => Ok(DisputeType::Role),
            "OTHER" => Ok(DisputeType::Other),
            other => Err(ParseDisputeTypeError(other.to_string())),
        }
    }
}

impl std::fmt::Display for DisputeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Escalated,
    ResolvedApproved,
    ResolvedRejected,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Open => "OPEN",
            DisputeStatus::UnderReview => "UNDER_REVIEW",
            DisputeStatus::Escalated => "ESCALATED",
            DisputeStatus::ResolvedApproved => "RESOLVED_APPROVED",
            DisputeStatus::ResolvedRejected => "RESOLVED_REJECTED",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            DisputeStatus::ResolvedApproved | DisputeStatus::ResolvedRejected
        )
    }

    /// Whether the SLA clock still applies: only OPEN and UNDER_REVIEW
    /// disputes can be escalated on timeout.
    pub fn is_escalatable(&self) -> bool {
        matches!(self, DisputeStatus::Open | DisputeStatus::UnderReview)
    }

    /// The allowed workflow edges. OPEN and UNDER_REVIEW may resolve
    /// directly; ESCALATED can only resolve.
    pub fn can_transition_to(&self, next: DisputeStatus) -> bool {
        use DisputeStatus::*;
        matches!(
            (self, next),
            (Open, UnderReview)
                | (Open, Escalated)
                | (Open, ResolvedApproved)
                | (Open, ResolvedRejected)
                | (UnderReview, Escalated)
                | (UnderReview, ResolvedApproved)
                | (UnderReview, ResolvedRejected)
                | (Escalated, ResolvedApproved)
                | (Escalated, ResolvedRejected)
        )
    }
}

#[derive(Debug, Error)]
#[error("unknown dispute status: {0}")]
pub struct ParseDisputeStatusError(String);

impl FromStr for DisputeStatus {
    type Err = ParseDisputeStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(DisputeStatus::Open),
            "UNDER_REVIEW" => Ok(DisputeStatus::UnderReview),
            "ESCALATED" => Ok(DisputeStatus::Escalated),
            "RESOLVED_APPROVED" => Ok(DisputeStatus::ResolvedApproved),
            "RESOLVED_REJECTED" => Ok(DisputeStatus::ResolvedRejected),
            other => Err(ParseDisputeStatusError(other.to_string())),
        }
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    pub id: i64,
    pub deal_id: DealId,
    pub snapshot_id: Option<i64>,
    pub opener_id: UserId,
    pub against_user_id: Option<UserId>,
    pub dispute_type: DisputeType,
    pub status: DisputeStatus,
    pub sla_due_at: TimeMs,
    pub created_at: TimeMs,
    pub note: Option<String>,
    pub resolution_note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use DisputeStatus::*;
        assert!(Open.can_transition_to(UnderReview));
        assert!(Open.can_transition_to(Escalated));
        assert!(Open.can_transition_to(ResolvedApproved));
        assert!(UnderReview.can_transition_to(ResolvedRejected));
        assert!(Escalated.can_transition_to(ResolvedApproved));
    }

    #[test]
    fn test_forbidden_transitions() {
        use DisputeStatus::*;
        // No edges leave a resolved state, and nothing moves backwards.
        assert!(!ResolvedApproved.can_transition_to(Open));
        assert!(!ResolvedRejected.can_transition_to(Escalated));
        assert!(!Escalated.can_transition_to(UnderReview));
        assert!(!UnderReview.can_transition_to(Open));
        assert!(!Open.can_transition_to(Open));
    }

    #[test]
    fn test_escalatable() {
        assert!(DisputeStatus::Open.is_escalatable());
        assert!(DisputeStatus::UnderReview.is_escalatable());
        assert!(!DisputeStatus::Escalated.is_escalatable());
        assert!(!DisputeStatus::ResolvedApproved.is_escalatable());
    }

    #[test]
    fn test_status_round_trip() {
        for s in [
            DisputeStatus::Open,
            DisputeStatus::UnderReview,
            DisputeStatus::Escalated,
            DisputeStatus::ResolvedApproved,
            DisputeStatus::ResolvedRejected,
        ] {
            assert_eq!(DisputeStatus::from_str(s.as_str()).unwrap(), s);
        }
    }
}
