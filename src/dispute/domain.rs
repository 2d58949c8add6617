// Domain types - Pure, immutable, no side effects
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispute lifecycle. Straight line: open → investigating → resolved →
/// closed. A resolution exists exactly when the dispute has reached
/// resolved or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    Investigating,
    Resolved,
    Closed,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Open => "open",
            DisputeStatus::Investigating => "investigating",
            DisputeStatus::Resolved => "resolved",
            DisputeStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<DisputeStatus> {
        match s {
            "open" => Some(DisputeStatus::Open),
            "investigating" => Some(DisputeStatus::Investigating),
            "resolved" => Some(DisputeStatus::Resolved),
            "closed" => Some(DisputeStatus::Closed),
            _ => None,
        }
    }

    /// Transition: open → investigating (an admin picks it up).
    pub fn investigate(self) -> Result<DisputeStatus, DisputeError> {
        match self {
            DisputeStatus::Open => Ok(DisputeStatus::Investigating),
            other => Err(DisputeError::InvalidTransition {
                from: other,
                action: "investigate",
            }),
        }
    }

    /// Transition: investigating → resolved. The caller must carry a
    /// resolution; the repository persists both atomically.
    pub fn resolve(self) -> Result<DisputeStatus, DisputeError> {
        match self {
            DisputeStatus::Investigating => Ok(DisputeStatus::Resolved),
            other => Err(DisputeError::InvalidTransition {
                from: other,
                action: "resolve",
            }),
        }
    }

    /// Transition: resolved → closed. Closing an unresolved dispute is
    /// rejected so the resolution invariant can never break.
    pub fn close(self) -> Result<DisputeStatus, DisputeError> {
        match self {
            DisputeStatus::Resolved => Ok(DisputeStatus::Closed),
            other => Err(DisputeError::InvalidTransition {
                from: other,
                action: "close",
            }),
        }
    }

    pub fn has_resolution(&self) -> bool {
        matches!(self, DisputeStatus::Resolved | DisputeStatus::Closed)
    }
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the dispute is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeType {
    ServiceQuality,
    RefundRequest,
    NoShow,
    DamagedEquipment,
    Cancellation,
    Payment,
    Other,
}

impl DisputeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeType::ServiceQuality => "service_quality",
            DisputeType::RefundRequest => "refund_request",
            DisputeType::NoShow => "no_show",
            DisputeType::DamagedEquipment => "damaged_equipment",
            DisputeType::Cancellation => "cancellation",
            DisputeType::Payment => "payment",
            DisputeType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<DisputeType> {
        match s {
            "service_quality" => Some(DisputeType::ServiceQuality),
            "refund_request" => Some(DisputeType::RefundRequest),
            "no_show" => Some(DisputeType::NoShow),
            "damaged_equipment" => Some(DisputeType::DamagedEquipment),
            "cancellation" => Some(DisputeType::Cancellation),
            "payment" => Some(DisputeType::Payment),
            "other" => Some(DisputeType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisputeError {
    #[error("Cannot {action} a {from} dispute")]
    InvalidTransition {
        from: DisputeStatus,
        action: &'static str,
    },

    #[error("Dispute filing window has passed")]
    WindowClosed,

    #[error("A description is required")]
    DescriptionRequired,

    #[error("Only a party to the booking may file a dispute")]
    NotAParty,
}

/// The verdict an admin records when resolving a dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub decision: String,
    pub amount: Option<i64>,
    pub resolved_by: String,
    pub resolved_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: String,
    pub booking_id: String,
    pub filed_by: String,
    pub dispute_type: DisputeType,
    pub status: DisputeStatus,
    pub description: String,
    pub evidence: Vec<String>,
    pub resolution: Option<Resolution>,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_runs_the_full_line() {
        let status = DisputeStatus::Open;
        let status = status.investigate().unwrap();
        assert_eq!(status, DisputeStatus::Investigating);
        let status = status.resolve().unwrap();
        assert_eq!(status, DisputeStatus::Resolved);
        let status = status.close().unwrap();
        assert_eq!(status, DisputeStatus::Closed);
    }

    #[test]
    fn open_must_be_investigated_before_resolving() {
        assert!(matches!(
            DisputeStatus::Open.resolve(),
            Err(DisputeError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn cannot_close_without_resolving() {
        assert!(matches!(
            DisputeStatus::Open.close(),
            Err(DisputeError::InvalidTransition { .. })
        ));
        assert!(matches!(
            DisputeStatus::Investigating.close(),
            Err(DisputeError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn closed_rejects_everything() {
        assert!(DisputeStatus::Closed.investigate().is_err());
        assert!(DisputeStatus::Closed.resolve().is_err());
        assert!(DisputeStatus::Closed.close().is_err());
    }

    #[test]
    fn resolved_cannot_reopen() {
        assert!(DisputeStatus::Resolved.investigate().is_err());
        assert!(DisputeStatus::Resolved.resolve().is_err());
    }

    #[test]
    fn resolution_presence_matches_status() {
        assert!(!DisputeStatus::Open.has_resolution());
        assert!(!DisputeStatus::Investigating.has_resolution());
        assert!(DisputeStatus::Resolved.has_resolution());
        assert!(DisputeStatus::Closed.has_resolution());
    }

    #[test]
    fn dispute_type_round_trips() {
        for kind in [
            DisputeType::ServiceQuality,
            DisputeType::RefundRequest,
            DisputeType::NoShow,
            DisputeType::DamagedEquipment,
            DisputeType::Cancellation,
            DisputeType::Payment,
            DisputeType::Other,
        ] {
            assert_eq!(DisputeType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(DisputeType::parse("vibes"), None);
    }
}
