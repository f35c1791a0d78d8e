use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::access::ActorId;
use crate::workflows::roster::EnrollmentNumber;

pub const OUTPASS_REASON: &str = "Outpass Request";
pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";

/// Sequential identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaveRequestId(pub u64);

impl fmt::Display for LeaveRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Same-day pass that lapses at the campus cutoff.
    Outpass,
    /// Multi-day leave over a caller supplied window.
    Leave,
}

impl RequestType {
    pub const fn label(self) -> &'static str {
        match self {
            RequestType::Outpass => "outpass",
            RequestType::Leave => "leave",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl LeaveStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
            LeaveStatus::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(LeaveStatus::Pending),
            "approved" => Some(LeaveStatus::Approved),
            "rejected" => Some(LeaveStatus::Rejected),
            "expired" => Some(LeaveStatus::Expired),
            _ => None,
        }
    }

    /// Rejected and expired requests accept no further approvals.
    pub const fn is_terminal(self) -> bool {
        matches!(self, LeaveStatus::Rejected | LeaveStatus::Expired)
    }
}

/// Who signed off on an approval step, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStamp {
    pub actor: ActorId,
    pub at: DateTime<Utc>,
}

/// Request for time off campus, moving through supervisor then warden approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: LeaveRequestId,
    pub student: EnrollmentNumber,
    pub request_type: RequestType,
    pub reason: String,
    pub destination: String,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub status: LeaveStatus,
    pub supervisor: Option<ApprovalStamp>,
    pub warden: Option<ApprovalStamp>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn supervisor_approved(&self) -> bool {
        self.supervisor.is_some()
    }

    pub fn warden_approved(&self) -> bool {
        self.warden.is_some()
    }

    /// Approved and `now` falls inside the window, both ends inclusive.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == LeaveStatus::Approved && self.from_date <= now && now <= self.to_date
    }

    pub fn view(&self) -> LeaveRequestView {
        LeaveRequestView {
            id: self.id,
            student: self.student.to_string(),
            request_type: self.request_type.label(),
            reason: self.reason.clone(),
            destination: self.destination.clone(),
            from_date: self.from_date,
            to_date: self.to_date,
            status: self.status.label(),
            supervisor_approved: self.supervisor_approved(),
            warden_approved: self.warden_approved(),
            rejection_reason: self.rejection_reason.clone(),
            created_at: self.created_at,
        }
    }
}

/// Fields collected from the manual leave form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveApplication {
    pub reason: String,
    #[serde(default)]
    pub destination: String,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
}

/// Flattened request representation for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaveRequestView {
    pub id: LeaveRequestId,
    pub student: String,
    pub request_type: &'static str,
    pub reason: String,
    pub destination: String,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub status: &'static str,
    pub supervisor_approved: bool,
    pub warden_approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(status: LeaveStatus) -> LeaveRequest {
        LeaveRequest {
            id: LeaveRequestId(1),
            student: EnrollmentNumber::parse("CS101").expect("valid"),
            request_type: RequestType::Leave,
            reason: "Family function".to_string(),
            destination: "Pune".to_string(),
            from_date: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            to_date: Utc.with_ymd_and_hms(2025, 3, 4, 18, 0, 0).unwrap(),
            status,
            supervisor: None,
            warden: None,
            rejection_reason: None,
            created_at: Utc.with_ymd_and_hms(2025, 2, 27, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn active_only_when_approved_and_inside_window() {
        let approved = request(LeaveStatus::Approved);
        assert!(approved.is_active(approved.from_date));
        assert!(approved.is_active(approved.to_date));
        assert!(!approved.is_active(approved.to_date + chrono::Duration::seconds(1)));
        assert!(!request(LeaveStatus::Pending).is_active(approved.from_date));
    }

    #[test]
    fn status_labels_round_trip_through_parse() {
        for status in [
            LeaveStatus::Pending,
            LeaveStatus::Approved,
            LeaveStatus::Rejected,
            LeaveStatus::Expired,
        ] {
            assert_eq!(LeaveStatus::parse(status.label()), Some(status));
        }
        assert_eq!(LeaveStatus::parse("all"), None);
    }
}
