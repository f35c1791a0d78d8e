use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::domain::{
    ApprovalStamp, LeaveApplication, LeaveRequest, LeaveRequestId, LeaveRequestView, LeaveStatus,
    RequestType, DEFAULT_REJECTION_REASON, OUTPASS_REASON,
};
use crate::config::GatePolicyConfig;
use crate::workflows::access::{AccessDenied, Actor, Capability};
use crate::workflows::roster::{EnrollmentNumber, StudentView};
use crate::workflows::store::{HostelLedger, HostelStore, StoreError};
use crate::workflows::validation::{ensure_window, ValidationError};

const RECENT_REQUEST_WINDOW_HOURS: i64 = 48;

/// Leave lifecycle engine: creation, two-step approval, rejection and outpass expiry.
pub struct LeaveService<S> {
    store: Arc<S>,
    policy: GatePolicyConfig,
}

impl<S> LeaveService<S>
where
    S: HostelStore + 'static,
{
    pub fn new(store: Arc<S>, policy: GatePolicyConfig) -> Self {
        Self { store, policy }
    }

    /// File a multi-day leave. Any pending request of either type blocks a new one.
    pub fn create_leave(
        &self,
        actor: &Actor,
        student: &str,
        application: LeaveApplication,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, LeaveError> {
        let LeaveApplication {
            reason,
            destination,
            from_date,
            to_date,
        } = application;

        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(ValidationError::BlankReason.into());
        }
        ensure_window(from_date, to_date)?;

        self.store.write(|ledger| -> Result<_, LeaveError> {
            let enrollment = resolve_student(ledger, student)?;
            authorize_filing(actor, &enrollment)?;

            if ledger
                .requests_for(&enrollment)
                .any(|request| request.status == LeaveStatus::Pending)
            {
                return Err(LeaveConflict::PendingRequestExists(enrollment).into());
            }

            let request = LeaveRequest {
                id: ledger.next_leave_id(),
                student: enrollment,
                request_type: RequestType::Leave,
                reason,
                destination: destination.trim().to_string(),
                from_date,
                to_date,
                status: LeaveStatus::Pending,
                supervisor: None,
                warden: None,
                rejection_reason: None,
                created_at: now,
            };
            let stored = ledger.insert_leave_request(request).clone();
            info!(request_id = %stored.id, student = %stored.student, "leave request filed");
            Ok(stored)
        })
    }

    /// File a one-click outpass lasting from `now` until today's campus cutoff.
    ///
    /// Only a same-day outpass that is still pending or approved blocks a new one; pending
    /// leave requests do not.
    pub fn create_outpass(
        &self,
        actor: &Actor,
        student: &str,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, LeaveError> {
        let today = self.campus_date(now);
        let cutoff = self.outpass_cutoff(today);

        self.store.write(|ledger| -> Result<_, LeaveError> {
            let enrollment = resolve_student(ledger, student)?;
            authorize_filing(actor, &enrollment)?;

            let duplicate = ledger.requests_for(&enrollment).any(|request| {
                request.request_type == RequestType::Outpass
                    && self.campus_date(request.from_date) == today
                    && matches!(request.status, LeaveStatus::Pending | LeaveStatus::Approved)
            });
            if duplicate {
                return Err(LeaveConflict::OutpassAlreadyIssued {
                    student: enrollment,
                    day: today,
                }
                .into());
            }

            if cutoff <= now {
                return Err(ValidationError::OutpassCutoffPassed { cutoff }.into());
            }

            let request = LeaveRequest {
                id: ledger.next_leave_id(),
                student: enrollment,
                request_type: RequestType::Outpass,
                reason: OUTPASS_REASON.to_string(),
                destination: String::new(),
                from_date: now,
                to_date: cutoff,
                status: LeaveStatus::Pending,
                supervisor: None,
                warden: None,
                rejection_reason: None,
                created_at: now,
            };
            let stored = ledger.insert_leave_request(request).clone();
            info!(request_id = %stored.id, student = %stored.student, until = %stored.to_date, "outpass requested");
            Ok(stored)
        })
    }

    /// Take the next approval step: supervisor first, then warden, which approves the request.
    ///
    /// A fully approved request is returned unchanged. Rejected and expired requests refuse
    /// further approval.
    pub fn approve_step(
        &self,
        actor: &Actor,
        id: LeaveRequestId,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, LeaveError> {
        actor.require(Capability::ApproveLeave)?;

        self.store.write(|ledger| -> Result<_, LeaveError> {
            let request = ledger
                .leave_request_mut(id)
                .ok_or(LeaveError::NotFound(id))?;

            if request.status.is_terminal() {
                return Err(LeaveConflict::Closed {
                    id,
                    status: request.status,
                }
                .into());
            }

            let stamp = ApprovalStamp {
                actor: actor.id.clone(),
                at: now,
            };
            if request.supervisor.is_none() {
                request.supervisor = Some(stamp);
                info!(request_id = %id, approver = %actor.id, "supervisor approval recorded");
            } else if request.warden.is_none() {
                request.warden = Some(stamp);
                request.status = LeaveStatus::Approved;
                info!(request_id = %id, approver = %actor.id, "warden approval recorded, request approved");
            } else {
                debug!(request_id = %id, "request already fully approved");
            }

            Ok(request.clone())
        })
    }

    /// Reject a request whatever its approval progress. Rejecting twice is harmless.
    pub fn reject(
        &self,
        actor: &Actor,
        id: LeaveRequestId,
        reason: Option<&str>,
    ) -> Result<LeaveRequest, LeaveError> {
        actor.require(Capability::ApproveLeave)?;

        let reason = reason
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .unwrap_or(DEFAULT_REJECTION_REASON)
            .to_string();

        self.store.write(|ledger| -> Result<_, LeaveError> {
            let request = ledger
                .leave_request_mut(id)
                .ok_or(LeaveError::NotFound(id))?;
            request.status = LeaveStatus::Rejected;
            request.rejection_reason = Some(reason);
            info!(request_id = %id, rejected_by = %actor.id, "leave request rejected");
            Ok(request.clone())
        })
    }

    /// Close every approved outpass of the student at `now`. Returns how many were closed.
    pub fn expire_active_outpass(
        &self,
        student: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, LeaveError> {
        self.store.write(|ledger| -> Result<_, LeaveError> {
            let enrollment = resolve_student(ledger, student)?;
            Ok(expire_active_outpass(ledger, &enrollment, now))
        })
    }

    /// Approved request (leave or outpass) covering `now`, evaluated from stored timestamps.
    pub fn current_approved_window(
        &self,
        student: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<LeaveRequest>, LeaveError> {
        self.store.read(|ledger| -> Result<_, LeaveError> {
            let enrollment = resolve_student(ledger, student)?;
            Ok(current_approved_window(ledger, &enrollment, now).cloned())
        })?
    }

    pub fn request(&self, id: LeaveRequestId) -> Result<LeaveRequest, LeaveError> {
        self.store
            .read(|ledger| ledger.leave_request(id).cloned())?
            .ok_or(LeaveError::NotFound(id))
    }

    /// What a student sees on their dashboard.
    pub fn student_overview(
        &self,
        actor: &Actor,
        student: &str,
        now: DateTime<Utc>,
    ) -> Result<StudentOverview, LeaveError> {
        let today = self.campus_date(now);
        let recent_since = now - Duration::hours(RECENT_REQUEST_WINDOW_HOURS);

        self.store.read(|ledger| -> Result<_, LeaveError> {
            let enrollment = resolve_student(ledger, student)?;
            actor.require_owner_or(&enrollment, Capability::ApproveLeave)?;
            let record = ledger
                .student(enrollment.as_str())
                .ok_or_else(|| LeaveError::StudentNotFound(student.trim().to_string()))?;

            let active_leave = ledger
                .requests_for(&enrollment)
                .find(|request| request.request_type == RequestType::Leave && request.is_active(now))
                .map(LeaveRequest::view);

            let todays_outpass = ledger.requests_for(&enrollment).find(|request| {
                request.request_type == RequestType::Outpass
                    && request.status == LeaveStatus::Approved
                    && self.campus_date(request.from_date) == today
            });
            let (active_outpass, expired_outpass) = match todays_outpass {
                Some(outpass) if outpass.to_date < now => (None, Some(outpass.view())),
                Some(outpass) => (Some(outpass.view()), None),
                None => (None, None),
            };

            let recent_requests = ledger
                .requests_for(&enrollment)
                .filter(|request| request.created_at >= recent_since)
                .map(LeaveRequest::view)
                .collect();

            Ok(StudentOverview {
                student: StudentView::from(record),
                active_leave,
                active_outpass,
                expired_outpass,
                recent_requests,
            })
        })?
    }

    /// Requests awaiting (or past) review, newest first, with dashboard counts.
    ///
    /// Approvers without `ViewAllRequests` only ever see pending requests.
    pub fn approval_queue(
        &self,
        actor: &Actor,
        filter: QueueFilter,
    ) -> Result<ApprovalQueue, LeaveError> {
        actor.require(Capability::ApproveLeave)?;
        let filter = if actor.can(Capability::ViewAllRequests) {
            filter
        } else {
            QueueFilter::Status(LeaveStatus::Pending)
        };

        Ok(self.store.read(|ledger| {
            let count = |status: LeaveStatus| {
                ledger
                    .leave_requests()
                    .filter(|request| request.status == status)
                    .count()
            };

            ApprovalQueue {
                status_filter: filter.label(),
                requests: ledger
                    .leave_requests()
                    .filter(|request| filter.admits(request.status))
                    .map(LeaveRequest::view)
                    .collect(),
                pending_count: count(LeaveStatus::Pending),
                approved_count: count(LeaveStatus::Approved),
                rejected_count: count(LeaveStatus::Rejected),
            }
        })?)
    }

    fn campus_date(&self, at: DateTime<Utc>) -> NaiveDate {
        self.policy.campus_date(at)
    }

    fn outpass_cutoff(&self, day: NaiveDate) -> DateTime<Utc> {
        self.policy.outpass_cutoff(day)
    }
}

/// Newest-created approved request whose window covers `now`.
pub(crate) fn current_approved_window<'a>(
    ledger: &'a HostelLedger,
    student: &'a EnrollmentNumber,
    now: DateTime<Utc>,
) -> Option<&'a LeaveRequest> {
    ledger
        .requests_for(student)
        .find(|request| request.is_active(now))
}

pub(crate) fn expire_active_outpass(
    ledger: &mut HostelLedger,
    student: &EnrollmentNumber,
    now: DateTime<Utc>,
) -> usize {
    let mut expired = 0;
    for request in ledger.leave_requests_mut().filter(|request| {
        &request.student == student
            && request.request_type == RequestType::Outpass
            && request.status == LeaveStatus::Approved
    }) {
        request.status = LeaveStatus::Expired;
        request.to_date = now;
        expired += 1;
    }
    if expired > 0 {
        info!(student = %student, expired, "approved outpasses closed on return");
    }
    expired
}

fn resolve_student(ledger: &HostelLedger, raw: &str) -> Result<EnrollmentNumber, LeaveError> {
    ledger
        .student(raw)
        .map(|student| student.enrollment_number.clone())
        .ok_or_else(|| LeaveError::StudentNotFound(raw.trim().to_string()))
}

/// Students file for themselves; staff with roster rights may file on a student's behalf.
fn authorize_filing(actor: &Actor, student: &EnrollmentNumber) -> Result<(), AccessDenied> {
    match &actor.student {
        Some(_) => {
            actor.require(Capability::RequestLeave)?;
            actor.require_owner_or(student, Capability::ManageRoster)
        }
        None => actor.require(Capability::ManageRoster),
    }
}

/// Status filter applied to the approval queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueFilter {
    All,
    Status(LeaveStatus),
}

impl QueueFilter {
    /// Parses the dashboard query value; a missing or blank value means pending.
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(QueueFilter::default()),
            Some(value) if value.eq_ignore_ascii_case("all") => Ok(QueueFilter::All),
            Some(value) => LeaveStatus::parse(value)
                .map(QueueFilter::Status)
                .ok_or_else(|| ValidationError::UnknownStatusFilter(value.to_string())),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            QueueFilter::All => "all",
            QueueFilter::Status(status) => status.label(),
        }
    }

    fn admits(self, status: LeaveStatus) -> bool {
        match self {
            QueueFilter::All => true,
            QueueFilter::Status(wanted) => wanted == status,
        }
    }
}

impl Default for QueueFilter {
    fn default() -> Self {
        QueueFilter::Status(LeaveStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalQueue {
    pub status_filter: &'static str,
    pub requests: Vec<LeaveRequestView>,
    pub pending_count: usize,
    pub approved_count: usize,
    pub rejected_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentOverview {
    pub student: StudentView,
    pub active_leave: Option<LeaveRequestView>,
    pub active_outpass: Option<LeaveRequestView>,
    pub expired_outpass: Option<LeaveRequestView>,
    pub recent_requests: Vec<LeaveRequestView>,
}

/// A request that clashes with one already on file or with the request's own state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaveConflict {
    #[error("student {0} already has a pending request")]
    PendingRequestExists(EnrollmentNumber),
    #[error("student {student} already has an active or pending outpass for {day}")]
    OutpassAlreadyIssued {
        student: EnrollmentNumber,
        day: NaiveDate,
    },
    #[error("request {id} is {} and cannot be approved", .status.label())]
    Closed {
        id: LeaveRequestId,
        status: LeaveStatus,
    },
}

/// Error raised by the leave lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum LeaveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] LeaveConflict),
    #[error("leave request {0} not found")]
    NotFound(LeaveRequestId),
    #[error("student {0} not found")]
    StudentNotFound(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Store(#[from] StoreError),
}
