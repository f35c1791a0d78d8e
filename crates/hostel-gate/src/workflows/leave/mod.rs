//! Leave and outpass requests: creation rules, supervisor/warden approval, expiry.

pub mod domain;
pub mod service;

pub use domain::{
    ApprovalStamp, LeaveApplication, LeaveRequest, LeaveRequestId, LeaveRequestView, LeaveStatus,
    RequestType, DEFAULT_REJECTION_REASON, OUTPASS_REASON,
};
pub(crate) use service::{current_approved_window, expire_active_outpass};
pub use service::{
    ApprovalQueue, LeaveConflict, LeaveError, LeaveService, QueueFilter, StudentOverview,
};
