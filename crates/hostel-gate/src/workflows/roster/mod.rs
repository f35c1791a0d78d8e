//! Student roster: identity and profile records, lookup at the gate, and bulk import.

pub mod domain;
pub(crate) mod import;
pub mod lookup;
pub mod service;

pub use domain::{
    AccountId, EnrollmentNumber, GateState, NewStudent, ProfileUpdate, Student, StudentProfile,
    StudentView, StudyYear,
};
pub use import::{ImportSummary, RowIssue};
pub use lookup::{GateCheck, Lookup, LookupOutcome, PresenceStatus};
pub use service::{RosterError, RosterService};
