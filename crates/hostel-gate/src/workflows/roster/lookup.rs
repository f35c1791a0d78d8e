use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Student, StudentView};
use super::service::RosterError;
use crate::workflows::access::Actor;
use crate::workflows::leave::{current_approved_window, LeaveRequestView};
use crate::workflows::store::{HostelLedger, HostelStore, StoreError};

/// Result of resolving what the gate officer typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Exact(Student),
    Candidates(Vec<Student>),
    Empty,
}

/// Lookup result plus the approval that would let the student out right now.
#[derive(Debug, Clone, Serialize)]
pub struct GateCheck {
    pub query: String,
    pub student: Option<StudentView>,
    pub candidates: Vec<StudentView>,
    pub active_leave: Option<LeaveRequestView>,
}

/// Machine-readable presence answer for a single enrollment number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceStatus {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_inside: Option<bool>,
}

/// Resolves enrollment numbers and partial names to students.
pub struct Lookup<S> {
    store: Arc<S>,
    limit: usize,
}

impl<S> Lookup<S>
where
    S: HostelStore + 'static,
{
    pub fn new(store: Arc<S>, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
        }
    }

    /// Exact enrollment match first, then a capped substring search over enrollment numbers
    /// and names. A single fuzzy hit is promoted to an exact match.
    pub fn resolve(&self, query: &str) -> Result<LookupOutcome, StoreError> {
        self.store
            .read(|ledger| resolve_in(ledger, query, self.limit))
    }

    /// `resolve` plus the approved window for an exact hit. Gate staff only.
    pub fn gate_check(
        &self,
        actor: &Actor,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<GateCheck, RosterError> {
        actor.require_gate_staff()?;

        Ok(self.store.read(|ledger| {
            let mut check = GateCheck {
                query: query.trim().to_string(),
                student: None,
                candidates: Vec::new(),
                active_leave: None,
            };

            match resolve_in(ledger, query, self.limit) {
                LookupOutcome::Exact(student) => {
                    check.active_leave =
                        current_approved_window(ledger, &student.enrollment_number, now)
                            .map(|request| request.view());
                    check.student = Some(StudentView::from(&student));
                }
                LookupOutcome::Candidates(students) => {
                    check.candidates = students.iter().map(StudentView::from).collect();
                }
                LookupOutcome::Empty => {}
            }

            check
        })?)
    }

    /// Exact, case-insensitive presence check; no fuzzy fallback.
    pub fn status(&self, enrollment: &str) -> Result<PresenceStatus, StoreError> {
        self.store.read(|ledger| match ledger.student(enrollment) {
            Some(student) => PresenceStatus {
                found: true,
                name: Some(student.full_name().to_string()),
                is_inside: Some(student.is_inside()),
            },
            None => PresenceStatus {
                found: false,
                name: None,
                is_inside: None,
            },
        })
    }
}

pub(crate) fn resolve_in(ledger: &HostelLedger, query: &str, limit: usize) -> LookupOutcome {
    let query = query.trim();
    if query.is_empty() {
        return LookupOutcome::Empty;
    }

    if let Some(student) = ledger.student(query) {
        return LookupOutcome::Exact(student.clone());
    }

    let needle = query.to_lowercase();
    let mut hits: Vec<Student> = ledger
        .students()
        .filter(|student| {
            student
                .enrollment_number
                .as_str()
                .to_lowercase()
                .contains(&needle)
                || student.full_name().to_lowercase().contains(&needle)
        })
        .take(limit)
        .cloned()
        .collect();

    match hits.len() {
        0 => LookupOutcome::Empty,
        1 => LookupOutcome::Exact(hits.remove(0)),
        _ => LookupOutcome::Candidates(hits),
    }
}
