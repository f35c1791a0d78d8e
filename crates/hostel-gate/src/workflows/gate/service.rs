use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{Direction, GatePassage, MovementLog, OccupancySummary};
use crate::workflows::access::{AccessDenied, Actor, Capability};
use crate::workflows::leave::{current_approved_window, expire_active_outpass};
use crate::workflows::roster::{GateState, StudentView};
use crate::workflows::store::{HostelLedger, HostelStore, StoreError};

/// Movements shown on the occupancy dashboard when no limit is given.
pub const DEFAULT_RECENT_MOVEMENTS: usize = 10;

/// Gate decision engine. Each transition checks, flips state and logs in one unit of work.
pub struct GateService<S> {
    store: Arc<S>,
}

impl<S> GateService<S>
where
    S: HostelStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Let an inside student out, provided an approved leave or outpass covers `now`.
    pub fn request_exit(
        &self,
        actor: &Actor,
        student: &str,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<GatePassage, GateError> {
        actor.require(Capability::ToggleGate)?;

        self.store.write(|ledger| -> Result<_, GateError> {
            let record = ledger
                .student(student)
                .ok_or_else(|| GateError::StudentNotFound(student.trim().to_string()))?;
            let enrollment = record.enrollment_number.clone();

            if record.gate_state != GateState::Inside {
                return Err(GateError::InvalidTransition {
                    student: enrollment.to_string(),
                    state: record.gate_state,
                    attempted: Direction::Out,
                });
            }

            let authorization = match current_approved_window(ledger, &enrollment, now) {
                Some(request) => request.view(),
                None => {
                    warn!(student = %enrollment, "exit denied: no approved leave or outpass");
                    return Err(GateError::ExitDenied {
                        student: enrollment.to_string(),
                        at: now,
                    });
                }
            };

            let student_view = set_state(
                ledger,
                enrollment.as_str(),
                Direction::Out.resulting_state(),
                now,
            )?;
            let movement = ledger.append_movement(
                enrollment,
                Direction::Out,
                now,
                actor.id.clone(),
                note.trim().to_string(),
            );
            info!(student = %movement.student, request_id = %authorization.id, "student marked OUT");

            Ok(GatePassage {
                student: student_view,
                movement,
                authorized_by: Some(authorization),
                expired_outpasses: 0,
            })
        })
    }

    /// Let an outside student back in. Any approved outpass is closed at `now`.
    pub fn request_entry(
        &self,
        actor: &Actor,
        student: &str,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<GatePassage, GateError> {
        actor.require(Capability::ToggleGate)?;

        self.store.write(|ledger| -> Result<_, GateError> {
            let record = ledger
                .student(student)
                .ok_or_else(|| GateError::StudentNotFound(student.trim().to_string()))?;
            let enrollment = record.enrollment_number.clone();

            if record.gate_state != GateState::Outside {
                return Err(GateError::InvalidTransition {
                    student: enrollment.to_string(),
                    state: record.gate_state,
                    attempted: Direction::In,
                });
            }

            let student_view = set_state(
                ledger,
                enrollment.as_str(),
                Direction::In.resulting_state(),
                now,
            )?;
            let expired_outpasses = expire_active_outpass(ledger, &enrollment, now);
            let movement = ledger.append_movement(
                enrollment,
                Direction::In,
                now,
                actor.id.clone(),
                note.trim().to_string(),
            );
            info!(student = %movement.student, "student marked IN");

            Ok(GatePassage {
                student: student_view,
                movement,
                authorized_by: None,
                expired_outpasses,
            })
        })
    }

    /// Inside/outside headcount and the latest `limit` movements.
    pub fn occupancy(&self, actor: &Actor, limit: usize) -> Result<OccupancySummary, GateError> {
        actor.require_gate_staff()?;

        Ok(self.store.read(|ledger| {
            let inside_count = ledger.students().filter(|s| s.is_inside()).count();
            OccupancySummary {
                inside_count,
                outside_count: ledger.students().count() - inside_count,
                recent_movements: ledger.movements().take(limit).cloned().collect(),
            }
        })?)
    }

    /// Students currently in `state`, ordered by enrollment number.
    pub fn students_in(
        &self,
        actor: &Actor,
        state: GateState,
    ) -> Result<Vec<StudentView>, GateError> {
        actor.require_gate_staff()?;

        Ok(self.store.read(|ledger| {
            ledger
                .students()
                .filter(|student| student.gate_state == state)
                .map(StudentView::from)
                .collect()
        })?)
    }

    /// Movement history, newest first. Students may read their own.
    pub fn movements_for(
        &self,
        actor: &Actor,
        student: &str,
    ) -> Result<Vec<MovementLog>, GateError> {
        match &actor.student {
            Some(own) if own.matches(student) => {}
            _ => actor.require_gate_staff()?,
        }

        self.store.read(|ledger| -> Result<_, GateError> {
            let record = ledger
                .student(student)
                .ok_or_else(|| GateError::StudentNotFound(student.trim().to_string()))?;
            Ok(ledger
                .movements_for(&record.enrollment_number)
                .cloned()
                .collect())
        })?
    }
}

fn set_state(
    ledger: &mut HostelLedger,
    enrollment: &str,
    state: GateState,
    now: DateTime<Utc>,
) -> Result<StudentView, GateError> {
    let record = ledger
        .student_mut(enrollment)
        .ok_or_else(|| GateError::StudentNotFound(enrollment.to_string()))?;
    record.gate_state = state;
    record.updated_at = now;
    Ok(StudentView::from(&*record))
}

/// Error raised by the gate decision engine.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("exit denied for {student}: no approved leave or outpass covers {at}")]
    ExitDenied { student: String, at: DateTime<Utc> },
    #[error("student {student} is {} and cannot be marked {}", .state.label(), .attempted.label())]
    InvalidTransition {
        student: String,
        state: GateState,
        attempted: Direction,
    },
    #[error("student {0} not found")]
    StudentNotFound(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Store(#[from] StoreError),
}
