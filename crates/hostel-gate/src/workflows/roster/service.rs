use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::domain::{EnrollmentNumber, NewStudent, ProfileUpdate, Student};
use super::import::{parse_roster, ImportSummary};
use crate::workflows::access::{AccessDenied, Actor, Capability};
use crate::workflows::store::{HostelStore, StoreError};
use crate::workflows::validation::ValidationError;

/// Staff-facing roster maintenance: registration, bulk import and profile edits.
pub struct RosterService<S> {
    store: Arc<S>,
}

impl<S> RosterService<S>
where
    S: HostelStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn register(
        &self,
        actor: &Actor,
        new_student: NewStudent,
        now: DateTime<Utc>,
    ) -> Result<Student, RosterError> {
        actor.require(Capability::ManageRoster)?;

        let NewStudent {
            enrollment_number,
            mut profile,
            gate_state,
            account,
        } = new_student;
        let enrollment_number = EnrollmentNumber::parse(&enrollment_number)?;
        profile.full_name = profile.full_name.trim().to_string();
        if profile.full_name.is_empty() {
            return Err(ValidationError::BlankName.into());
        }

        let student = Student {
            enrollment_number,
            profile,
            gate_state,
            account,
            created_at: now,
            updated_at: now,
        };

        self.store.write(|ledger| -> Result<_, RosterError> {
            ledger
                .insert_student(student.clone())
                .map_err(|duplicate| RosterError::Duplicate(duplicate.0))?;
            info!(student = %student.enrollment_number, "student registered");
            Ok(student)
        })
    }

    /// Upsert students by enrollment number from a header-less CSV roster.
    pub fn import_csv<R: Read>(
        &self,
        actor: &Actor,
        reader: R,
        now: DateTime<Utc>,
    ) -> Result<ImportSummary, RosterError> {
        actor.require(Capability::ManageRoster)?;
        let parsed = parse_roster(reader)?;

        self.store.write(|ledger| -> Result<_, RosterError> {
            let mut summary = ImportSummary {
                skipped: parsed.skipped,
                issues: parsed.issues,
                ..ImportSummary::default()
            };

            for row in parsed.rows {
                debug!(line = row.line, student = %row.enrollment, "applying roster row");
                if let Some(existing) = ledger.student_mut(row.enrollment.as_str()) {
                    existing.profile.full_name = row.full_name;
                    row.details.apply(&mut existing.profile);
                    existing.updated_at = now;
                    summary.updated += 1;
                    continue;
                }

                let mut student = Student {
                    enrollment_number: row.enrollment,
                    profile: Default::default(),
                    gate_state: Default::default(),
                    account: None,
                    created_at: now,
                    updated_at: now,
                };
                student.profile.full_name = row.full_name;
                row.details.apply(&mut student.profile);
                if ledger.insert_student(student).is_ok() {
                    summary.created += 1;
                }
            }

            info!(
                created = summary.created,
                updated = summary.updated,
                skipped = summary.skipped,
                "roster import finished"
            );
            Ok(summary)
        })
    }

    /// Students edit their own contact details; roster staff may edit anyone's.
    pub fn update_profile(
        &self,
        actor: &Actor,
        student: &str,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Student, RosterError> {
        self.store.write(|ledger| -> Result<_, RosterError> {
            let record = ledger
                .student_mut(student)
                .ok_or_else(|| RosterError::NotFound(student.trim().to_string()))?;
            actor.require_owner_or(&record.enrollment_number, Capability::ManageRoster)?;
            update.apply(&mut record.profile);
            record.updated_at = now;
            Ok(record.clone())
        })
    }

    pub fn student(&self, enrollment: &str) -> Result<Student, RosterError> {
        self.store
            .read(|ledger| ledger.student(enrollment).cloned())?
            .ok_or_else(|| RosterError::NotFound(enrollment.trim().to_string()))
    }
}

/// Error raised by roster maintenance.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("student {0} is already registered")]
    Duplicate(EnrollmentNumber),
    #[error("student {0} not found")]
    NotFound(String),
    #[error("invalid roster CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Store(#[from] StoreError),
}
