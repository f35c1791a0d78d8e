use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::workflows::access::ActorId;
use crate::workflows::gate::{Direction, MovementId, MovementLog};
use crate::workflows::leave::{LeaveRequest, LeaveRequestId};
use crate::workflows::roster::{EnrollmentNumber, Student};

/// Persisted records for students, their movements and their leave requests.
///
/// Readers get shared references; mutation is crate-private so that only the gate and
/// leave engines change gate state, request status and the movement log.
#[derive(Debug, Clone, Default)]
pub struct HostelLedger {
    students: BTreeMap<String, Student>,
    leave_requests: BTreeMap<LeaveRequestId, LeaveRequest>,
    movements: Vec<MovementLog>,
    last_leave_id: u64,
}

/// A second student with the same enrollment number (ignoring case).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateEnrollment(pub EnrollmentNumber);

impl HostelLedger {
    pub fn student(&self, raw: &str) -> Option<&Student> {
        self.students.get(&raw.trim().to_ascii_uppercase())
    }

    /// Every student, ordered by enrollment number.
    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    pub fn leave_request(&self, id: LeaveRequestId) -> Option<&LeaveRequest> {
        self.leave_requests.get(&id)
    }

    /// Every request, newest first.
    pub fn leave_requests(&self) -> impl Iterator<Item = &LeaveRequest> {
        self.leave_requests.values().rev()
    }

    /// A student's requests, newest first.
    pub fn requests_for<'a>(
        &'a self,
        student: &'a EnrollmentNumber,
    ) -> impl Iterator<Item = &'a LeaveRequest> + 'a {
        self.leave_requests()
            .filter(move |request| &request.student == student)
    }

    /// Movement history, newest first.
    pub fn movements(&self) -> impl Iterator<Item = &MovementLog> {
        self.movements.iter().rev()
    }

    pub fn movements_for<'a>(
        &'a self,
        student: &'a EnrollmentNumber,
    ) -> impl Iterator<Item = &'a MovementLog> + 'a {
        self.movements()
            .filter(move |movement| &movement.student == student)
    }

    pub(crate) fn insert_student(&mut self, student: Student) -> Result<(), DuplicateEnrollment> {
        match self.students.entry(student.enrollment_number.key()) {
            Entry::Occupied(existing) => Err(DuplicateEnrollment(
                existing.get().enrollment_number.clone(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(student);
                Ok(())
            }
        }
    }

    pub(crate) fn student_mut(&mut self, raw: &str) -> Option<&mut Student> {
        self.students.get_mut(&raw.trim().to_ascii_uppercase())
    }

    pub(crate) fn next_leave_id(&mut self) -> LeaveRequestId {
        self.last_leave_id += 1;
        LeaveRequestId(self.last_leave_id)
    }

    pub(crate) fn insert_leave_request(&mut self, request: LeaveRequest) -> &LeaveRequest {
        self.last_leave_id = self.last_leave_id.max(request.id.0);
        let id = request.id;
        self.leave_requests.insert(id, request);
        &self.leave_requests[&id]
    }

    pub(crate) fn leave_request_mut(&mut self, id: LeaveRequestId) -> Option<&mut LeaveRequest> {
        self.leave_requests.get_mut(&id)
    }

    pub(crate) fn leave_requests_mut(&mut self) -> impl Iterator<Item = &mut LeaveRequest> {
        self.leave_requests.values_mut()
    }

    /// Appends a movement; a timestamp earlier than the previous entry's is clamped forward.
    pub(crate) fn append_movement(
        &mut self,
        student: EnrollmentNumber,
        direction: Direction,
        timestamp: DateTime<Utc>,
        recorded_by: ActorId,
        note: String,
    ) -> MovementLog {
        let timestamp = match self.movements.last() {
            Some(previous) if previous.timestamp > timestamp => previous.timestamp,
            _ => timestamp,
        };
        let movement = MovementLog {
            id: MovementId(self.movements.len() as u64 + 1),
            student,
            direction,
            timestamp,
            recorded_by,
            note,
        };
        self.movements.push(movement.clone());
        movement
    }
}
