use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::access::ActorId;
use crate::workflows::leave::LeaveRequestView;
use crate::workflows::roster::{EnrollmentNumber, GateState, StudentView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub const fn label(self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }

    /// Gate state a student is left in after passing in this direction.
    pub const fn resulting_state(self) -> GateState {
        match self {
            Direction::In => GateState::Inside,
            Direction::Out => GateState::Outside,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(pub u64);

/// Append-only audit entry for a single gate passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLog {
    pub id: MovementId,
    pub student: EnrollmentNumber,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
    pub recorded_by: ActorId,
    pub note: String,
}

/// Outcome of an authorized gate passage.
#[derive(Debug, Clone, Serialize)]
pub struct GatePassage {
    pub student: StudentView,
    pub movement: MovementLog,
    /// Request that authorized an exit; absent for entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized_by: Option<LeaveRequestView>,
    /// Outpasses closed early because the student came back.
    pub expired_outpasses: usize,
}

/// Headcount and recent traffic for the gate dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct OccupancySummary {
    pub inside_count: usize,
    pub outside_count: usize,
    pub recent_movements: Vec<MovementLog>,
}
