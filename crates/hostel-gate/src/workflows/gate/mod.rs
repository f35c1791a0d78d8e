//! Gate decisions: explicit inside/outside transitions and the movement log.

pub mod domain;
pub mod service;

pub use domain::{Direction, GatePassage, MovementId, MovementLog, OccupancySummary};
pub use service::{GateError, GateService, DEFAULT_RECENT_MOVEMENTS};
