use chrono::{DateTime, Utc};

/// Malformed or inconsistent input rejected before anything is stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("enrollment number must not be blank")]
    BlankEnrollment,
    #[error("full name must not be blank")]
    BlankName,
    #[error("year must be between 1 and 4 (found {0})")]
    YearOutOfRange(i64),
    #[error("reason must not be blank")]
    BlankReason,
    #[error("end date {to} must be after start date {from}")]
    InvertedWindow {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    #[error("outpass cutoff {cutoff} has already passed")]
    OutpassCutoffPassed { cutoff: DateTime<Utc> },
    #[error("unknown request status filter '{0}'")]
    UnknownStatusFilter(String),
}

pub(crate) fn ensure_window(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if to <= from {
        return Err(ValidationError::InvertedWindow { from, to });
    }
    Ok(())
}
