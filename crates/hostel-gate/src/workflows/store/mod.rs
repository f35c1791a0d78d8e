//! Entity store shared by the roster, leave and gate engines.
//!
//! Every engine operation runs as one `read` or `write` unit of work. `write` holds the
//! store exclusively for the duration of the closure, so "check approval window, flip gate
//! state, append movement" and the two-step approval updates cannot interleave with another
//! writer. Closures validate before they mutate; an `Err` leaves the ledger untouched.

mod ledger;

use std::sync::{Arc, Mutex};

pub use ledger::{DuplicateEnrollment, HostelLedger};

/// Storage abstraction so engines can be exercised against failing or seeded stores.
pub trait HostelStore: Send + Sync {
    fn read<T>(&self, view: impl FnOnce(&HostelLedger) -> T) -> Result<T, StoreError>;

    fn write<T, E>(
        &self,
        work: impl FnOnce(&mut HostelLedger) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Process-local store guarded by a mutex.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHostelStore {
    ledger: Arc<Mutex<HostelLedger>>,
}

impl InMemoryHostelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: HostelLedger) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }
}

impl HostelStore for InMemoryHostelStore {
    fn read<T>(&self, view: impl FnOnce(&HostelLedger) -> T) -> Result<T, StoreError> {
        let guard = self
            .ledger
            .lock()
            .map_err(|_| StoreError::Unavailable("ledger lock poisoned".to_string()))?;
        Ok(view(&guard))
    }

    fn write<T, E>(
        &self,
        work: impl FnOnce(&mut HostelLedger) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut guard = self
            .ledger
            .lock()
            .map_err(|_| StoreError::Unavailable("ledger lock poisoned".to_string()))?;
        work(&mut guard)
    }
}
