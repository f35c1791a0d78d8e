pub mod access;
pub mod gate;
pub mod leave;
pub mod roster;
pub mod router;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::GatePolicyConfig;
use gate::GateService;
use leave::LeaveService;
use roster::{Lookup, RosterService};
use store::HostelStore;

/// Source of "now" for the HTTP surface.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Every engine wired against one shared store.
pub struct HostelServices<S> {
    pub roster: RosterService<S>,
    pub lookup: Lookup<S>,
    pub leave: LeaveService<S>,
    pub gate: GateService<S>,
    clock: Clock,
}

impl<S> HostelServices<S>
where
    S: HostelStore + 'static,
{
    pub fn new(store: Arc<S>, policy: GatePolicyConfig) -> Self {
        Self {
            roster: RosterService::new(store.clone()),
            lookup: Lookup::new(store.clone(), policy.lookup_limit),
            leave: LeaveService::new(store.clone(), policy),
            gate: GateService::new(store),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(
        mut self,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
