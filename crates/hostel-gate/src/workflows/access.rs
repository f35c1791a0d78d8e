use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::roster::EnrollmentNumber;

/// Identifier issued by the external auth provider for whoever is acting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Discrete permissions checked by the core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// File leave and outpass requests.
    RequestLeave,
    /// Take supervisor or warden approval steps and reject requests.
    ApproveLeave,
    /// See requests in every status on the approval queue.
    ViewAllRequests,
    /// Authorize exits and entries at the gate.
    ToggleGate,
    /// Register, import and edit students.
    ManageRoster,
}

impl Capability {
    pub const fn label(self) -> &'static str {
        match self {
            Capability::RequestLeave => "request_leave",
            Capability::ApproveLeave => "approve_leave",
            Capability::ViewAllRequests => "view_all_requests",
            Capability::ToggleGate => "toggle_gate",
            Capability::ManageRoster => "manage_roster",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "request_leave" => Some(Capability::RequestLeave),
            "approve_leave" => Some(Capability::ApproveLeave),
            "view_all_requests" => Some(Capability::ViewAllRequests),
            "toggle_gate" => Some(Capability::ToggleGate),
            "manage_roster" => Some(Capability::ManageRoster),
            _ => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Capabilities that open the gate dashboards, lookups and movement history.
pub const GATE_STAFF: [Capability; 3] = [
    Capability::ToggleGate,
    Capability::ApproveLeave,
    Capability::ManageRoster,
];

/// Set of capabilities granted to an actor for the current call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Parses a comma separated header value, ignoring unknown entries.
    pub fn parse_list(raw: &str) -> Self {
        raw.split(',').filter_map(Capability::parse).collect()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Whoever invokes a core operation, with the capabilities the auth provider vouched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub capabilities: CapabilitySet,
    /// Student record linked to the actor's account, when the actor is a student.
    #[serde(default)]
    pub student: Option<EnrollmentNumber>,
}

impl Actor {
    pub fn new(id: impl Into<String>, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            id: ActorId(id.into()),
            capabilities: capabilities.into_iter().collect(),
            student: None,
        }
    }

    /// Student account that may only act on its own record.
    pub fn student(enrollment: EnrollmentNumber) -> Self {
        Self {
            id: ActorId(format!("student:{}", enrollment.as_str())),
            capabilities: [Capability::RequestLeave].into_iter().collect(),
            student: Some(enrollment),
        }
    }

    pub fn supervisor(id: impl Into<String>) -> Self {
        Self::new(id, [Capability::ApproveLeave])
    }

    pub fn warden(id: impl Into<String>) -> Self {
        Self::new(
            id,
            [
                Capability::ApproveLeave,
                Capability::ViewAllRequests,
                Capability::ManageRoster,
            ],
        )
    }

    pub fn guard(id: impl Into<String>) -> Self {
        Self::new(id, [Capability::ToggleGate])
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn require(&self, capability: Capability) -> Result<(), AccessDenied> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AccessDenied {
                actor: self.id.clone(),
                capability,
            })
        }
    }

    /// Guards, approvers and roster staff pass; students and anonymous callers do not.
    pub fn require_gate_staff(&self) -> Result<(), AccessDenied> {
        if GATE_STAFF.iter().any(|capability| self.can(*capability)) {
            Ok(())
        } else {
            Err(AccessDenied {
                actor: self.id.clone(),
                capability: Capability::ToggleGate,
            })
        }
    }

    /// Student accounts may only touch their own record; staff accounts need `fallback`.
    pub fn require_owner_or(
        &self,
        enrollment: &EnrollmentNumber,
        fallback: Capability,
    ) -> Result<(), AccessDenied> {
        match &self.student {
            Some(own) if own.matches(enrollment.as_str()) => Ok(()),
            _ => self.require(fallback),
        }
    }
}

/// Raised when an actor lacks the capability an operation needs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("actor {actor} lacks the {capability} capability")]
pub struct AccessDenied {
    pub actor: ActorId,
    pub capability: Capability,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_capability_header_lists() {
        let set = CapabilitySet::parse_list("toggle_gate, Approve_Leave,unknown");
        assert!(set.contains(Capability::ToggleGate));
        assert!(set.contains(Capability::ApproveLeave));
        assert!(!set.contains(Capability::ManageRoster));
    }

    #[test]
    fn student_actor_owns_only_its_record() {
        let actor = Actor::student(EnrollmentNumber::parse("CS101").expect("valid"));
        let own = EnrollmentNumber::parse("cs101").expect("valid");
        let other = EnrollmentNumber::parse("CS102").expect("valid");

        assert!(actor
            .require_owner_or(&own, Capability::ManageRoster)
            .is_ok());
        let denied = actor
            .require_owner_or(&other, Capability::ManageRoster)
            .expect_err("other students are off limits");
        assert_eq!(denied.capability, Capability::ManageRoster);
    }

    #[test]
    fn gate_staff_covers_guards_and_approvers_only() {
        assert!(Actor::guard("guard-1").require_gate_staff().is_ok());
        assert!(Actor::supervisor("supervisor-1").require_gate_staff().is_ok());
        assert!(Actor::warden("warden-1").require_gate_staff().is_ok());

        let student = Actor::student(EnrollmentNumber::parse("CS101").expect("valid"));
        let denied = student.require_gate_staff().expect_err("students are not staff");
        assert_eq!(denied.capability, Capability::ToggleGate);
        assert!(Actor::new("visitor", []).require_gate_staff().is_err());
    }
}
