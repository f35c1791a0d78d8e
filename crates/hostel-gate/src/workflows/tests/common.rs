use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::GatePolicyConfig;
use crate::workflows::access::Actor;
use crate::workflows::leave::{LeaveApplication, LeaveRequest};
use crate::workflows::roster::{EnrollmentNumber, NewStudent, StudentProfile, StudyYear};
use crate::workflows::store::{HostelLedger, HostelStore, InMemoryHostelStore, StoreError};
use crate::workflows::HostelServices;

pub(super) type Services = HostelServices<InMemoryHostelStore>;

/// 2025-03-10 at the given UTC time.
pub(super) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    on(10, hour, minute)
}

pub(super) fn on(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn warden() -> Actor {
    Actor::warden("warden-1")
}

pub(super) fn supervisor() -> Actor {
    Actor::supervisor("supervisor-1")
}

pub(super) fn guard() -> Actor {
    Actor::guard("guard-1")
}

pub(super) fn student(enrollment: &str) -> Actor {
    Actor::student(EnrollmentNumber::parse(enrollment).expect("valid enrollment"))
}

pub(super) fn new_student(enrollment: &str, name: &str) -> NewStudent {
    NewStudent {
        enrollment_number: enrollment.to_string(),
        profile: StudentProfile {
            full_name: name.to_string(),
            course: "B.Tech CSE".to_string(),
            year: StudyYear::new(2).expect("valid year"),
            hostel_name: "Aravali".to_string(),
            room_number: "B-12".to_string(),
            ..StudentProfile::default()
        },
        gate_state: Default::default(),
        account: None,
    }
}

pub(super) fn build_services() -> Services {
    build_services_with(GatePolicyConfig::default())
}

/// Services over a fresh store holding S101, S102 and CS201, all inside.
pub(super) fn build_services_with(policy: GatePolicyConfig) -> Services {
    let services = HostelServices::new(Arc::new(InMemoryHostelStore::new()), policy);
    for (enrollment, name) in [
        ("S101", "Asha Rao"),
        ("S102", "Bharat Singh"),
        ("CS201", "Chitra Iyer"),
    ] {
        services
            .roster
            .register(&warden(), new_student(enrollment, name), on(1, 8, 0))
            .expect("seed student");
    }
    services
}

pub(super) fn leave_application(from: DateTime<Utc>, to: DateTime<Utc>) -> LeaveApplication {
    LeaveApplication {
        reason: "Family function".to_string(),
        destination: "Pune".to_string(),
        from_date: from,
        to_date: to,
    }
}

/// Files an outpass for `enrollment` at `now` and walks it through both approvals.
pub(super) fn approved_outpass(
    services: &Services,
    enrollment: &str,
    now: DateTime<Utc>,
) -> LeaveRequest {
    let outpass = services
        .leave
        .create_outpass(&student(enrollment), enrollment, now)
        .expect("outpass filed");
    services
        .leave
        .approve_step(&supervisor(), outpass.id, now)
        .expect("supervisor step");
    services
        .leave
        .approve_step(&warden(), outpass.id, now)
        .expect("warden step")
}

/// Store whose lock is never available.
pub(super) struct UnavailableStore;

impl HostelStore for UnavailableStore {
    fn read<T>(&self, _view: impl FnOnce(&HostelLedger) -> T) -> Result<T, StoreError> {
        Err(StoreError::Unavailable("maintenance".to_string()))
    }

    fn write<T, E>(
        &self,
        _work: impl FnOnce(&mut HostelLedger) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        Err(StoreError::Unavailable("maintenance".to_string()).into())
    }
}

pub(super) fn unavailable_services() -> HostelServices<UnavailableStore> {
    HostelServices::new(Arc::new(UnavailableStore), GatePolicyConfig::default())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
