use std::thread;

use super::common::*;

use crate::workflows::access::Actor;
use crate::workflows::gate::{Direction, GateError};
use crate::workflows::leave::LeaveStatus;
use crate::workflows::roster::GateState;

#[test]
fn outpass_round_trip_expires_the_pass_on_return() {
    let services = build_services();
    let outpass = approved_outpass(&services, "S101", at(9, 0));

    let exit = services
        .gate
        .request_exit(&guard(), "s101", "market", at(10, 0))
        .expect("exit allowed");
    assert_eq!(exit.student.gate_state, "outside");
    assert_eq!(exit.movement.direction, Direction::Out);
    assert_eq!(exit.movement.note, "market");
    assert_eq!(exit.authorized_by.map(|view| view.id), Some(outpass.id));

    let entry = services
        .gate
        .request_entry(&guard(), "S101", "", at(15, 0))
        .expect("entry allowed");
    assert_eq!(entry.student.gate_state, "inside");
    assert_eq!(entry.expired_outpasses, 1);
    assert!(entry.authorized_by.is_none());

    let stored = services.leave.request(outpass.id).expect("stored");
    assert_eq!(stored.status, LeaveStatus::Expired);
    assert_eq!(stored.to_date, at(15, 0));

    let history: Vec<_> = services
        .gate
        .movements_for(&guard(), "S101")
        .expect("history")
        .into_iter()
        .map(|movement| (movement.direction, movement.timestamp))
        .collect();
    assert_eq!(
        history,
        vec![(Direction::In, at(15, 0)), (Direction::Out, at(10, 0))]
    );
}

#[test]
fn exit_without_approval_is_denied_and_changes_nothing() {
    let services = build_services();
    services
        .leave
        .create_outpass(&student("S101"), "S101", at(9, 0))
        .expect("pending outpass only");

    let err = services
        .gate
        .request_exit(&guard(), "S101", "", at(10, 0))
        .expect_err("no approved window");
    assert!(matches!(err, GateError::ExitDenied { ref student, .. } if student == "S101"));

    let record = services.roster.student("S101").expect("student");
    assert_eq!(record.gate_state, GateState::Inside);
    assert!(services
        .gate
        .movements_for(&guard(), "S101")
        .expect("history")
        .is_empty());
}

#[test]
fn exit_outside_the_window_is_denied() {
    let services = build_services();
    approved_outpass(&services, "S101", at(9, 0));

    let err = services
        .gate
        .request_exit(&guard(), "S101", "", at(20, 1))
        .expect_err("outpass lapsed at cutoff");
    assert!(matches!(err, GateError::ExitDenied { .. }));
}

#[test]
fn transitions_follow_the_recorded_gate_state() {
    let services = build_services();
    approved_outpass(&services, "S101", at(9, 0));

    let err = services
        .gate
        .request_entry(&guard(), "S101", "", at(9, 30))
        .expect_err("already inside");
    assert!(matches!(
        err,
        GateError::InvalidTransition {
            state: GateState::Inside,
            attempted: Direction::In,
            ..
        }
    ));

    services
        .gate
        .request_exit(&guard(), "S101", "", at(10, 0))
        .expect("exit");
    let err = services
        .gate
        .request_exit(&guard(), "S101", "", at(10, 5))
        .expect_err("already outside");
    assert!(matches!(
        err,
        GateError::InvalidTransition {
            state: GateState::Outside,
            attempted: Direction::Out,
            ..
        }
    ));
}

#[test]
fn returning_on_a_leave_keeps_the_leave_approved() {
    let services = build_services();
    let leave = services
        .leave
        .create_leave(
            &student("S102"),
            "S102",
            leave_application(on(10, 6, 0), on(12, 18, 0)),
            on(9, 12, 0),
        )
        .expect("leave filed");
    services
        .leave
        .approve_step(&supervisor(), leave.id, on(9, 13, 0))
        .expect("supervisor");
    services
        .leave
        .approve_step(&warden(), leave.id, on(9, 14, 0))
        .expect("warden");

    services
        .gate
        .request_exit(&guard(), "S102", "home", on(10, 7, 0))
        .expect("exit on leave");
    let entry = services
        .gate
        .request_entry(&guard(), "S102", "", on(11, 19, 0))
        .expect("early return");
    assert_eq!(entry.expired_outpasses, 0);

    let stored = services.leave.request(leave.id).expect("stored");
    assert_eq!(stored.status, LeaveStatus::Approved);
    assert_eq!(stored.to_date, on(12, 18, 0));
}

#[test]
fn only_gate_staff_toggle_the_gate() {
    let services = build_services();
    approved_outpass(&services, "S101", at(9, 0));

    let err = services
        .gate
        .request_exit(&student("S101"), "S101", "", at(10, 0))
        .expect_err("students cannot let themselves out");
    assert!(matches!(err, GateError::Forbidden(_)));

    let err = services
        .gate
        .request_exit(&guard(), "NOPE", "", at(10, 0))
        .expect_err("unknown student");
    assert!(matches!(err, GateError::StudentNotFound(_)));
}

#[test]
fn occupancy_counts_inside_and_outside() {
    let services = build_services();
    approved_outpass(&services, "S101", at(9, 0));
    services
        .gate
        .request_exit(&guard(), "S101", "", at(10, 0))
        .expect("exit");

    let summary = services.gate.occupancy(&guard(), 10).expect("occupancy");
    assert_eq!(summary.inside_count, 2);
    assert_eq!(summary.outside_count, 1);
    assert_eq!(summary.recent_movements.len(), 1);

    let outside: Vec<_> = services
        .gate
        .students_in(&warden(), GateState::Outside)
        .expect("outside")
        .into_iter()
        .map(|view| view.enrollment_number)
        .collect();
    assert_eq!(outside, vec!["S101".to_string()]);

    let inside = services.gate.students_in(&supervisor(), GateState::Inside).expect("inside");
    assert_eq!(inside.len(), 2);
}

#[test]
fn store_outage_blocks_gate_decisions() {
    let services = unavailable_services();

    let err = services
        .gate
        .request_exit(&guard(), "S101", "", at(10, 0))
        .expect_err("store down");
    assert!(matches!(err, GateError::Store(_)));
    assert!(matches!(services.gate.occupancy(&guard(), 10), Err(GateError::Store(_))));
}

#[test]
fn gate_reads_are_for_staff_and_the_student_themselves() {
    let services = build_services();
    approved_outpass(&services, "S101", at(9, 0));
    services
        .gate
        .request_exit(&guard(), "S101", "clinic", at(10, 0))
        .expect("exit");

    assert!(matches!(
        services.gate.occupancy(&student("S101"), 10),
        Err(GateError::Forbidden(_))
    ));
    assert!(matches!(
        services.gate.students_in(&student("S101"), GateState::Outside),
        Err(GateError::Forbidden(_))
    ));
    assert!(matches!(
        services.gate.movements_for(&student("S102"), "S101"),
        Err(GateError::Forbidden(_))
    ));

    let own = services
        .gate
        .movements_for(&student("S101"), "s101")
        .expect("own history");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].note, "clinic");
}

#[test]
fn concurrent_gate_requests_move_the_student_once() {
    let services = build_services();
    approved_outpass(&services, "S101", at(9, 0));

    let exits: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|n| {
                let services = &services;
                scope.spawn(move || {
                    services.gate.request_exit(
                        &Actor::guard(format!("guard-{n}")),
                        "S101",
                        "",
                        at(10, 0),
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("exit thread"))
            .collect()
    });
    assert_eq!(exits.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(exits
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|err| matches!(err, GateError::InvalidTransition { .. })));

    let entries: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|n| {
                let services = &services;
                scope.spawn(move || {
                    services.gate.request_entry(
                        &Actor::guard(format!("guard-{n}")),
                        "S101",
                        "",
                        at(15, 0),
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("entry thread"))
            .collect()
    });
    assert_eq!(entries.iter().filter(|outcome| outcome.is_ok()).count(), 1);

    let history = services
        .gate
        .movements_for(&guard(), "S101")
        .expect("history");
    let directions: Vec<_> = history.iter().map(|movement| movement.direction).collect();
    assert_eq!(directions, vec![Direction::In, Direction::Out]);
}
