use crate::infra::parse_date;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Args;
use hostel_gate::config::{AppConfig, GatePolicyConfig};
use hostel_gate::error::AppError;
use hostel_gate::workflows::access::Actor;
use hostel_gate::workflows::gate::DEFAULT_RECENT_MOVEMENTS;
use hostel_gate::workflows::leave::{LeaveRequest, QueueFilter};
use hostel_gate::workflows::roster::{EnrollmentNumber, NewStudent, StudentProfile, StudyYear};
use hostel_gate::workflows::store::{HostelStore, InMemoryHostelStore};
use hostel_gate::workflows::HostelServices;
use std::sync::Arc;

const DEMO_ROSTER: [(&str, &str, &str); 3] = [
    ("S101", "Asha Rao", "B-12"),
    ("S102", "Bharat Singh", "B-14"),
    ("CS201", "Chitra Iyer", "C-03"),
];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Campus date to simulate (YYYY-MM-DD). Defaults to today on the campus clock.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Enrollment number of the student taking the outpass.
    #[arg(long, default_value = "S101")]
    pub(crate) student: String,
}

/// What the scripted walk-through observed.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct DemoOutcome {
    pub(crate) exit_denied_before_approval: bool,
    pub(crate) exited: bool,
    pub(crate) returned: bool,
    pub(crate) final_status: Option<&'static str>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let policy = AppConfig::load()?.gate;
    let day = args.date.unwrap_or_else(|| policy.campus_date(Utc::now()));

    println!("Hostel gate demo for {day}");
    let services = HostelServices::new(Arc::new(InMemoryHostelStore::new()), policy);
    let outcome = walk_through(&services, &policy, day, &args.student)?;

    println!(
        "\nSummary: denied before approval: {} | exited: {} | returned: {} | outpass now {}",
        outcome.exit_denied_before_approval,
        outcome.exited,
        outcome.returned,
        outcome.final_status.unwrap_or("missing")
    );
    Ok(())
}

pub(crate) fn walk_through<S>(
    services: &HostelServices<S>,
    policy: &GatePolicyConfig,
    day: NaiveDate,
    enrollment: &str,
) -> Result<DemoOutcome, AppError>
where
    S: HostelStore + 'static,
{
    let warden = Actor::warden("warden-demo");
    let supervisor = Actor::supervisor("supervisor-demo");
    let guard = Actor::guard("guard-demo");
    let time = |hour: u32, minute: u32| {
        let wall_clock = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        policy.campus_instant(day, wall_clock)
    };
    let mut outcome = DemoOutcome::default();

    for (enrollment_number, full_name, room_number) in DEMO_ROSTER {
        services.roster.register(
            &warden,
            NewStudent {
                enrollment_number: enrollment_number.to_string(),
                profile: StudentProfile {
                    full_name: full_name.to_string(),
                    course: "B.Tech".to_string(),
                    year: StudyYear::FIRST,
                    hostel_name: "Aravali".to_string(),
                    room_number: room_number.to_string(),
                    ..StudentProfile::default()
                },
                gate_state: Default::default(),
                account: None,
            },
            time(7, 0),
        )?;
    }
    println!("- Registered {} students, all inside", DEMO_ROSTER.len());

    let student = match EnrollmentNumber::parse(enrollment) {
        Ok(student) => Actor::student(student),
        Err(err) => {
            println!("  Invalid enrollment number: {err}");
            return Ok(outcome);
        }
    };

    let outpass = match services
        .leave
        .create_outpass(&student, enrollment, time(9, 0))
    {
        Ok(outpass) => outpass,
        Err(err) => {
            println!("  Outpass refused: {err}");
            return Ok(outcome);
        }
    };
    print_request("Outpass filed", &outpass);

    if let Err(err) = services
        .gate
        .request_exit(&guard, enrollment, "", time(9, 15))
    {
        outcome.exit_denied_before_approval = true;
        println!("- Gate before approval: {err}");
    }

    for approver in [&supervisor, &warden] {
        match services.leave.approve_step(approver, outpass.id, time(9, 30)) {
            Ok(request) => print_request(&format!("Approved by {}", approver.id), &request),
            Err(err) => {
                println!("  Approval failed: {err}");
                return Ok(outcome);
            }
        }
    }

    match services.lookup.gate_check(&guard, enrollment, time(10, 0)) {
        Ok(check) => println!(
            "- Gate lookup '{}': {} | approval on file: {}",
            check.query,
            check
                .student
                .as_ref()
                .map(|view| view.full_name.as_str())
                .unwrap_or("no exact match"),
            check.active_leave.is_some()
        ),
        Err(err) => println!("  Lookup unavailable: {err}"),
    }

    match services
        .gate
        .request_exit(&guard, enrollment, "city library", time(10, 0))
    {
        Ok(passage) => {
            outcome.exited = true;
            println!(
                "- {} marked {} at {}",
                passage.student.full_name,
                passage.movement.direction.label(),
                passage.movement.timestamp
            );
        }
        Err(err) => println!("  Exit refused: {err}"),
    }

    if let Ok(occupancy) = services.gate.occupancy(&guard, DEFAULT_RECENT_MOVEMENTS) {
        println!(
            "- Occupancy: {} inside / {} outside",
            occupancy.inside_count, occupancy.outside_count
        );
    }

    match services.gate.request_entry(&guard, enrollment, "", time(15, 0)) {
        Ok(passage) => {
            outcome.returned = true;
            println!(
                "- {} marked {} at {} ({} outpass closed)",
                passage.student.full_name,
                passage.movement.direction.label(),
                passage.movement.timestamp,
                passage.expired_outpasses
            );
        }
        Err(err) => println!("  Entry refused: {err}"),
    }

    if let Ok(request) = services.leave.request(outpass.id) {
        print_request("Outpass after return", &request);
        outcome.final_status = Some(request.status.label());
    }

    if let Ok(queue) = services.leave.approval_queue(&warden, QueueFilter::All) {
        println!(
            "- Warden dashboard: {} pending | {} approved | {} rejected",
            queue.pending_count, queue.approved_count, queue.rejected_count
        );
    }

    Ok(outcome)
}

fn print_request(label: &str, request: &LeaveRequest) {
    println!(
        "- {label}: #{} {} for {} [{}] {} -> {}",
        request.id,
        request.request_type.label(),
        request.student,
        request.status.label(),
        short(request.from_date),
        short(request.to_date)
    );
}

fn short(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}
