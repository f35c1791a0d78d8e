use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::access::{Actor, ActorId, CapabilitySet};
use super::gate::{GateError, DEFAULT_RECENT_MOVEMENTS};
use super::leave::{LeaveApplication, LeaveError, LeaveRequestId, QueueFilter};
use super::roster::{EnrollmentNumber, GateState, NewStudent, ProfileUpdate, RosterError};
use super::store::HostelStore;
use super::HostelServices;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_CAPABILITIES_HEADER: &str = "x-actor-capabilities";
pub const ACTOR_STUDENT_HEADER: &str = "x-actor-student";

/// Router builder exposing the roster, leave and gate operations over JSON.
pub fn hostel_router<S>(services: Arc<HostelServices<S>>) -> Router
where
    S: HostelStore + 'static,
{
    Router::new()
        .route("/api/v1/students", post(register_handler::<S>))
        .route("/api/v1/students/import", post(import_handler::<S>))
        .route("/api/v1/students/lookup", get(lookup_handler::<S>))
        .route(
            "/api/v1/students/:enrollment/profile",
            patch(profile_handler::<S>),
        )
        .route(
            "/api/v1/students/:enrollment/overview",
            get(overview_handler::<S>),
        )
        .route(
            "/api/v1/students/:enrollment/leave",
            post(create_leave_handler::<S>),
        )
        .route(
            "/api/v1/students/:enrollment/outpass",
            post(create_outpass_handler::<S>),
        )
        .route("/api/v1/check", post(presence_handler::<S>))
        .route("/api/v1/leave-requests", get(queue_handler::<S>))
        .route(
            "/api/v1/leave-requests/:request_id/approve",
            post(approve_handler::<S>),
        )
        .route(
            "/api/v1/leave-requests/:request_id/reject",
            post(reject_handler::<S>),
        )
        .route("/api/v1/gate/occupancy", get(occupancy_handler::<S>))
        .route("/api/v1/gate/students", get(gate_students_handler::<S>))
        .route("/api/v1/gate/:enrollment/exit", post(exit_handler::<S>))
        .route("/api/v1/gate/:enrollment/entry", post(entry_handler::<S>))
        .route(
            "/api/v1/gate/:enrollment/movements",
            get(movements_handler::<S>),
        )
        .with_state(services)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LookupParams {
    #[serde(default)]
    pub(crate) q: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueParams {
    pub(crate) status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OccupancyParams {
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GateStudentsParams {
    pub(crate) state: GateState,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PresenceRequest {
    pub(crate) enrollment_number: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectRequest {
    #[serde(default)]
    pub(crate) rejection_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GateNote {
    #[serde(default)]
    pub(crate) note: String,
}

/// Builds the actor from headers set by the upstream auth provider.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let header = |name: &'static str| header_value(headers, name);

    let id = header(ACTOR_ID_HEADER).ok_or_else(|| {
        error_response(StatusCode::UNAUTHORIZED, "missing x-actor-id header")
    })?;
    let capabilities = header(ACTOR_CAPABILITIES_HEADER)
        .map(CapabilitySet::parse_list)
        .unwrap_or_default();
    let student = match header(ACTOR_STUDENT_HEADER) {
        Some(raw) => Some(
            EnrollmentNumber::parse(raw)
                .map_err(|err| error_response(StatusCode::BAD_REQUEST, &err.to_string()))?,
        ),
        None => None,
    };

    Ok(Actor {
        id: ActorId(id.to_string()),
        capabilities,
        student,
    })
}

pub(crate) async fn register_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    headers: HeaderMap,
    Json(new_student): Json<NewStudent>,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services.roster.register(&actor, new_student, services.now()) {
        Ok(student) => (StatusCode::CREATED, Json(student)).into_response(),
        Err(error) => roster_error_response(error),
    }
}

pub(crate) async fn import_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    headers: HeaderMap,
    body: String,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let reader = Cursor::new(body.into_bytes());
    match services.roster.import_csv(&actor, reader, services.now()) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => roster_error_response(error),
    }
}

pub(crate) async fn lookup_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    headers: HeaderMap,
    Query(params): Query<LookupParams>,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services.lookup.gate_check(&actor, &params.q, services.now()) {
        Ok(check) => (StatusCode::OK, Json(check)).into_response(),
        Err(error) => roster_error_response(error),
    }
}

pub(crate) async fn presence_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    Json(request): Json<PresenceRequest>,
) -> Response
where
    S: HostelStore + 'static,
{
    match services.lookup.status(&request.enrollment_number) {
        Ok(status) if status.found => (StatusCode::OK, Json(status)).into_response(),
        Ok(status) => (StatusCode::NOT_FOUND, Json(status)).into_response(),
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string()),
    }
}

pub(crate) async fn profile_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    Path(enrollment): Path<String>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services
        .roster
        .update_profile(&actor, &enrollment, update, services.now())
    {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(error) => roster_error_response(error),
    }
}

pub(crate) async fn overview_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    Path(enrollment): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services
        .leave
        .student_overview(&actor, &enrollment, services.now())
    {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(error) => leave_error_response(error),
    }
}

pub(crate) async fn create_leave_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    Path(enrollment): Path<String>,
    headers: HeaderMap,
    Json(application): Json<LeaveApplication>,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services
        .leave
        .create_leave(&actor, &enrollment, application, services.now())
    {
        Ok(request) => (StatusCode::CREATED, Json(request.view())).into_response(),
        Err(error) => leave_error_response(error),
    }
}

pub(crate) async fn create_outpass_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    Path(enrollment): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services
        .leave
        .create_outpass(&actor, &enrollment, services.now())
    {
        Ok(request) => (StatusCode::CREATED, Json(request.view())).into_response(),
        Err(error) => leave_error_response(error),
    }
}

pub(crate) async fn queue_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    headers: HeaderMap,
    Query(params): Query<QueueParams>,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let filter = match QueueFilter::parse(params.status.as_deref()) {
        Ok(filter) => filter,
        Err(error) => return leave_error_response(LeaveError::Validation(error)),
    };
    match services.leave.approval_queue(&actor, filter) {
        Ok(queue) => (StatusCode::OK, Json(queue)).into_response(),
        Err(error) => leave_error_response(error),
    }
}

pub(crate) async fn approve_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    Path(request_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services
        .leave
        .approve_step(&actor, LeaveRequestId(request_id), services.now())
    {
        Ok(request) => (StatusCode::OK, Json(request.view())).into_response(),
        Err(error) => leave_error_response(error),
    }
}

pub(crate) async fn reject_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    Path(request_id): Path<u64>,
    headers: HeaderMap,
    body: Option<Json<RejectRequest>>,
) -> Response
where
    S: HostelStore + 'static,
{
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services.leave.reject(
        &actor,
        LeaveRequestId(request_id),
        body.rejection_reason.as_deref(),
    ) {
        Ok(request) => (StatusCode::OK, Json(request.view())).into_response(),
        Err(error) => leave_error_response(error),
    }
}

pub(crate) async fn occupancy_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    headers: HeaderMap,
    Query(params): Query<OccupancyParams>,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let limit = params.limit.unwrap_or(DEFAULT_RECENT_MOVEMENTS);
    match services.gate.occupancy(&actor, limit) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => gate_error_response(error),
    }
}

pub(crate) async fn gate_students_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    headers: HeaderMap,
    Query(params): Query<GateStudentsParams>,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services.gate.students_in(&actor, params.state) {
        Ok(students) => (StatusCode::OK, Json(students)).into_response(),
        Err(error) => gate_error_response(error),
    }
}

pub(crate) async fn movements_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    Path(enrollment): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: HostelStore + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services.gate.movements_for(&actor, &enrollment) {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
        Err(error) => gate_error_response(error),
    }
}

pub(crate) async fn exit_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    Path(enrollment): Path<String>,
    headers: HeaderMap,
    body: Option<Json<GateNote>>,
) -> Response
where
    S: HostelStore + 'static,
{
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services
        .gate
        .request_exit(&actor, &enrollment, &body.note, services.now())
    {
        Ok(passage) => (StatusCode::OK, Json(passage)).into_response(),
        Err(error) => gate_error_response(error),
    }
}

pub(crate) async fn entry_handler<S>(
    State(services): State<Arc<HostelServices<S>>>,
    Path(enrollment): Path<String>,
    headers: HeaderMap,
    body: Option<Json<GateNote>>,
) -> Response
where
    S: HostelStore + 'static,
{
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match services
        .gate
        .request_entry(&actor, &enrollment, &body.note, services.now())
    {
        Ok(passage) => (StatusCode::OK, Json(passage)).into_response(),
        Err(error) => gate_error_response(error),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn leave_error_response(error: LeaveError) -> Response {
    let status = match &error {
        LeaveError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LeaveError::Conflict(_) => StatusCode::CONFLICT,
        LeaveError::NotFound(_) | LeaveError::StudentNotFound(_) => StatusCode::NOT_FOUND,
        LeaveError::Forbidden(_) => StatusCode::FORBIDDEN,
        LeaveError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &error.to_string())
}

pub(crate) fn gate_error_response(error: GateError) -> Response {
    let status = match &error {
        GateError::ExitDenied { .. } | GateError::Forbidden(_) => StatusCode::FORBIDDEN,
        GateError::InvalidTransition { .. } => StatusCode::CONFLICT,
        GateError::StudentNotFound(_) => StatusCode::NOT_FOUND,
        GateError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &error.to_string())
}

pub(crate) fn roster_error_response(error: RosterError) -> Response {
    let status = match &error {
        RosterError::Validation(_) | RosterError::Csv(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RosterError::Duplicate(_) => StatusCode::CONFLICT,
        RosterError::NotFound(_) => StatusCode::NOT_FOUND,
        RosterError::Forbidden(_) => StatusCode::FORBIDDEN,
        RosterError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &error.to_string())
}
