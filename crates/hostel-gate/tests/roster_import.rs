//! Roster import through the HTTP router, mirroring how wardens upload spreadsheets.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use hostel_gate::config::GatePolicyConfig;
use hostel_gate::workflows::router::{hostel_router, ACTOR_CAPABILITIES_HEADER, ACTOR_ID_HEADER};
use hostel_gate::workflows::store::InMemoryHostelStore;
use hostel_gate::workflows::HostelServices;

const ROSTER: &str = "\
Enrollment Number,Full Name,Course,Year,Room,Phone,Hostel
CS101,Asha Rao,B.Tech CSE,2,B-12,9000000001,Aravali
CS102,Vikram Shah,B.Tech CSE,two,B-14
,Missing Enrollment
CS103
";

fn import_request(capabilities: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/students/import")
        .header(ACTOR_ID_HEADER, "warden-1")
        .header(ACTOR_CAPABILITIES_HEADER, capabilities)
        .body(Body::from(ROSTER))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn import_reports_created_rows_and_issues() {
    let services = Arc::new(HostelServices::new(
        Arc::new(InMemoryHostelStore::new()),
        GatePolicyConfig::default(),
    ));
    let router = hostel_router(services.clone());

    let response = router
        .clone()
        .oneshot(import_request("manage_roster"))
        .await
        .expect("import");
    assert_eq!(response.status(), StatusCode::OK);
    let summary = json_body(response).await;
    assert_eq!(summary["created"], 2);
    assert_eq!(summary["updated"], 0);
    assert_eq!(summary["skipped"], 3);
    assert_eq!(summary["issues"].as_array().map(Vec::len), Some(2));

    let asha = services.roster.student("cs101").expect("imported");
    assert_eq!(asha.profile.hostel_name, "Aravali");
    assert_eq!(asha.profile.year.get(), 2);
    assert!(asha.is_inside());

    let second = router
        .oneshot(import_request("manage_roster"))
        .await
        .expect("re-import");
    let summary = json_body(second).await;
    assert_eq!(summary["created"], 0);
    assert_eq!(summary["updated"], 2);
}

#[tokio::test]
async fn import_without_roster_rights_is_forbidden() {
    let services = Arc::new(HostelServices::new(
        Arc::new(InMemoryHostelStore::new()),
        GatePolicyConfig::default(),
    ));
    let router = hostel_router(services.clone());

    let response = router
        .oneshot(import_request("approve_leave"))
        .await
        .expect("import");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(services.roster.student("CS101").is_err());
}
