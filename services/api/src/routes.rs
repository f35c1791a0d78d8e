use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use hostel_gate::workflows::router::hostel_router;
use hostel_gate::workflows::store::HostelStore;
use hostel_gate::workflows::HostelServices;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_gate_routes<S>(services: Arc<HostelServices<S>>) -> axum::Router
where
    S: HostelStore + 'static,
{
    hostel_router(services)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use hostel_gate::config::GatePolicyConfig;
    use hostel_gate::workflows::router::{ACTOR_CAPABILITIES_HEADER, ACTOR_ID_HEADER};
    use hostel_gate::workflows::store::InMemoryHostelStore;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    fn app(state: AppState) -> axum::Router {
        let services = Arc::new(HostelServices::new(
            Arc::new(InMemoryHostelStore::new()),
            GatePolicyConfig::default(),
        ));
        with_gate_routes(services).layer(Extension(state))
    }

    #[tokio::test]
    async fn readiness_tracks_the_flag() {
        let state = app_state(false);
        let response = app(state.clone())
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.readiness.store(true, Ordering::Release);
        let response = app(state)
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn gate_routes_sit_beside_health() {
        let router = app(app_state(true));

        let health = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let anonymous = router
            .clone()
            .oneshot(
                Request::get("/api/v1/gate/occupancy")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let occupancy = router
            .oneshot(
                Request::get("/api/v1/gate/occupancy")
                    .header(ACTOR_ID_HEADER, "guard-1")
                    .header(ACTOR_CAPABILITIES_HEADER, "toggle_gate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(occupancy.status(), StatusCode::OK);
    }
}
