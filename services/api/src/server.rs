use crate::cli::ServeArgs;
use crate::infra::{load_roster, AppState};
use crate::routes::with_gate_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use hostel_gate::config::AppConfig;
use hostel_gate::error::AppError;
use hostel_gate::telemetry;
use hostel_gate::workflows::store::InMemoryHostelStore;
use hostel_gate::workflows::HostelServices;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryHostelStore::new());
    let services = HostelServices::new(store, config.gate);
    if let Some(path) = args.roster.take() {
        load_roster(&services, &path, Utc::now())?;
    }

    let app = with_gate_routes(Arc::new(services))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cutoff_hour = config.gate.outpass_cutoff_hour,
        "hostel gate service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
