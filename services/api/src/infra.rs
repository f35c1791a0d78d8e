use chrono::{DateTime, NaiveDate, Utc};
use hostel_gate::error::AppError;
use hostel_gate::workflows::access::{Actor, Capability};
use hostel_gate::workflows::roster::ImportSummary;
use hostel_gate::workflows::store::HostelStore;
use hostel_gate::workflows::HostelServices;
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Actor used for roster loads started from the command line.
pub(crate) fn roster_loader() -> Actor {
    Actor::new("system:roster-loader", [Capability::ManageRoster])
}

pub(crate) fn load_roster<S>(
    services: &HostelServices<S>,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<ImportSummary, AppError>
where
    S: HostelStore + 'static,
{
    let reader = BufReader::new(File::open(path)?);
    let summary = services.roster.import_csv(&roster_loader(), reader, now)?;
    for issue in &summary.issues {
        warn!(line = issue.line, detail = %issue.detail, "roster row needs attention");
    }
    info!(
        path = %path.display(),
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        "roster loaded"
    );
    Ok(summary)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostel_gate::config::GatePolicyConfig;
    use hostel_gate::workflows::store::InMemoryHostelStore;
    use std::io::Write;

    #[test]
    fn parse_date_reports_bad_input() {
        assert!(parse_date("2025-03-10").is_ok());
        let err = parse_date("10/03/2025").expect_err("wrong format");
        assert!(err.contains("10/03/2025"));
    }

    #[test]
    fn load_roster_reads_csv_files() {
        let path = std::env::temp_dir().join(format!(
            "hostel-gate-roster-{}.csv",
            std::process::id()
        ));
        let mut file = File::create(&path).expect("create roster");
        writeln!(file, "CS101,Asha Rao,B.Tech CSE,2").expect("write roster");
        drop(file);

        let services = HostelServices::new(
            Arc::new(InMemoryHostelStore::new()),
            GatePolicyConfig::default(),
        );
        let summary = load_roster(&services, &path, Utc::now()).expect("roster loads");
        std::fs::remove_file(&path).ok();

        assert_eq!(summary.created, 1);
        assert!(services.roster.student("CS101").is_ok());
    }

    #[test]
    fn missing_roster_file_is_an_io_error() {
        let services = HostelServices::new(
            Arc::new(InMemoryHostelStore::new()),
            GatePolicyConfig::default(),
        );
        let err = load_roster(&services, Path::new("/nonexistent/roster.csv"), Utc::now())
            .expect_err("missing file");
        assert!(matches!(err, AppError::Io(_)));
    }
}
