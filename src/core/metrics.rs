use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the process-wide recorder. Without it every metric below is discarded.
pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().metrics_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

/// Logs everything recorded so far; called once when the player exits.
pub(crate) fn flush() {
    if let Some(text) = render() {
        tracing::info!(metrics = %text, "Exam player metrics");
    }
}

pub(crate) fn record_submission(trigger: &'static str, status: &'static str, elapsed: Duration) {
    ::metrics::histogram!("exam_submission_duration_seconds").record(elapsed.as_secs_f64());
    ::metrics::counter!("exam_submissions_total", "trigger" => trigger, "status" => status)
        .increment(1);
}
