//! Prometheus metrics for the sync loop.
//!
//! The recorder is installed once by the binary. Before that, every
//! `record_*` helper is a no-op and `/metrics` answers 503.

use std::sync::OnceLock;
use std::time::Duration;

use leveling_sync_core::LogEvent;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Returns `true` if this call installed the recorder, `false` if it was
/// already initialized.
pub fn init_metrics() -> bool {
    let mut installed = false;
    PROMETHEUS_HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Failed to set global metrics recorder (already set)");
        } else {
            describe_metrics();
            installed = true;
            tracing::info!("Prometheus metrics initialized");
        }
        handle
    });
    installed
}

fn describe_metrics() {
    describe_counter!("sync_polls_total", "Log polls by outcome");
    describe_counter!("sync_bytes_read_total", "Bytes read from the game log");
    describe_counter!("sync_events_total", "Log events extracted, by kind");
    describe_counter!(
        "sync_steps_completed_total",
        "Checklist steps marked complete by the sync loop"
    );
    describe_histogram!("sync_poll_duration_seconds", "Duration of one poll in seconds");
    describe_gauge!("sync_active", "1 while a log file is being synced");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record one finished poll.
///
/// `outcome` is one of `idle`, `text`, `reset`, `malformed`, `error`.
pub fn record_poll(outcome: &'static str, bytes_read: u64, duration: Duration) {
    counter!("sync_polls_total", "outcome" => outcome).increment(1);
    if bytes_read > 0 {
        counter!("sync_bytes_read_total").increment(bytes_read);
    }
    histogram!("sync_poll_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_events(events: &[LogEvent]) {
    for event in events {
        counter!("sync_events_total", "kind" => event.kind()).increment(1);
    }
}

pub fn record_steps_completed(count: usize) {
    if count > 0 {
        counter!("sync_steps_completed_total").increment(count as u64);
    }
}

pub fn set_sync_active(active: bool) {
    gauge!("sync_active").set(if active { 1.0 } else { 0.0 });
}
