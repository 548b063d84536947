//! Prometheus metrics for the Store and the canvas workflow.
//!
//! Counters are recorded through the `metrics` facade everywhere; nothing is
//! exported until [`install_prometheus`] installs a recorder.
//!
//! # Example
//!
//! ```rust,no_run
//! use plotgrid_runtime::metrics::install_prometheus;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! install_prometheus("0.0.0.0:9090".parse()?)?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build or install the exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime, and only once per process.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a recorder is already installed or the
/// listener cannot be set up.
pub fn install_prometheus(addr: SocketAddr) -> Result<(), MetricsError> {
    register_metrics();

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Register descriptions for every counter the workspace records.
pub fn register_metrics() {
    describe_counter!("store.actions.processed", "Actions reduced by a Store");
    describe_counter!("store.effects.executed", "Effects executed, labelled by effect type");
    describe_counter!(
        "canvas.selection.rejected",
        "Selections rejected because they overlap an existing plot"
    );
    describe_counter!("canvas.reservation.started", "Reservation attempts submitted");
    describe_counter!("canvas.reservation.committed", "Reservation attempts that minted a plot");
    describe_counter!(
        "canvas.reservation.failed",
        "Reservation attempts that failed, labelled by reason"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_without_recorder_is_harmless() {
        // No recorder installed: descriptions go to the no-op recorder
        register_metrics();
        register_metrics();
    }
}
