//! # Metrics Collection
//!
//! Counters and histograms for authentication, CRL retrieval and issuance,
//! exported through Prometheus when a metrics port is configured. The
//! `metrics` macros are no-ops until a recorder is installed, so the record
//! functions are safe to call from tests.

use std::net::SocketAddr;
use std::sync::OnceLock;

use ::tracing::info;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

/// Metrics recorder that tracks application metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Record an authentication attempt by outcome
    pub fn record_authentication(&self, outcome: &str) {
        counter!("gatekeeper_authentications_total", "outcome" => outcome.to_string())
            .increment(1);
    }

    /// Record a CRL request by CA and outcome
    pub fn record_crl_request(&self, ca_name: &str, outcome: &str) {
        counter!(
            "gatekeeper_crl_requests_total",
            "ca" => ca_name.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }

    /// Record a finished issuance attempt by CA and terminal state
    pub fn record_issuance(&self, ca_name: &str, outcome: &str) {
        counter!(
            "gatekeeper_issuances_total",
            "ca" => ca_name.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }

    /// Record how long the provider took to report a certificate issued
    pub fn record_issuance_wait(&self, ca_name: &str, seconds: f64) {
        histogram!("gatekeeper_issuance_wait_seconds", "ca" => ca_name.to_string())
            .record(seconds);
    }

    fn describe(&self) {
        describe_counter!(
            "gatekeeper_authentications_total",
            Unit::Count,
            "Basic-auth attempts on the signing endpoint grouped by outcome"
        );
        describe_counter!(
            "gatekeeper_crl_requests_total",
            Unit::Count,
            "CRL requests grouped by CA and outcome"
        );
        describe_counter!(
            "gatekeeper_issuances_total",
            Unit::Count,
            "Certificate issuance attempts grouped by CA and terminal state"
        );
        describe_histogram!(
            "gatekeeper_issuance_wait_seconds",
            Unit::Seconds,
            "Time spent waiting for the provider to issue a certificate"
        );
    }
}

static METRICS: OnceLock<MetricsRecorder> = OnceLock::new();

/// Initialize the Prometheus exporter if a metrics port is configured
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    let Some(metrics_addr) = config.metrics_bind_address() else {
        return Ok(());
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    let recorder = METRICS.get_or_init(MetricsRecorder::new);
    recorder.describe();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}

fn recorder() -> &'static MetricsRecorder {
    METRICS.get_or_init(MetricsRecorder::new)
}

pub fn record_authentication(outcome: &str) {
    recorder().record_authentication(outcome);
}

pub fn record_crl_request(ca_name: &str, outcome: &str) {
    recorder().record_crl_request(ca_name, outcome);
}

pub fn record_issuance(ca_name: &str, outcome: &str) {
    recorder().record_issuance(ca_name, outcome);
}

pub fn record_issuance_wait(ca_name: &str, seconds: f64) {
    recorder().record_issuance_wait(ca_name, seconds);
}
