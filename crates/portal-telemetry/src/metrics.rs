//! Prometheus metrics for the portal.
//!
//! All metrics follow the naming convention: `sl_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., bills_submitted_total)
//! - **Gauge**: Value sampled at scrape time (e.g., notifications_delivered)
//! - **Histogram**: Distribution of values (e.g., http_request_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // HTTP
    // =========================================================================

    /// Requests served, by method and status code
    pub static ref HTTP_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("sl_http_requests_total", "HTTP requests served"),
        &["method", "status"]
    ).expect("metric creation failed");

    /// Request latency by method
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "sl_http_request_duration_seconds",
            "Time from request received to response produced"
        ).buckets(exponential_buckets(0.0005, 2.0, 14).expect("bucket layout")),
        &["method"]
    ).expect("metric creation failed");

    /// Failed logins (unknown email, wrong password, disabled account)
    pub static ref LOGIN_FAILURES: IntCounter = IntCounter::new(
        "sl_auth_login_failures_total",
        "Rejected login attempts"
    ).expect("metric creation failed");

    // =========================================================================
    // DOMAIN
    // =========================================================================

    /// Every event published on the bus, by event name
    pub static ref PORTAL_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("sl_events_total", "Domain events published on the event bus"),
        &["event"]
    ).expect("metric creation failed");

    pub static ref BILLS_SUBMITTED: IntCounter = IntCounter::new(
        "sl_billing_bills_submitted_total",
        "Bills submitted by clients"
    ).expect("metric creation failed");

    pub static ref PAYMENTS_REQUESTED: IntCounter = IntCounter::new(
        "sl_payments_requests_total",
        "Payment requests raised by clients"
    ).expect("metric creation failed");

    pub static ref DOCUMENTS_UPLOADED: IntCounter = IntCounter::new(
        "sl_dfs_documents_uploaded_total",
        "Documents uploaded to the forwarding system"
    ).expect("metric creation failed");

    pub static ref DOCUMENTS_FORWARDED: IntCounter = IntCounter::new(
        "sl_dfs_documents_forwarded_total",
        "Document hand-overs between staff members"
    ).expect("metric creation failed");

    pub static ref AGREEMENTS_SIGNED: IntCounter = IntCounter::new(
        "sl_agreements_signed_total",
        "Agreements signed by clients"
    ).expect("metric creation failed");

    /// Notifications written since start-up, sampled from the service
    pub static ref NOTIFICATIONS_DELIVERED: IntGauge = IntGauge::new(
        "sl_notifications_delivered",
        "Notifications delivered to inboxes since start-up"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless: collectors that are already
/// registered are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // HTTP
        Box::new(HTTP_REQUESTS.clone()),
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(LOGIN_FAILURES.clone()),
        // Domain
        Box::new(PORTAL_EVENTS.clone()),
        Box::new(BILLS_SUBMITTED.clone()),
        Box::new(PAYMENTS_REQUESTED.clone()),
        Box::new(DOCUMENTS_UPLOADED.clone()),
        Box::new(DOCUMENTS_FORWARDED.clone()),
        Box::new(AGREEMENTS_SIGNED.clone()),
        Box::new(NOTIFICATIONS_DELIVERED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Count a bus event by name, plus its dedicated counter if it has one.
pub fn record_event(name: &str) {
    PORTAL_EVENTS.with_label_values(&[name]).inc();
    match name {
        "bill_submitted" => BILLS_SUBMITTED.inc(),
        "payment_requested" => PAYMENTS_REQUESTED.inc(),
        "document_uploaded" => DOCUMENTS_UPLOADED.inc(),
        "document_forwarded" => DOCUMENTS_FORWARDED.inc(),
        "agreement_signed" => AGREEMENTS_SIGNED.inc(),
        _ => {}
    }
}

/// Record one finished HTTP request.
pub fn record_http(method: &str, status: u16, seconds: f64) {
    HTTP_REQUESTS
        .with_label_values(&[method, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method])
        .observe(seconds);
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
