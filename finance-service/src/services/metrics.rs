//! Prometheus metrics for finance-service.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Payment proof outcomes (approved / rejected).
pub static PROOFS_PROCESSED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_proofs_processed_total",
        "Total payment proofs processed by outcome",
        &["outcome"]
    )
    .expect("Failed to register proofs_processed_total")
});

/// Wallet ledger mutations by kind (credit, debit, void, edit, ...).
pub static WALLET_MUTATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_wallet_mutations_total",
        "Total wallet ledger mutations by kind",
        &["kind"]
    )
    .expect("Failed to register wallet_mutations_total")
});

/// Document-number allocation collisions (re-allocations, not failures).
pub static DOC_NUMBER_COLLISIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_doc_number_collisions_total",
        "Document number collisions that forced re-allocation",
        &["direction"]
    )
    .expect("Failed to register doc_number_collisions_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finance_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize metrics: force the lazy registrations and install the HTTP
/// middleware recorder. Safe to call more than once (tests spawn several
/// applications per process).
pub fn init_metrics() {
    Lazy::force(&PROOFS_PROCESSED_TOTAL);
    Lazy::force(&WALLET_MUTATIONS_TOTAL);
    Lazy::force(&DOC_NUMBER_COLLISIONS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);

    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            METRICS_HANDLE.set(handle).ok();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder already installed, reusing");
        }
    }
}

/// Render all metrics in Prometheus text format: the middleware recorder
/// output plus the custom registry.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if prometheus::Encoder::encode(&encoder, &metric_families, &mut buffer).is_ok() {
        if let Ok(custom) = String::from_utf8(buffer) {
            output.push_str(&custom);
        }
    }

    output
}
