//! Metrics and tracing setup for cellstore.
//!
//! Provides a global [`NodeMetrics`] singleton backed by the `prometheus`
//! crate, plus an optional lightweight HTTP server for Prometheus scraping.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::OnceLock;

// ────────────────────────── Tracing ──────────────────────────

/// Initialize the tracing subscriber with env-filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

// ────────────────────────── Prometheus metrics ──────────────────────────

/// Global metrics instance.
static METRICS: OnceLock<NodeMetrics> = OnceLock::new();

/// Retrieve (or lazily create) the global metrics singleton.
pub fn metrics() -> &'static NodeMetrics {
    METRICS.get_or_init(NodeMetrics::new)
}

/// All Prometheus metrics for a cellstore tablet server.
pub struct NodeMetrics {
    pub registry: Registry,

    // ── RPC counters ──
    pub rpcs_received: IntCounter,
    pub rpcs_received_by_type: IntCounterVec,

    // ── RPC latency ──
    pub rpc_latency_secs: HistogramVec,

    // ── Table operation counters ──
    pub tables_created: IntCounter,
    pub row_puts: IntCounter,
    pub cell_reads: IntCounter,
}

// Manual Debug impl because prometheus types don't derive Debug.
impl std::fmt::Debug for NodeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMetrics").finish_non_exhaustive()
    }
}

/// Default histogram buckets (seconds) for RPC latency.
const LATENCY_BUCKETS: &[f64] = &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

impl NodeMetrics {
    fn new() -> Self {
        let registry = Registry::new();

        let rpcs_received = IntCounter::with_opts(Opts::new(
            "cellstore_rpcs_received_total",
            "Total inbound RPCs received",
        ))
        .expect("rpcs_received counter");

        let rpcs_received_by_type = IntCounterVec::new(
            Opts::new(
                "cellstore_rpcs_received_by_type_total",
                "Inbound RPCs received, by type",
            ),
            &["rpc_type"],
        )
        .expect("rpcs_received_by_type counter vec");

        let rpc_latency_secs = HistogramVec::new(
            HistogramOpts::new("cellstore_rpc_latency_seconds", "RPC latency in seconds")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["rpc_type"],
        )
        .expect("rpc_latency_secs histogram");

        let tables_created = IntCounter::with_opts(Opts::new(
            "cellstore_tables_created_total",
            "Tables created",
        ))
        .expect("tables_created counter");
        let row_puts = IntCounter::with_opts(Opts::new(
            "cellstore_row_puts_total",
            "Row mutations applied",
        ))
        .expect("row_puts counter");
        let cell_reads = IntCounter::with_opts(Opts::new(
            "cellstore_cell_reads_total",
            "Cell reads served",
        ))
        .expect("cell_reads counter");

        registry
            .register(Box::new(rpcs_received.clone()))
            .expect("register rpcs_received");
        registry
            .register(Box::new(rpcs_received_by_type.clone()))
            .expect("register rpcs_received_by_type");
        registry
            .register(Box::new(rpc_latency_secs.clone()))
            .expect("register rpc_latency_secs");
        registry
            .register(Box::new(tables_created.clone()))
            .expect("register tables_created");
        registry
            .register(Box::new(row_puts.clone()))
            .expect("register row_puts");
        registry
            .register(Box::new(cell_reads.clone()))
            .expect("register cell_reads");

        Self {
            registry,
            rpcs_received,
            rpcs_received_by_type,
            rpc_latency_secs,
            tables_created,
            row_puts,
            cell_reads,
        }
    }

    /// Count one inbound RPC of the given type.
    pub fn observe_rpc(&self, rpc_type: &str) {
        self.rpcs_received.inc();
        self.rpcs_received_by_type
            .with_label_values(&[rpc_type])
            .inc();
    }
}

/// Encode all registered metrics in Prometheus text exposition format.
pub fn encode_metrics() -> String {
    let m = metrics();
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&m.registry.gather(), &mut buf)
        .expect("prometheus text encoding");
    String::from_utf8(buf).expect("prometheus output is valid UTF-8")
}

/// Helper: start an RPC latency timer. Returns a guard that records
/// elapsed time on drop.
pub fn start_rpc_timer(rpc_type: &str) -> prometheus::HistogramTimer {
    metrics()
        .rpc_latency_secs
        .with_label_values(&[rpc_type])
        .start_timer()
}

// ────────────────────────── Metrics HTTP server ──────────────────────────

use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

async fn metrics_handler(
    _req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let body = encode_metrics();
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .expect("valid HTTP response"))
}

/// Serve Prometheus metrics on the given address (`GET /metrics`).
///
/// This spawns a lightweight HTTP/1.1 server. Call from a `tokio::spawn`.
pub async fn serve_metrics(
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("metrics server listening on http://{}/metrics", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(metrics_handler))
                .await
            {
                tracing::debug!("metrics connection error: {}", e);
            }
        });
    }
}

// ────────────────────────── Tests ──────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Histogram;

    #[test]
    fn test_metrics_init_and_increment() {
        let m = metrics();

        let before = m.rpcs_received.get();
        m.observe_rpc("create_table");
        m.observe_rpc("mutate_row");
        assert_eq!(m.rpcs_received.get(), before + 2);

        m.tables_created.inc();
        m.row_puts.inc();
        m.cell_reads.inc();
    }

    #[test]
    fn test_encode_metrics_format() {
        // Ensure at least one counter is incremented
        metrics().row_puts.inc();

        let output = encode_metrics();
        assert!(output.contains("cellstore_rpcs_received_total"));
        assert!(output.contains("cellstore_row_puts_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_histogram_records() {
        let m = metrics();

        m.rpc_latency_secs
            .with_label_values(&["test_rpc"])
            .observe(0.005);
        m.rpc_latency_secs
            .with_label_values(&["test_rpc"])
            .observe(0.010);

        let h: Histogram = m.rpc_latency_secs.with_label_values(&["test_rpc"]);
        assert_eq!(h.get_sample_count(), 2);
        assert!((h.get_sample_sum() - 0.015).abs() < 1e-9);
    }
}
