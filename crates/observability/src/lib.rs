use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Counters for the route flow. Every increment is mirrored to the global
/// `metrics` recorder, when one is installed.
#[derive(Debug, Default)]
pub struct FlowMetrics {
    queries_submitted: AtomicU64,
    pipeline_calls: AtomicU64,
    pipeline_failures: AtomicU64,
    stale_results: AtomicU64,
    regenerations: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowMetricsSnapshot {
    pub queries_submitted: u64,
    pub pipeline_calls: u64,
    pub pipeline_failures: u64,
    pub stale_results: u64,
    pub regenerations: u64,
    pub avg_latency_millis: f64,
}

impl FlowMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_query(&self, mode: &'static str) {
        self.queries_submitted.fetch_add(1, Ordering::Relaxed);
        counter!("wayfind_queries_submitted_total", "mode" => mode).increment(1);
    }

    pub fn observe_call(&self, call: &'static str, duration: Duration, succeeded: bool) {
        self.pipeline_calls.fetch_add(1, Ordering::Relaxed);
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        counter!("wayfind_pipeline_calls_total", "call" => call).increment(1);
        histogram!("wayfind_pipeline_latency_seconds", "call" => call)
            .record(duration.as_secs_f64());

        if !succeeded {
            self.pipeline_failures.fetch_add(1, Ordering::Relaxed);
            counter!("wayfind_pipeline_failures_total", "call" => call).increment(1);
        }
    }

    pub fn inc_stale(&self, event: &'static str) {
        self.stale_results.fetch_add(1, Ordering::Relaxed);
        counter!("wayfind_stale_results_total", "event" => event).increment(1);
    }

    pub fn inc_regeneration(&self) {
        self.regenerations.fetch_add(1, Ordering::Relaxed);
        counter!("wayfind_regenerations_total").increment(1);
    }

    pub fn snapshot(&self) -> FlowMetricsSnapshot {
        let calls = self.pipeline_calls.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        FlowMetricsSnapshot {
            queries_submitted: self.queries_submitted.load(Ordering::Relaxed),
            pipeline_calls: calls,
            pipeline_failures: self.pipeline_failures.load(Ordering::Relaxed),
            stale_results: self.stale_results.load(Ordering::Relaxed),
            regenerations: self.regenerations.load(Ordering::Relaxed),
            avg_latency_millis: if calls == 0 {
                0.0
            } else {
                latency as f64 / calls as f64
            },
        }
    }
}

/// Installs the JSON subscriber once per process. Output goes to stderr so
/// command output on stdout stays machine-readable.
pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,wayfind_clients=info,wayfind_flow=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
