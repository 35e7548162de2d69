use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use anyhow::Result;
use tracing::info;
use std::sync::{Arc, OnceLock};

// Token store operations are synchronous, so the metrics handle is too.
static METRICS_INSTANCE: OnceLock<Arc<Metrics>> = OnceLock::new();

/// Lazily initializes and returns the process-wide `Metrics`.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| {
        info!("Initializing Metrics ...");
        Metrics::new()
    })
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Sign-in metrics
    pub sign_in_requests: IntCounter,
    pub sign_in_failures: IntCounter,
    pub sign_in_duration: Histogram,

    // Token store metrics
    pub token_pushes: IntCounter,
    pub active_subscriptions: IntGauge,

    // Request pipeline metrics
    pub decorated_requests: IntCounterVec,
    pub graphql_requests: IntCounterVec,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("tokenrelay".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Sign-in
            sign_in_requests: IntCounter::new("sign_in_requests_total", "Total sign-in attempts")
                .unwrap(),
            sign_in_failures: IntCounter::new("sign_in_failures_total", "Failed sign-in attempts")
                .unwrap(),
            sign_in_duration: Histogram::with_opts(
                HistogramOpts::new("sign_in_duration_seconds", "Sign-in duration seconds")
                    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            )
            .unwrap(),

            // Store
            token_pushes: IntCounter::new(
                "token_pushes_total",
                "Tokens broadcast by the token store",
            )
            .unwrap(),
            active_subscriptions: IntGauge::new(
                "active_subscriptions",
                "Observers currently registered on token stores",
            )
            .unwrap(),

            // Pipeline
            decorated_requests: IntCounterVec::new(
                Opts::new(
                    "decorated_requests_total",
                    "Requests passed through the auth decorator",
                ),
                &["authorized"],
            )
            .unwrap(),
            graphql_requests: IntCounterVec::new(
                Opts::new("graphql_requests_total", "GraphQL requests by outcome"),
                &["outcome"],
            )
            .unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.sign_in_requests.clone())).unwrap();
        reg.register(Box::new(metrics.sign_in_failures.clone())).unwrap();
        reg.register(Box::new(metrics.sign_in_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_pushes.clone())).unwrap();
        reg.register(Box::new(metrics.active_subscriptions.clone())).unwrap();
        reg.register(Box::new(metrics.decorated_requests.clone())).unwrap();
        reg.register(Box::new(metrics.graphql_requests.clone())).unwrap();

        metrics
    }
}

/// Render every registered metric in the Prometheus text exposition format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = get_metrics().registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::{encode_metrics, get_metrics};

    #[test]
    fn encoded_output_carries_namespace_and_counters() {
        get_metrics().token_pushes.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("tokenrelay_token_pushes_total"));
        assert!(text.contains("tokenrelay_sign_in_duration_seconds"));
    }
}
