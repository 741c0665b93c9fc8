use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub claims_total: IntCounterVec,
    pub orders_pending: IntGauge,
    pub dispatch_latency_seconds: HistogramVec,
    pub notifications_sent_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let claims_total = IntCounterVec::new(
            Opts::new("claims_total", "Total order claim attempts by outcome"),
            &["outcome"],
        )
        .expect("valid claims_total metric");

        let orders_pending = IntGauge::new("orders_pending", "Orders currently awaiting a courier")
            .expect("valid orders_pending metric");

        let dispatch_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "dispatch_latency_seconds",
                "Latency of notification dispatch in seconds",
            ),
            &["outcome"],
        )
        .expect("valid dispatch_latency_seconds metric");

        let notifications_sent_total = IntCounterVec::new(
            Opts::new(
                "notifications_sent_total",
                "Per-recipient push send results",
            ),
            &["outcome"],
        )
        .expect("valid notifications_sent_total metric");

        registry
            .register(Box::new(claims_total.clone()))
            .expect("register claims_total");
        registry
            .register(Box::new(orders_pending.clone()))
            .expect("register orders_pending");
        registry
            .register(Box::new(dispatch_latency_seconds.clone()))
            .expect("register dispatch_latency_seconds");
        registry
            .register(Box::new(notifications_sent_total.clone()))
            .expect("register notifications_sent_total");

        Self {
            registry,
            claims_total,
            orders_pending,
            dispatch_latency_seconds,
            notifications_sent_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
