use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub quotes_total: IntCounter,
    pub claims_total: IntCounterVec,
    pub dispatch_latency_seconds: HistogramVec,
    pub drivers_available: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let quotes_total = IntCounter::new("quotes_total", "Total quote requests served")
            .expect("valid quotes_total metric");

        let claims_total = IntCounterVec::new(
            Opts::new("claims_total", "Total driver claim attempts by outcome"),
            &["outcome"],
        )
        .expect("valid claims_total metric");

        let dispatch_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "dispatch_latency_seconds",
                "Latency of quote and confirm processing in seconds",
            ),
            &["operation"],
        )
        .expect("valid dispatch_latency_seconds metric");

        let drivers_available =
            IntGauge::new("drivers_available", "Drivers currently available for dispatch")
                .expect("valid drivers_available metric");

        registry
            .register(Box::new(quotes_total.clone()))
            .expect("register quotes_total");
        registry
            .register(Box::new(claims_total.clone()))
            .expect("register claims_total");
        registry
            .register(Box::new(dispatch_latency_seconds.clone()))
            .expect("register dispatch_latency_seconds");
        registry
            .register(Box::new(drivers_available.clone()))
            .expect("register drivers_available");

        Self {
            registry,
            quotes_total,
            claims_total,
            dispatch_latency_seconds,
            drivers_available,
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
