use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub requests_created_total: IntCounter,
    pub transitions_total: IntCounterVec,
    pub pickup_requests: IntGauge,
    pub active_sessions: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_created_total = IntCounter::new(
            "pickup_requests_created_total",
            "Total pickup requests scheduled",
        )
        .expect("valid pickup_requests_created_total metric");

        let transitions_total = IntCounterVec::new(
            Opts::new(
                "pickup_transitions_total",
                "Status transitions by transition and outcome",
            ),
            &["transition", "outcome"],
        )
        .expect("valid pickup_transitions_total metric");

        let pickup_requests = IntGauge::new("pickup_requests", "Pickup requests held in the store")
            .expect("valid pickup_requests metric");

        let active_sessions = IntGauge::new("active_sessions", "Currently logged-in sessions")
            .expect("valid active_sessions metric");

        registry
            .register(Box::new(requests_created_total.clone()))
            .expect("register pickup_requests_created_total");
        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register pickup_transitions_total");
        registry
            .register(Box::new(pickup_requests.clone()))
            .expect("register pickup_requests");
        registry
            .register(Box::new(active_sessions.clone()))
            .expect("register active_sessions");

        Self {
            registry,
            requests_created_total,
            transitions_total,
            pickup_requests,
            active_sessions,
        }
    }

    pub fn record_transition(&self, transition: &str, outcome: &str) {
        self.transitions_total
            .with_label_values(&[transition, outcome])
            .inc();
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
