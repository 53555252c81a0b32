use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

#[derive(Clone)]
pub struct ClientMetrics {
    pub requests: IntCounterVec,
    pub request_duration: HistogramVec,
    pub change_polls: IntCounterVec,
}

impl ClientMetrics {
    pub fn new(prefix: &str, registry: &Registry) -> Result<Self, prometheus::Error> {
        let requests = IntCounterVec::new(
            Opts::new(
                format!("{prefix}_snapd_requests_total"),
                "Total number of requests sent to snapd",
            ),
            &["request", "outcome"], // outcome: "ok", "cancelled" or an error kind
        )?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                format!("{prefix}_snapd_request_duration_seconds"),
                "Time from sending a request until its outcome, including change polling",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
            &["request"],
        )?;

        let change_polls = IntCounterVec::new(
            Opts::new(
                format!("{prefix}_snapd_change_polls_total"),
                "Total number of change fetches issued while following changes",
            ),
            &["strategy"], // "interval" or "long-poll"
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(change_polls.clone()))?;

        Ok(ClientMetrics {
            requests,
            request_duration,
            change_polls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_with_prefix() {
        let registry = Registry::new();
        let metrics = ClientMetrics::new("test", &registry).unwrap();
        metrics.requests.with_label_values(&["get-snaps", "ok"]).inc();
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.name().to_string())
            .collect();
        assert!(names.contains(&"test_snapd_requests_total".to_string()));

        // a second registration under the same prefix collides
        assert!(ClientMetrics::new("test", &registry).is_err());
    }
}
