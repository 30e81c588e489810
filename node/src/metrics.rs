//! Prometheus metrics for the service.
//!
//! [`VspMetrics`] owns a dedicated [`Registry`] that the `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use vsp_store::OutcomeCounts;

pub struct VspMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// API requests by endpoint and result code (`ok` or the error code).
    pub api_requests: IntCounterVec,
    /// Fee addresses issued to new tickets.
    pub fee_addresses_issued: IntCounter,
    /// Fee transactions that passed validation.
    pub fees_received: IntCounter,
    pub fee_broadcasts: IntCounter,
    pub fee_broadcast_failures: IntCounter,
    pub fees_confirmed: IntCounter,
    /// Vanished fee transactions the daemon refused to take back.
    pub fee_rebroadcast_failures: IntCounter,
    /// Pushes of voting configuration to a wallet.
    pub replica_pushes: IntCounter,
    pub sweeps: IntCounter,
    /// Sweeps not started because the previous one was still running.
    pub sweeps_skipped: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub tickets_voting: IntGauge,
    pub tickets_voted: IntGauge,
    pub tickets_expired: IntGauge,
    pub tickets_missed: IntGauge,
    pub block_height: IntGauge,
    pub wallets_online: IntGauge,
    pub wallets_total: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    pub sweep_duration_seconds: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntGauge> {
    register_int_gauge_with_registry!(Opts::new(name, help), registry)
}

impl VspMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let api_requests = register_int_counter_vec_with_registry!(
            Opts::new("vsp_api_requests_total", "API requests by endpoint and result"),
            &["endpoint", "result"],
            registry
        )?;

        let sweep_duration_seconds = register_histogram_with_registry!(
            HistogramOpts::new("vsp_sweep_duration_seconds", "Duration of background sweeps")
                .buckets(prometheus::exponential_buckets(0.01, 2.0, 14)?),
            registry
        )?;

        Ok(Self {
            fee_addresses_issued: counter(
                &registry,
                "vsp_fee_addresses_issued_total",
                "Fee addresses issued",
            )?,
            fees_received: counter(&registry, "vsp_fees_received_total", "Valid fee payments")?,
            fee_broadcasts: counter(
                &registry,
                "vsp_fee_broadcasts_total",
                "Fee transactions broadcast",
            )?,
            fee_broadcast_failures: counter(
                &registry,
                "vsp_fee_broadcast_failures_total",
                "Fee transactions the daemon refused",
            )?,
            fees_confirmed: counter(&registry, "vsp_fees_confirmed_total", "Fees mined")?,
            fee_rebroadcast_failures: counter(
                &registry,
                "vsp_fee_rebroadcast_failures_total",
                "Broadcast fees that vanished and could not be sent again",
            )?,
            replica_pushes: counter(
                &registry,
                "vsp_replica_pushes_total",
                "Voting configuration pushes to wallets",
            )?,
            sweeps: counter(&registry, "vsp_sweeps_total", "Completed background sweeps")?,
            sweeps_skipped: counter(
                &registry,
                "vsp_sweeps_skipped_total",
                "Sweeps skipped while another was running",
            )?,
            tickets_voting: gauge(&registry, "vsp_tickets_voting", "Tickets waiting to vote")?,
            tickets_voted: gauge(&registry, "vsp_tickets_voted", "Tickets that voted")?,
            tickets_expired: gauge(&registry, "vsp_tickets_expired", "Tickets that expired")?,
            tickets_missed: gauge(&registry, "vsp_tickets_missed", "Tickets that missed a vote")?,
            block_height: gauge(&registry, "vsp_block_height", "Best block height seen")?,
            wallets_online: gauge(&registry, "vsp_wallets_online", "Healthy voting wallets")?,
            wallets_total: gauge(&registry, "vsp_wallets_total", "Configured voting wallets")?,
            api_requests,
            sweep_duration_seconds,
            registry,
        })
    }

    pub fn observe_outcomes(&self, counts: &OutcomeCounts) {
        self.tickets_voting.set(counts.voting as i64);
        self.tickets_voted.set(counts.voted as i64);
        self.tickets_expired.set(counts.expired as i64);
        self.tickets_missed.set(counts.missed as i64);
    }

    /// Record one API request. `result` is `"ok"` or the numeric error code.
    pub fn count_request(&self, endpoint: &str, result: &str) {
        self.api_requests.with_label_values(&[endpoint, result]).inc();
    }

    /// Prometheus text exposition of every metric.
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = VspMetrics::new().unwrap();
        metrics.fees_received.inc();
        metrics.count_request("payfee", "ok");
        metrics.observe_outcomes(&OutcomeCounts {
            voting: 3,
            ..OutcomeCounts::default()
        });
        let text = metrics.encode().unwrap();
        assert!(text.contains("vsp_fees_received_total 1"));
        assert!(text.contains("vsp_tickets_voting 3"));
        assert!(text.contains(r#"endpoint="payfee""#));
    }

    #[test]
    fn registries_are_independent() {
        let a = VspMetrics::new().unwrap();
        let b = VspMetrics::new().unwrap();
        a.sweeps.inc();
        assert_eq!(b.sweeps.get(), 0);
    }
}
