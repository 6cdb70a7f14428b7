//! Prometheus metrics for the node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] so that several nodes in
//! one process (as in tests) never collide on metric names.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Bloom retrieval requests answered by the bloom handlers.
    pub bloom_requests: IntCounter,
    /// Bloom retrievals that failed on a storage read.
    pub bloom_errors: IntCounter,
    /// Log-filter sessions handed to the retrieval multiplexers.
    pub filter_sessions: IntCounter,
    /// Transactions submitted through the API backend.
    pub transactions_submitted: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// 1 while the miner is running.
    pub mining_active: IntGauge,
    /// Canonical head number, refreshed on head queries.
    pub chain_head: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let bloom_requests = register_int_counter_with_registry!(
            Opts::new("huc_bloom_requests_total", "Bloom retrieval requests served"),
            registry
        )?;
        let bloom_errors = register_int_counter_with_registry!(
            Opts::new("huc_bloom_errors_total", "Bloom retrievals failed on storage"),
            registry
        )?;
        let filter_sessions = register_int_counter_with_registry!(
            Opts::new("huc_filter_sessions_total", "Log filter sessions serviced"),
            registry
        )?;
        let transactions_submitted = register_int_counter_with_registry!(
            Opts::new(
                "huc_transactions_submitted_total",
                "Transactions submitted through the API backend"
            ),
            registry
        )?;

        let mining_active = register_int_gauge_with_registry!(
            Opts::new("huc_mining_active", "Whether the miner is running"),
            registry
        )?;
        let chain_head = register_int_gauge_with_registry!(
            Opts::new("huc_chain_head", "Canonical head block number"),
            registry
        )?;

        Ok(Self {
            registry,
            bloom_requests,
            bloom_errors,
            filter_sessions,
            transactions_submitted,
            mining_active,
            chain_head,
        })
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
