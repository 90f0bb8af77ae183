//! # Metrics Collection
//!
//! Decision, cache and plugin counters recorded through the `metrics` facade.
//! Exporting is left to the embedding service.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use once_cell::sync::OnceCell;

static DESCRIBED: OnceCell<()> = OnceCell::new();

/// Metrics recorder for access control activity
#[derive(Debug, Clone, Copy, Default)]
pub struct SacMetrics {
    enabled: bool,
}

impl SacMetrics {
    /// Create a recorder; a disabled recorder is a no-op
    pub fn new(enabled: bool) -> Self {
        if enabled {
            DESCRIBED.get_or_init(describe_metrics);
        }
        Self { enabled }
    }

    /// A recorder that never records
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Record the outcome of a terminal access decision
    pub fn record_decision(&self, outcome: &str) {
        if !self.enabled {
            return;
        }
        let labels = [("result", outcome.to_string())];
        counter!("sac_decisions_total", &labels).increment(1);
    }

    /// Record an error surfaced by a terminal method
    pub fn record_error(&self, kind: &str) {
        if !self.enabled {
            return;
        }
        let labels = [("kind", kind.to_string())];
        counter!("sac_errors_total", &labels).increment(1);
    }

    /// Record an effective access scope cache lookup
    pub fn record_cache_lookup(&self, hit: bool) {
        if !self.enabled {
            return;
        }
        let outcome = if hit { "hit" } else { "miss" };
        counter!("sac_eas_cache_total", "outcome" => outcome).increment(1);
    }

    /// Record one plugin round-trip
    pub fn record_plugin_batch(&self, size: usize, success: bool) {
        if !self.enabled {
            return;
        }
        let status = if success { "success" } else { "error" };
        counter!("sac_plugin_batches_total", "status" => status).increment(1);
        histogram!("sac_plugin_batch_size").record(size as f64);
    }
}

fn describe_metrics() {
    describe_counter!("sac_decisions_total", Unit::Count, "Terminal access decisions by result");
    describe_counter!("sac_errors_total", Unit::Count, "Errors raised by terminal checks");
    describe_counter!(
        "sac_eas_cache_total",
        Unit::Count,
        "Effective access scope cache lookups by outcome"
    );
    describe_counter!(
        "sac_plugin_batches_total",
        Unit::Count,
        "Batched authorization plugin round-trips"
    );
    describe_histogram!(
        "sac_plugin_batch_size",
        Unit::Count,
        "Number of scopes sent per plugin round-trip"
    );
}
