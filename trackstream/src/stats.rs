//! Timing statistics (§5 "Cancellation": "A signal...triggers a stats dump
//! to the profile log"), kept as an hdrhistogram the way `flydra2` logs
//! reconstruction latency.

use hdrhistogram::Histogram;

pub struct LoopStats {
    iteration_latency_us: Histogram<u64>,
    batch_size: Histogram<u64>,
}

impl LoopStats {
    pub fn new() -> Self {
        Self {
            iteration_latency_us: Histogram::new_with_bounds(1, 60_000_000, 2)
                .expect("1us..60s with 2 sigfigs is a valid histogram range"),
            batch_size: Histogram::new_with_bounds(1, 5_000, 2)
                .expect("1..5000 with 2 sigfigs is a valid histogram range"),
        }
    }

    pub fn record_iteration(&mut self, elapsed: std::time::Duration, batch_len: usize) {
        let _ = self.iteration_latency_us.record(elapsed.as_micros() as u64);
        let _ = self.batch_size.record(batch_len.max(1) as u64);
    }

    /// Dump summary percentiles to the profile log.
    pub fn dump(&self) {
        tracing::info!(
            iterations = self.iteration_latency_us.len(),
            p50_us = self.iteration_latency_us.value_at_quantile(0.5),
            p99_us = self.iteration_latency_us.value_at_quantile(0.99),
            max_us = self.iteration_latency_us.max(),
            mean_batch_size = self.batch_size.mean(),
            "trackstream loop stats"
        );
    }
}

impl Default for LoopStats {
    fn default() -> Self {
        Self::new()
    }
}
