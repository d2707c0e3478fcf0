//! Per-interceptor timing instrumentation.
//!
//! The controller creates one [`InterceptorTimer`] per interceptor at
//! construction time, against whatever recorder the embedder installed via
//! the `metrics` facade — the engine never installs a recorder of its own.
//! Timers are handed back to interested callers through the controller's
//! capability registry ([`crate::InterceptorController::resource`]).

use metrics::Histogram;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Histogram of per-interceptor `execute` latency, labeled by interceptor
/// name. Inclusive of nested downstream interceptors (see
/// [`crate::InterceptorChain::proceed`]).
pub const INTERCEPTOR_DURATION_SECONDS: &str = "bidpipe_interceptor_duration_seconds";

/// Gauge enumerating the configured chain: one series per interceptor,
/// labeled with its name and zero-based position, set to 1.
pub const INTERCEPTOR_CHAIN_GAUGE: &str = "bidpipe_interceptor_chain";

/// Timing handle for one interceptor.
///
/// Records into the embedder's metrics recorder and additionally keeps
/// local atomic counters, so timings stay observable (and testable) even
/// when no recorder is installed.
pub struct InterceptorTimer {
    histogram: Histogram,
    invocations: AtomicU64,
    total_nanos: AtomicU64,
}

impl InterceptorTimer {
    pub(crate) fn new(interceptor: &'static str) -> Self {
        Self {
            histogram: metrics::histogram!(INTERCEPTOR_DURATION_SECONDS, "interceptor" => interceptor),
            invocations: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
        }
    }

    /// Records one `execute` invocation.
    pub fn record(&self, elapsed: Duration) {
        self.histogram.record(elapsed.as_secs_f64());
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.total_nanos
            .fetch_add(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    /// Number of recorded invocations.
    #[must_use]
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Sum of recorded durations.
    ///
    /// An interceptor positioned early in the chain wraps everything after
    /// it, so its total includes downstream interceptors' time.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }
}

impl fmt::Debug for InterceptorTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorTimer")
            .field("invocations", &self.invocations())
            .field("total", &self.total_duration())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let timer = InterceptorTimer::new("test");
        assert_eq!(timer.invocations(), 0);

        timer.record(Duration::from_micros(250));
        timer.record(Duration::from_micros(750));

        assert_eq!(timer.invocations(), 2);
        assert_eq!(timer.total_duration(), Duration::from_millis(1));
    }
}
