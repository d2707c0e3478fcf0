//! Synthetic latency and CPU load for benchmarking a pipeline.

use bidpipe_api::{BidChain, BidRequest, BidResponse, Interceptor, InterceptorError};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// An interceptor that simulates both I/O waits and CPU-intensive
/// processing, for load tests.
///
/// The delay phase sleeps; the work phase spins, burning random arithmetic
/// into a sink the optimizer cannot remove. Either phase can be disabled.
#[derive(Debug, Default)]
pub struct LoadTestBidInterceptor {
    delay: Option<Duration>,
    work: Option<Duration>,
    sink: AtomicU64,
}

impl LoadTestBidInterceptor {
    /// Creates a load generator with the given wait and busy-work budgets.
    #[must_use]
    pub fn new(delay: Option<Duration>, work: Option<Duration>) -> Self {
        Self {
            delay,
            work,
            sink: AtomicU64::new(0),
        }
    }
}

impl Interceptor<BidRequest, BidResponse> for LoadTestBidInterceptor {
    fn name(&self) -> &'static str {
        "load-test"
    }

    fn execute(&self, chain: &mut BidChain<'_>) -> Result<(), InterceptorError> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        if let Some(work) = self.work {
            let mut rng = rand::thread_rng();
            let end = Instant::now() + work;
            while Instant::now() < end {
                let noise = rng.gen::<u64>() ^ rng.gen::<u64>();
                self.sink.fetch_xor(noise, Ordering::Relaxed);
            }
        }

        chain.proceed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidpipe_api::{BidController, Exchange, FnInterceptor};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_delay_and_work_then_proceed() {
        let downstream = Arc::new(AtomicUsize::new(0));
        let downstream_clone = downstream.clone();

        let controller = BidController::new(vec![
            Arc::new(LoadTestBidInterceptor::new(
                Some(Duration::from_millis(4)),
                Some(Duration::from_millis(2)),
            )),
            Arc::new(FnInterceptor::new("sentinel", move |chain: &mut BidChain<'_>| {
                downstream_clone.fetch_add(1, Ordering::SeqCst);
                chain.proceed()
            })),
        ]);
        controller.start().unwrap();

        let request = BidRequest::builder().build();
        let mut response = BidResponse::new(Exchange::none());
        let started = Instant::now();
        controller.on_request(&request, &mut response).unwrap();

        assert!(started.elapsed() >= Duration::from_millis(6));
        assert_eq!(downstream.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_phases_are_a_passthrough() {
        let controller = BidController::new(vec![Arc::new(LoadTestBidInterceptor::default())]);
        controller.start().unwrap();

        let request = BidRequest::builder().build();
        let mut response = BidResponse::new(Exchange::none());
        controller.on_request(&request, &mut response).unwrap();
        assert!(response.openrtb_ref().is_none());
    }
}
