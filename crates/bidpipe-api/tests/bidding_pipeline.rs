//! End-to-end pipeline behavior: chain traversal, lifecycle, timing and
//! the capability registry.

use bidpipe_api::{
    BidChain, BidController, BidRequest, BidResponse, ControllerError, Exchange, FnInterceptor,
    Interceptor, InterceptorError, InterceptorTimer, LifecycleState, StopError, UserResponse,
};
use bidpipe_openrtb::Bid;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn request() -> BidRequest {
    BidRequest::builder().exchange(Exchange::new("adx")).build()
}

fn response() -> BidResponse {
    BidResponse::new(Exchange::new("adx"))
}

fn running(interceptors: Vec<Arc<dyn Interceptor<BidRequest, BidResponse>>>) -> BidController {
    let controller = BidController::new(interceptors);
    controller.start().unwrap();
    controller
}

#[test]
fn test_empty_pipeline_leaves_response_untouched() {
    init_tracing();
    let controller = running(vec![]);

    let mut resp = response();
    controller.on_request(&request(), &mut resp).unwrap();

    assert!(resp.openrtb_ref().is_none());
    assert!(resp.metadata().is_empty());
}

#[test]
fn test_abort_skips_downstream_and_is_swallowed() {
    init_tracing();
    let reached = Arc::new(AtomicUsize::new(0));
    let reached_clone = reached.clone();

    let controller = running(vec![
        Arc::new(FnInterceptor::new("gate", |_chain: &mut BidChain<'_>| {
            Err(InterceptorError::abort("blocked request"))
        })),
        Arc::new(FnInterceptor::new("bidder", move |chain: &mut BidChain<'_>| {
            reached_clone.fetch_add(1, Ordering::SeqCst);
            chain.proceed()
        })),
    ]);

    let mut resp = response();
    controller.on_request(&request(), &mut resp).unwrap();

    assert_eq!(reached.load(Ordering::SeqCst), 0);
}

#[test]
fn test_execution_is_nested_not_sequential() {
    init_tracing();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let log_a = log.clone();
    let log_b = log.clone();

    let controller = running(vec![
        Arc::new(FnInterceptor::new("a", move |chain: &mut BidChain<'_>| {
            log_a.lock().unwrap().push("a-pre");
            chain.proceed()?;
            log_a.lock().unwrap().push("a-post");
            Ok(())
        })),
        Arc::new(FnInterceptor::new("b", move |chain: &mut BidChain<'_>| {
            log_b.lock().unwrap().push("b-pre");
            chain.proceed()?;
            log_b.lock().unwrap().push("b-post");
            Ok(())
        })),
    ]);

    controller.on_request(&request(), &mut response()).unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["a-pre", "b-pre", "b-post", "a-post"]);
}

#[test]
fn test_upstream_interceptor_post_processes_downstream_bids() {
    init_tracing();
    let controller = running(vec![
        // Registered first, so it wraps the bidder and sees its bids.
        Arc::new(FnInterceptor::new("price-cap", |chain: &mut BidChain<'_>| {
            chain.proceed()?;
            chain
                .response()
                .filter_bids(|bid| bid.price <= 2.0)
                .map_err(anyhow::Error::from)?;
            Ok(())
        })),
        Arc::new(FnInterceptor::new("bidder", |chain: &mut BidChain<'_>| {
            chain
                .response()
                .add_bid(Bid::new("bid-1", "imp-1", 9.5))
                .map_err(anyhow::Error::from)?;
            chain.proceed()
        })),
    ]);

    let mut resp = response();
    controller.on_request(&request(), &mut resp).unwrap();

    assert_eq!(resp.bids().unwrap().count(), 0);
}

#[test]
fn test_fault_propagates_with_attribution() {
    init_tracing();
    let controller = running(vec![
        Arc::new(FnInterceptor::new("outer", |chain: &mut BidChain<'_>| {
            chain.proceed()
        })),
        Arc::new(FnInterceptor::new("broken", |_chain: &mut BidChain<'_>| {
            Err(InterceptorError::fault(anyhow::anyhow!("bad state")))
        })),
    ]);

    let error = controller
        .on_request(&request(), &mut response())
        .unwrap_err();
    match error {
        ControllerError::Execution { interceptor, .. } => {
            assert_eq!(interceptor, Some("broken"));
        }
        other => panic!("expected execution error, got {other}"),
    }
    // A fault does not take the controller down.
    assert_eq!(controller.state(), LifecycleState::Running);
}

#[test]
fn test_requests_rejected_unless_running() {
    init_tracing();
    let controller = BidController::new(vec![]);

    let error = controller
        .on_request(&request(), &mut response())
        .unwrap_err();
    assert!(matches!(error, ControllerError::NotRunning(LifecycleState::New)));

    controller.start().unwrap();
    controller.on_request(&request(), &mut response()).unwrap();
    controller.stop().unwrap();

    let error = controller
        .on_request(&request(), &mut response())
        .unwrap_err();
    assert!(matches!(
        error,
        ControllerError::NotRunning(LifecycleState::Terminated)
    ));
}

#[test]
fn test_lifecycle_is_one_way() {
    init_tracing();
    let controller = BidController::new(vec![]);
    controller.start().unwrap();
    assert!(matches!(
        controller.start().unwrap_err(),
        ControllerError::CannotStart(LifecycleState::Running)
    ));

    controller.stop().unwrap();
    assert!(matches!(
        controller.stop().unwrap_err(),
        ControllerError::CannotStop(LifecycleState::Terminated)
    ));
}

/// Interceptor with configurable lifecycle hook outcomes.
struct Hooked {
    name: &'static str,
    start_fails: bool,
    stop_error: Option<fn() -> StopError>,
    started: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
}

impl Hooked {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            start_fails: false,
            stop_error: None,
            started: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Interceptor<BidRequest, BidResponse> for Hooked {
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(&self, chain: &mut BidChain<'_>) -> Result<(), InterceptorError> {
        chain.proceed()
    }

    fn on_start(&self) -> anyhow::Result<()> {
        if self.start_fails {
            anyhow::bail!("no upstream connection");
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_stop(&self) -> Result<(), StopError> {
        if let Some(make_error) = self.stop_error {
            return Err(make_error());
        }
        self.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_start_hook_failure_is_fatal() {
    init_tracing();
    let mut failing = Hooked::new("failing");
    failing.start_fails = true;
    let last = Hooked::new("last");
    let last_started = last.started.clone();

    let controller = BidController::new(vec![Arc::new(failing), Arc::new(last)]);
    let error = controller.start().unwrap_err();
    match error {
        ControllerError::StartupFailed { interceptor, .. } => {
            assert_eq!(interceptor, "failing");
        }
        other => panic!("expected startup failure, got {other}"),
    }

    // Failed is terminal; downstream hooks never ran, requests are rejected.
    assert_eq!(controller.state(), LifecycleState::Failed);
    assert_eq!(last_started.load(Ordering::SeqCst), 0);
    assert!(matches!(
        controller.on_request(&request(), &mut response()).unwrap_err(),
        ControllerError::NotRunning(LifecycleState::Failed)
    ));
}

#[test]
fn test_recoverable_stop_fault_lets_remaining_hooks_run() {
    init_tracing();
    let mut flaky = Hooked::new("flaky");
    flaky.stop_error = Some(|| StopError::recoverable(anyhow::anyhow!("flush failed")));
    let last = Hooked::new("last");
    let last_stopped = last.stopped.clone();

    let controller = BidController::new(vec![Arc::new(flaky), Arc::new(last)]);
    controller.start().unwrap();
    controller.stop().unwrap();

    assert_eq!(controller.state(), LifecycleState::Terminated);
    assert_eq!(last_stopped.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fatal_stop_fault_aborts_shutdown() {
    init_tracing();
    let mut corrupt = Hooked::new("corrupt");
    corrupt.stop_error = Some(|| StopError::fatal(anyhow::anyhow!("store corrupted")));
    let last = Hooked::new("last");
    let last_stopped = last.stopped.clone();

    let controller = BidController::new(vec![Arc::new(corrupt), Arc::new(last)]);
    controller.start().unwrap();
    let error = controller.stop().unwrap_err();
    match error {
        ControllerError::ShutdownFailed { interceptor, .. } => {
            assert_eq!(interceptor, "corrupt");
        }
        other => panic!("expected shutdown failure, got {other}"),
    }

    assert_eq!(controller.state(), LifecycleState::Failed);
    assert_eq!(last_stopped.load(Ordering::SeqCst), 0);
}

#[test]
fn test_timers_are_inclusive_of_downstream_time() {
    init_tracing();
    let controller = running(vec![
        Arc::new(FnInterceptor::new("outer", |chain: &mut BidChain<'_>| {
            chain.proceed()
        })),
        Arc::new(FnInterceptor::new("inner", |chain: &mut BidChain<'_>| {
            thread::sleep(Duration::from_millis(5));
            chain.proceed()
        })),
    ]);

    for _ in 0..3 {
        controller.on_request(&request(), &mut response()).unwrap();
    }

    let outer = controller
        .resource::<InterceptorTimer>(&controller.interceptors()[0])
        .unwrap();
    let inner = controller
        .resource::<InterceptorTimer>(&controller.interceptors()[1])
        .unwrap();

    assert_eq!(outer.invocations(), 3);
    assert_eq!(inner.invocations(), 3);
    assert!(inner.total_duration() >= Duration::from_millis(15));
    // The outer frame wraps the inner one.
    assert!(outer.total_duration() >= inner.total_duration());
}

#[test]
fn test_unknown_capability_is_none() {
    init_tracing();
    let controller = running(vec![Arc::new(FnInterceptor::new(
        "solo",
        |chain: &mut BidChain<'_>| chain.proceed(),
    ))]);

    let interceptor = &controller.interceptors()[0];
    assert!(controller.resource::<String>(interceptor).is_none());
    assert!(controller.resource::<InterceptorTimer>(interceptor).is_some());
}

#[test]
fn test_metadata_flows_between_interceptors() {
    init_tracing();
    let controller = running(vec![
        Arc::new(FnInterceptor::new("tagger", |chain: &mut BidChain<'_>| {
            chain.response().metadata_mut().insert("segment", 42_u32);
            chain.proceed()
        })),
        Arc::new(FnInterceptor::new("reader", |chain: &mut BidChain<'_>| {
            let segment = chain.response().metadata().get::<u32>("segment").copied();
            assert_eq!(segment, Some(42));
            chain.proceed()
        })),
    ]);

    controller.on_request(&request(), &mut response()).unwrap();
}
