//! Lifecycle owner and request entry point for an interceptor pipeline.

use crate::chain::InterceptorChain;
use crate::error::{ControllerError, InterceptorError, StopError};
use crate::interceptor::Interceptor;
use crate::message::{UserRequest, UserResponse};
use crate::metrics::{InterceptorTimer, INTERCEPTOR_CHAIN_GAUGE, INTERCEPTOR_DURATION_SECONDS};
use crate::{BidRequest, BidResponse};
use metrics::Unit;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Where a controller is in its lifecycle.
///
/// `New → Starting → Running → Stopping → Terminated` is the healthy path;
/// `Failed` is terminal and reached from a failed start or a fatal stop.
/// The lifecycle is one-way: a stopped or failed controller is never
/// restarted, a replacement is built instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, hooks not yet run.
    New,
    /// Post-construct hooks are running.
    Starting,
    /// Serving requests.
    Running,
    /// Pre-destroy hooks are running.
    Stopping,
    /// Shut down cleanly.
    Terminated,
    /// Startup or shutdown failed; will never serve again.
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::New => "new",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
        };
        f.write_str(state)
    }
}

type ResourceKey = (TypeId, usize);

/// Owns an ordered interceptor pipeline: its lifecycle, its per-request
/// execution, its timing instrumentation and its capability registry.
///
/// The interceptor list is fixed at construction. One controller instance
/// serves many concurrent requests; [`InterceptorController::stop`] drains
/// by waiting for in-flight requests to finish before the hooks run.
pub struct InterceptorController<Req = BidRequest, Resp = BidResponse>
where
    Req: UserRequest + 'static,
    Resp: UserResponse + 'static,
{
    interceptors: Vec<Arc<dyn Interceptor<Req, Resp>>>,
    timers: Vec<Arc<InterceptorTimer>>,
    resources: HashMap<ResourceKey, Arc<dyn Any + Send + Sync>>,
    state: RwLock<LifecycleState>,
}

impl<Req, Resp> InterceptorController<Req, Resp>
where
    Req: UserRequest + 'static,
    Resp: UserResponse + 'static,
{
    /// Creates a controller over the given pipeline, in declaration order.
    ///
    /// Registers the chain layout and one timer per interceptor with the
    /// metrics facade, and publishes each timer in the capability registry
    /// under its interceptor.
    #[must_use]
    pub fn new(interceptors: Vec<Arc<dyn Interceptor<Req, Resp>>>) -> Self {
        metrics::describe_histogram!(
            INTERCEPTOR_DURATION_SECONDS,
            Unit::Seconds,
            "Inclusive execute latency per interceptor"
        );
        metrics::describe_gauge!(
            INTERCEPTOR_CHAIN_GAUGE,
            "Configured interceptors, labeled by name and position"
        );

        let names: Vec<&'static str> = interceptors.iter().map(|i| i.name()).collect();
        info!(chain = ?names, "interceptor pipeline configured");

        let mut timers = Vec::with_capacity(interceptors.len());
        let mut resources: HashMap<ResourceKey, Arc<dyn Any + Send + Sync>> = HashMap::new();
        for (position, interceptor) in interceptors.iter().enumerate() {
            let name = interceptor.name();
            metrics::gauge!(
                INTERCEPTOR_CHAIN_GAUGE,
                "interceptor" => name,
                "position" => position.to_string()
            )
            .set(1.0);

            let timer = Arc::new(InterceptorTimer::new(name));
            resources.insert(
                (TypeId::of::<InterceptorTimer>(), interceptor_key(interceptor)),
                timer.clone(),
            );
            timers.push(timer);
        }

        Self {
            interceptors,
            timers,
            resources,
            state: RwLock::new(LifecycleState::New),
        }
    }

    /// Runs every interceptor's post-construct hook, in chain order, then
    /// begins serving.
    ///
    /// # Errors
    ///
    /// [`ControllerError::CannotStart`] if the controller already left the
    /// `New` state. [`ControllerError::StartupFailed`] if any hook fails;
    /// the remaining hooks do not run and the controller is `Failed`.
    pub fn start(&self) -> Result<(), ControllerError> {
        let mut state = self.state.write();
        if *state != LifecycleState::New {
            return Err(ControllerError::CannotStart(*state));
        }
        *state = LifecycleState::Starting;

        for interceptor in &self.interceptors {
            debug!(interceptor = interceptor.name(), "running post-construct hook");
            if let Err(source) = interceptor.on_start() {
                *state = LifecycleState::Failed;
                return Err(ControllerError::StartupFailed {
                    interceptor: interceptor.name(),
                    source,
                });
            }
        }

        *state = LifecycleState::Running;
        info!(interceptors = self.interceptors.len(), "controller running");
        Ok(())
    }

    /// Stops serving and runs every interceptor's pre-destroy hook, in
    /// chain order.
    ///
    /// Waits for in-flight requests to drain before the first hook runs.
    /// Recoverable hook failures are logged and skipped so the remaining
    /// interceptors still clean up; a fatal failure aborts the remaining
    /// hooks.
    ///
    /// # Errors
    ///
    /// [`ControllerError::CannotStop`] if the controller is not running.
    /// [`ControllerError::ShutdownFailed`] on a fatal hook failure; the
    /// controller is then `Failed` instead of `Terminated`.
    pub fn stop(&self) -> Result<(), ControllerError> {
        // Taking the write lock waits out the read guards held by in-flight
        // on_request calls.
        let mut state = self.state.write();
        if *state != LifecycleState::Running {
            return Err(ControllerError::CannotStop(*state));
        }
        *state = LifecycleState::Stopping;

        for interceptor in &self.interceptors {
            debug!(interceptor = interceptor.name(), "running pre-destroy hook");
            match interceptor.on_stop() {
                Ok(()) => {}
                Err(StopError::Recoverable(source)) => {
                    error!(
                        interceptor = interceptor.name(),
                        error = %source,
                        "recoverable shutdown fault, continuing"
                    );
                }
                Err(StopError::Fatal(source)) => {
                    *state = LifecycleState::Failed;
                    return Err(ControllerError::ShutdownFailed {
                        interceptor: interceptor.name(),
                        source,
                    });
                }
            }
        }

        *state = LifecycleState::Terminated;
        info!("controller terminated");
        Ok(())
    }

    /// Runs the pipeline over one request/response pair.
    ///
    /// An [`InterceptorError::Abort`] raised anywhere in the chain is
    /// swallowed here: the response is returned as accumulated up to the
    /// abort, and the call succeeds. Faults propagate.
    ///
    /// # Errors
    ///
    /// [`ControllerError::NotRunning`] if the controller is not serving;
    /// the response is then untouched. [`ControllerError::Execution`] if an
    /// interceptor raised a fault.
    pub fn on_request(&self, request: &Req, response: &mut Resp) -> Result<(), ControllerError> {
        // Held for the duration of the traversal so stop() drains us.
        let state = self.state.read();
        if *state != LifecycleState::Running {
            return Err(ControllerError::NotRunning(*state));
        }

        let mut chain = InterceptorChain::new(self, request, response);
        match chain.proceed() {
            Ok(()) => Ok(()),
            Err(InterceptorError::Abort { reason }) => {
                debug!(exchange = %request.exchange(), reason = %reason, "chain aborted");
                Ok(())
            }
            Err(InterceptorError::Fault {
                interceptor,
                source,
            }) => Err(ControllerError::Execution {
                interceptor,
                source,
            }),
        }
    }

    /// The configured pipeline, in execution order.
    #[must_use]
    pub fn interceptors(&self) -> &[Arc<dyn Interceptor<Req, Resp>>] {
        &self.interceptors
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// The engine-provided resource of type `T` associated with one of this
    /// controller's interceptors, or `None` when no such capability exists.
    ///
    /// [`InterceptorTimer`] is the capability published today.
    #[must_use]
    pub fn resource<T: Any + Send + Sync>(
        &self,
        interceptor: &Arc<dyn Interceptor<Req, Resp>>,
    ) -> Option<Arc<T>> {
        self.resources
            .get(&(TypeId::of::<T>(), interceptor_key(interceptor)))
            .cloned()
            .and_then(|resource| resource.downcast().ok())
    }

    pub(crate) fn timer_at(&self, index: usize) -> &InterceptorTimer {
        &self.timers[index]
    }
}

impl<Req, Resp> fmt::Debug for InterceptorController<Req, Resp>
where
    Req: UserRequest + 'static,
    Resp: UserResponse + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self.interceptors.iter().map(|i| i.name()).collect();
        f.debug_struct("InterceptorController")
            .field("interceptors", &names)
            .field("state", &self.state())
            .finish()
    }
}

fn interceptor_key<Req, Resp>(interceptor: &Arc<dyn Interceptor<Req, Resp>>) -> usize
where
    Req: UserRequest + 'static,
    Resp: UserResponse + 'static,
{
    Arc::as_ptr(interceptor).cast::<()>() as usize
}

/// A controller over the bidding message pair.
pub type BidController = InterceptorController<BidRequest, BidResponse>;

/// A chain over the bidding message pair.
pub type BidChain<'a> = InterceptorChain<'a, BidRequest, BidResponse>;
