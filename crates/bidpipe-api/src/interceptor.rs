//! The interceptor contract: one pluggable unit of bidding logic.

use crate::chain::InterceptorChain;
use crate::error::{InterceptorError, StopError};
use crate::message::{UserRequest, UserResponse};
use crate::{BidRequest, BidResponse};

/// A unit of bidding/validation/normalization logic.
///
/// Interceptor instances are long-lived singletons shared across all
/// concurrent requests for the lifetime of the controller (hence the
/// `Send + Sync` bound). Any mutable state they keep must be atomic or
/// externally synchronized; per-request state belongs on the chain's
/// request/response objects, which are never shared across requests.
///
/// # Outcomes
///
/// `execute` chooses one of three outcomes:
///
/// 1. Call [`InterceptorChain::proceed`] exactly once to continue to the
///    next interceptor, optionally inspecting or mutating the response
///    before and/or after the call. This is what allows *wrapping*: an
///    interceptor registered late in the chain can post-process bids
///    produced by everything registered before it.
/// 2. Return [`InterceptorError::Abort`] to stop the remainder of the
///    pipeline. Not an error — the controller swallows it.
/// 3. Return [`InterceptorError::Fault`] for any other runtime failure,
///    which propagates out of request handling entirely and signals a
///    bidder-health problem. Never convert a fault into an abort.
///
/// # Lifecycle
///
/// [`Interceptor::on_start`] runs once after construction, before the
/// controller serves any request; a failure aborts startup for the whole
/// server. [`Interceptor::on_stop`] runs once during shutdown; see
/// [`StopError`] for the recoverable/fatal split. Both default to no-ops.
/// Hook signatures are fixed by this trait, so a hook taking parameters is
/// a compile error rather than a silently skipped method.
///
/// # Example
///
/// ```
/// use bidpipe_api::{BidChain, BidRequest, BidResponse, Interceptor, InterceptorError};
/// use bidpipe_openrtb::Bid;
///
/// struct FloorBidder;
///
/// impl Interceptor<BidRequest, BidResponse> for FloorBidder {
///     fn name(&self) -> &'static str {
///         "floor-bidder"
///     }
///
///     fn execute(&self, chain: &mut BidChain<'_>) -> Result<(), InterceptorError> {
///         let bids: Vec<Bid> = chain
///             .request()
///             .banner_imps()
///             .map_err(anyhow::Error::from)?
///             .map(|imp| Bid::new(imp.id.clone(), imp.id.clone(), imp.bidfloor))
///             .collect();
///         for bid in bids {
///             chain.response().add_bid(bid).map_err(anyhow::Error::from)?;
///         }
///         chain.proceed()
///     }
/// }
/// ```
pub trait Interceptor<Req, Resp>: Send + Sync + 'static
where
    Req: UserRequest,
    Resp: UserResponse,
{
    /// Unique name of this interceptor, used for logging, metrics and
    /// fault attribution.
    fn name(&self) -> &'static str;

    /// Executes this interceptor's logic for one request.
    fn execute(&self, chain: &mut InterceptorChain<'_, Req, Resp>) -> Result<(), InterceptorError>;

    /// Post-construct hook, invoked once by the controller before it
    /// begins serving. A failure is fatal to startup.
    fn on_start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Pre-destroy hook, invoked once by the controller during shutdown.
    fn on_stop(&self) -> Result<(), StopError> {
        Ok(())
    }
}

/// Interceptors specialized to the bidding message pair.
///
/// Blanket-implemented; pipeline authors only implement [`Interceptor`].
pub trait BidInterceptor: Interceptor<BidRequest, BidResponse> {}

impl<T: Interceptor<BidRequest, BidResponse>> BidInterceptor for T {}

/// An interceptor defined by a closure, for simple pipeline units and
/// tests.
///
/// # Example
///
/// ```
/// use bidpipe_api::{BidChain, FnInterceptor};
///
/// let passthrough = FnInterceptor::new("passthrough", |chain: &mut BidChain<'_>| {
///     chain.proceed()
/// });
/// ```
pub struct FnInterceptor<F> {
    name: &'static str,
    func: F,
}

impl<F> FnInterceptor<F> {
    /// Creates a closure-backed interceptor.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<Req, Resp, F> Interceptor<Req, Resp> for FnInterceptor<F>
where
    Req: UserRequest + 'static,
    Resp: UserResponse + 'static,
    F: Fn(&mut InterceptorChain<'_, Req, Resp>) -> Result<(), InterceptorError>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(&self, chain: &mut InterceptorChain<'_, Req, Resp>) -> Result<(), InterceptorError> {
        (self.func)(chain)
    }
}
