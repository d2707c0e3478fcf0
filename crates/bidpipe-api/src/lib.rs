//! Bid-processing core: an interceptor pipeline over a dual-representation
//! bid message model.
//!
//! Bidding logic is decomposed into [`Interceptor`]s — ordered, pluggable
//! units executed as a chain of responsibility. An
//! [`InterceptorController`] owns one such pipeline: it runs lifecycle
//! hooks on start/stop, drives each request through an
//! [`InterceptorChain`], times every interceptor, and publishes per-
//! interceptor capabilities through a small resource registry.
//!
//! Requests and responses carry the auction in a **canonical** OpenRTB
//! form (see [`bidpipe_openrtb`]) and optionally in the exchange's
//! **native** form, so portable interceptors and exchange-specific ones
//! coexist in the same pipeline.
//!
//! ```
//! use bidpipe_api::{BidController, BidRequest, BidResponse, Exchange, FnInterceptor};
//! use std::sync::Arc;
//!
//! let controller = BidController::new(vec![Arc::new(FnInterceptor::new(
//!     "passthrough",
//!     |chain: &mut bidpipe_api::BidChain<'_>| chain.proceed(),
//! ))]);
//! controller.start()?;
//!
//! let request = BidRequest::builder().exchange(Exchange::new("adx")).build();
//! let mut response = BidResponse::new(Exchange::new("adx"));
//! controller.on_request(&request, &mut response)?;
//!
//! controller.stop()?;
//! # Ok::<(), bidpipe_api::ControllerError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bid_request;
mod bid_response;
mod chain;
mod controller;
mod error;
mod exchange;
mod interceptor;
mod message;
mod metadata;
mod metrics;

pub use bid_request::{BidRequest, BidRequestBuilder};
pub use bid_response::BidResponse;
pub use chain::InterceptorChain;
pub use controller::{BidChain, BidController, InterceptorController, LifecycleState};
pub use error::{ControllerError, InterceptorError, ModelError, StopError};
pub use exchange::Exchange;
pub use interceptor::{BidInterceptor, FnInterceptor, Interceptor};
pub use message::{UserRequest, UserResponse};
pub use metadata::Metadata;
pub use metrics::{InterceptorTimer, INTERCEPTOR_CHAIN_GAUGE, INTERCEPTOR_DURATION_SECONDS};
