//! Stock interceptors for bidpipe pipelines.
//!
//! These are general-purpose building blocks rather than production
//! bidding strategies: [`ConfigurableBidInterceptor`] bids with values
//! driven entirely by configuration (live testing, canaries),
//! [`LoadTestBidInterceptor`] injects synthetic latency and CPU load
//! (benchmarks). Both compose with domain interceptors in the same
//! [`bidpipe_api::InterceptorController`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod configurable;
mod loadtest;

pub use configurable::{ConfigurableBidInterceptor, ConfigurableBidOptions, SizeChoice};
pub use loadtest::LoadTestBidInterceptor;
