//! The request/response pair consumed by the interceptor chain.
//!
//! The engine is generic over these two traits so the same chain and
//! controller machinery serves every message family (bidding today;
//! impression, click and match pipelines follow the same contract).
//! [`crate::BidRequest`] / [`crate::BidResponse`] are the auction-domain
//! specialization.

use crate::exchange::Exchange;
use crate::metadata::Metadata;

/// A decoded inbound message.
///
/// Created once per inbound wire message by an exchange adapter, then
/// read-only for the rest of the pipeline. Never shared across requests.
pub trait UserRequest: Send + Sync {
    /// The exchange this request originated from.
    fn exchange(&self) -> &Exchange;
}

/// The mutable response being assembled for an inbound message.
///
/// Mutated by every interceptor that runs, handed back to the transport
/// layer for encoding, then discarded. Never shared across requests.
pub trait UserResponse: Send {
    /// The exchange this response is destined for.
    fn exchange(&self) -> &Exchange;

    /// Side-channel metadata for inter-interceptor communication.
    fn metadata(&self) -> &Metadata;

    /// Mutable access to the side-channel metadata.
    fn metadata_mut(&mut self) -> &mut Metadata;
}
