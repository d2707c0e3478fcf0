//! The mutable bid response assembled by the pipeline.

use crate::error::ModelError;
use crate::exchange::Exchange;
use crate::message::UserResponse;
use crate::metadata::Metadata;
use bidpipe_openrtb as openrtb;
use bidpipe_openrtb::{Bid, SeatBid};
use bytes::Bytes;
use std::any::Any;
use std::fmt;

/// One of the two mutually exclusive response representations.
enum Payload {
    /// Neither representation chosen yet.
    Unset,
    /// Canonical OpenRTB builder, instantiated on first access.
    OpenRtb(openrtb::BidResponse),
    /// Exchange-specific native payload.
    Native(Box<dyn Any + Send + Sync>),
}

/// A bid response, progressively filled by the pipeline.
///
/// A response builds either the canonical OpenRTB form (most operations
/// here) or the exchange's native form ([`BidResponse::set_native_response`])
/// — never both. Whichever side is touched first wins; touching the other
/// afterwards is a [`ModelError`] state error.
///
/// Unlike the request, the response stays mutable through the whole
/// pipeline; wire encoding ("build") happens in the transport layer after
/// [`crate::InterceptorController::on_request`] returns.
pub struct BidResponse {
    exchange: Exchange,
    http_response: http::Response<Bytes>,
    metadata: Metadata,
    payload: Payload,
}

impl BidResponse {
    /// Creates an empty response for the given exchange, with a default
    /// transport response.
    #[must_use]
    pub fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            http_response: http::Response::new(Bytes::new()),
            metadata: Metadata::new(),
            payload: Payload::Unset,
        }
    }

    /// Creates a response with an explicit transport response.
    #[must_use]
    pub fn with_http_response(exchange: Exchange, http_response: http::Response<Bytes>) -> Self {
        Self {
            exchange,
            http_response,
            metadata: Metadata::new(),
            payload: Payload::Unset,
        }
    }

    /// The exchange this response is destined for.
    #[must_use]
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// The transport-level response sink.
    #[must_use]
    pub fn http_response(&self) -> &http::Response<Bytes> {
        &self.http_response
    }

    /// Mutable access to the transport-level response sink.
    pub fn http_response_mut(&mut self) -> &mut http::Response<Bytes> {
        &mut self.http_response
    }

    /// The canonical OpenRTB builder, instantiated on first access.
    ///
    /// # Errors
    ///
    /// [`ModelError::PayloadIsNative`] if a native payload was installed
    /// first.
    pub fn openrtb(&mut self) -> Result<&mut openrtb::BidResponse, ModelError> {
        match self.payload {
            Payload::Native(_) => return Err(ModelError::PayloadIsNative),
            Payload::Unset => self.payload = Payload::OpenRtb(openrtb::BidResponse::new()),
            Payload::OpenRtb(_) => {}
        }
        match &mut self.payload {
            Payload::OpenRtb(response) => Ok(response),
            _ => Err(ModelError::PayloadIsNative),
        }
    }

    /// The canonical form, if it has been instantiated. Does not
    /// instantiate it.
    #[must_use]
    pub fn openrtb_ref(&self) -> Option<&openrtb::BidResponse> {
        match &self.payload {
            Payload::OpenRtb(response) => Some(response),
            _ => None,
        }
    }

    /// Installs (or replaces) the exchange-specific native payload.
    ///
    /// # Errors
    ///
    /// [`ModelError::PayloadIsOpenRtb`] if the canonical builder was
    /// instantiated first.
    pub fn set_native_response<T: Send + Sync + 'static>(
        &mut self,
        response: T,
    ) -> Result<(), ModelError> {
        match self.payload {
            Payload::OpenRtb(_) => Err(ModelError::PayloadIsOpenRtb),
            _ => {
                self.payload = Payload::Native(Box::new(response));
                Ok(())
            }
        }
    }

    /// The native payload, if installed and of type `T`.
    pub fn native_response<T: 'static>(&mut self) -> Option<&mut T> {
        match &mut self.payload {
            Payload::Native(response) => response.downcast_mut(),
            _ => None,
        }
    }

    /// The seat group for `seat` (`None` = anonymous seat), created if
    /// absent.
    ///
    /// # Errors
    ///
    /// [`ModelError::PayloadIsNative`] if the response went native, as for
    /// every canonical-form operation below.
    pub fn seat_bid(&mut self, seat: Option<&str>) -> Result<&mut SeatBid, ModelError> {
        Ok(self.openrtb()?.seat_bid(seat))
    }

    /// Adds a bid to the anonymous seat.
    pub fn add_bid(&mut self, bid: Bid) -> Result<&mut Self, ModelError> {
        self.openrtb()?.add_bid(bid);
        Ok(self)
    }

    /// Adds a bid to a named seat.
    pub fn add_seat_bid(&mut self, seat: &str, bid: Bid) -> Result<&mut Self, ModelError> {
        self.openrtb()?.add_seat_bid(seat, bid);
        Ok(self)
    }

    /// Iterates all bids, grouped by seat in declaration order.
    pub fn bids(&mut self) -> Result<impl Iterator<Item = &Bid>, ModelError> {
        Ok(self.openrtb()?.bids())
    }

    /// The bids of one seat, or an empty slice if that seat has no group.
    pub fn bids_in(&mut self, seat: Option<&str>) -> Result<&[Bid], ModelError> {
        Ok(self.openrtb()?.bids_in(seat))
    }

    /// Finds a bid by id (assumed unique within the response).
    pub fn bid_with_id(&mut self, id: &str) -> Result<Option<&mut Bid>, ModelError> {
        Ok(self.openrtb()?.bid_with_id(id))
    }

    /// Finds a bid by id within one seat.
    pub fn bid_with_id_in(
        &mut self,
        seat: Option<&str>,
        id: &str,
    ) -> Result<Option<&mut Bid>, ModelError> {
        Ok(self.openrtb()?.bid_with_id_in(seat, id))
    }

    /// Finds a bid by ad id.
    pub fn bid_with_adid(&mut self, adid: &str) -> Result<Option<&mut Bid>, ModelError> {
        Ok(self.openrtb()?.bid_with_adid(adid))
    }

    /// Finds a bid by ad id within one seat.
    pub fn bid_with_adid_in(
        &mut self,
        seat: Option<&str>,
        adid: &str,
    ) -> Result<Option<&mut Bid>, ModelError> {
        Ok(self.openrtb()?.bid_with_adid_in(seat, adid))
    }

    /// Iterates all bids passing the predicate.
    pub fn bids_with<P>(&mut self, predicate: P) -> Result<impl Iterator<Item = &Bid>, ModelError>
    where
        P: FnMut(&Bid) -> bool,
    {
        Ok(self.openrtb()?.bids_with(predicate))
    }

    /// Applies `updater` to every bid; returns whether any bid changed.
    pub fn update_bids<F>(&mut self, updater: F) -> Result<bool, ModelError>
    where
        F: FnMut(&mut Bid) -> bool,
    {
        Ok(self.openrtb()?.update_bids(updater))
    }

    /// Applies `updater` to every bid of one seat; returns whether any bid
    /// changed.
    pub fn update_bids_in<F>(&mut self, seat: Option<&str>, updater: F) -> Result<bool, ModelError>
    where
        F: FnMut(&mut Bid) -> bool,
    {
        Ok(self.openrtb()?.update_bids_in(seat, updater))
    }

    /// Removes every bid failing the predicate; returns whether any bid was
    /// removed.
    pub fn filter_bids<P>(&mut self, predicate: P) -> Result<bool, ModelError>
    where
        P: FnMut(&Bid) -> bool,
    {
        Ok(self.openrtb()?.filter_bids(predicate))
    }

    /// Removes every bid failing the predicate within one seat; returns
    /// whether any bid was removed.
    pub fn filter_bids_in<P>(&mut self, seat: Option<&str>, predicate: P) -> Result<bool, ModelError>
    where
        P: FnMut(&Bid) -> bool,
    {
        Ok(self.openrtb()?.filter_bids_in(seat, predicate))
    }
}

impl UserResponse for BidResponse {
    fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl fmt::Debug for BidResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = match &self.payload {
            Payload::Unset => "unset",
            Payload::OpenRtb(_) => "openrtb",
            Payload::Native(_) => "native",
        };
        f.debug_struct("BidResponse")
            .field("exchange", &self.exchange)
            .field("payload", &payload)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
