//! The frozen bid request flowing through the pipeline.

use crate::error::ModelError;
use crate::exchange::Exchange;
use crate::message::UserRequest;
use bidpipe_openrtb as openrtb;
use bidpipe_openrtb::Imp;
use bytes::Bytes;
use std::any::Any;
use std::fmt;

/// A bid request, carrying the auction in up to two representations.
///
/// The **canonical** form ([`BidRequest::openrtb`]) is the vendor-neutral
/// schema every interceptor can rely on. The **native** form
/// ([`BidRequest::native_request`]) is the exchange's own wire message,
/// present only when the exchange adapter chose to preserve it — most
/// interceptors never touch it.
///
/// Built once per inbound message via [`BidRequest::builder`], then
/// immutable for the rest of the pipeline.
pub struct BidRequest {
    exchange: Exchange,
    http_request: http::Request<Bytes>,
    native_request: Option<Box<dyn Any + Send + Sync>>,
    openrtb: Option<openrtb::BidRequest>,
}

impl BidRequest {
    /// Starts building a bid request.
    #[must_use]
    pub fn builder() -> BidRequestBuilder {
        BidRequestBuilder::default()
    }

    /// The exchange this request originated from.
    #[must_use]
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// The transport-level request this message was decoded from.
    #[must_use]
    pub fn http_request(&self) -> &http::Request<Bytes> {
        &self.http_request
    }

    /// The canonical OpenRTB form of the auction.
    ///
    /// # Errors
    ///
    /// [`ModelError::OpenRtbUnavailable`] when the exchange adapter did not
    /// map the native message (uncommon, but a state error rather than a
    /// panic).
    pub fn openrtb(&self) -> Result<&openrtb::BidRequest, ModelError> {
        self.openrtb.as_ref().ok_or(ModelError::OpenRtbUnavailable)
    }

    /// Returns `true` if the canonical form is present.
    #[must_use]
    pub fn has_openrtb(&self) -> bool {
        self.openrtb.is_some()
    }

    /// The exchange-specific native request, if preserved and of type `T`.
    #[must_use]
    pub fn native_request<T: 'static>(&self) -> Option<&T> {
        self.native_request
            .as_deref()
            .and_then(|request| request.downcast_ref())
    }

    /// All impressions of the canonical auction.
    ///
    /// # Errors
    ///
    /// [`ModelError::OpenRtbUnavailable`] when the canonical form is absent,
    /// as for every other canonical-form query below.
    pub fn imps(&self) -> Result<&[Imp], ModelError> {
        Ok(self.openrtb()?.imps())
    }

    /// All impressions passing the predicate.
    pub fn imps_with<P>(&self, predicate: P) -> Result<impl Iterator<Item = &Imp>, ModelError>
    where
        P: FnMut(&Imp) -> bool,
    {
        Ok(self.openrtb()?.imps_with(predicate))
    }

    /// Finds an impression by id.
    pub fn imp_with_id(&self, id: &str) -> Result<Option<&Imp>, ModelError> {
        Ok(self.openrtb()?.imp_with_id(id))
    }

    /// All impressions carrying a banner placement.
    pub fn banner_imps(&self) -> Result<impl Iterator<Item = &Imp>, ModelError> {
        Ok(self.openrtb()?.banner_imps())
    }

    /// All banner impressions passing the predicate.
    pub fn banner_imps_with<P>(
        &self,
        predicate: P,
    ) -> Result<impl Iterator<Item = &Imp>, ModelError>
    where
        P: FnMut(&Imp) -> bool,
    {
        Ok(self.openrtb()?.banner_imps_with(predicate))
    }

    /// All impressions carrying a video placement.
    pub fn video_imps(&self) -> Result<impl Iterator<Item = &Imp>, ModelError> {
        Ok(self.openrtb()?.video_imps())
    }

    /// All video impressions passing the predicate.
    pub fn video_imps_with<P>(
        &self,
        predicate: P,
    ) -> Result<impl Iterator<Item = &Imp>, ModelError>
    where
        P: FnMut(&Imp) -> bool,
    {
        Ok(self.openrtb()?.video_imps_with(predicate))
    }

    /// Finds an impression by its id and its banner's id; `imp_id` may be
    /// `None` when banner ids are unique within the request.
    pub fn banner_imp_with_id(
        &self,
        imp_id: Option<&str>,
        banner_id: &str,
    ) -> Result<Option<&Imp>, ModelError> {
        Ok(self.openrtb()?.banner_imp_with_id(imp_id, banner_id))
    }
}

impl UserRequest for BidRequest {
    fn exchange(&self) -> &Exchange {
        &self.exchange
    }
}

impl fmt::Debug for BidRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidRequest")
            .field("exchange", &self.exchange)
            .field("openrtb", &self.openrtb)
            .field("native", &self.native_request.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}

/// Builder for [`BidRequest`].
#[derive(Default)]
pub struct BidRequestBuilder {
    exchange: Option<Exchange>,
    http_request: Option<http::Request<Bytes>>,
    native_request: Option<Box<dyn Any + Send + Sync>>,
    openrtb: Option<openrtb::BidRequest>,
}

impl BidRequestBuilder {
    /// Sets the originating exchange; defaults to [`Exchange::none`].
    #[must_use]
    pub fn exchange(mut self, exchange: Exchange) -> Self {
        self.exchange = Some(exchange);
        self
    }

    /// Sets the transport-level request; defaults to an empty request.
    #[must_use]
    pub fn http_request(mut self, request: http::Request<Bytes>) -> Self {
        self.http_request = Some(request);
        self
    }

    /// Preserves the exchange's native request alongside the canonical one.
    #[must_use]
    pub fn native_request<T: Send + Sync + 'static>(mut self, request: T) -> Self {
        self.native_request = Some(Box::new(request));
        self
    }

    /// Sets the canonical OpenRTB form.
    #[must_use]
    pub fn openrtb(mut self, request: openrtb::BidRequest) -> Self {
        self.openrtb = Some(request);
        self
    }

    /// Freezes the request.
    #[must_use]
    pub fn build(self) -> BidRequest {
        BidRequest {
            exchange: self.exchange.unwrap_or_else(Exchange::none),
            http_request: self
                .http_request
                .unwrap_or_else(|| http::Request::new(Bytes::new())),
            native_request: self.native_request,
            openrtb: self.openrtb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidpipe_openrtb::Banner;

    fn canonical() -> openrtb::BidRequest {
        openrtb::BidRequest {
            imp: vec![Imp {
                banner: Some(Banner::default()),
                ..Imp::new("1")
            }],
            ..openrtb::BidRequest::new("req-1")
        }
    }

    #[test]
    fn test_defaults() {
        let request = BidRequest::builder().build();
        assert!(request.exchange().is_none());
        assert!(!request.has_openrtb());
        assert_eq!(request.openrtb().unwrap_err(), ModelError::OpenRtbUnavailable);
        assert_eq!(request.imps().unwrap_err(), ModelError::OpenRtbUnavailable);
    }

    #[test]
    fn test_canonical_queries() {
        let request = BidRequest::builder()
            .exchange(Exchange::new("adx"))
            .openrtb(canonical())
            .build();
        assert!(request.has_openrtb());
        assert_eq!(request.imps().unwrap().len(), 1);
        assert!(request.imp_with_id("1").unwrap().is_some());
        assert_eq!(request.banner_imps().unwrap().count(), 1);
        assert_eq!(request.video_imps().unwrap().count(), 0);
    }

    #[test]
    fn test_native_request_typed_access() {
        #[derive(Debug, PartialEq)]
        struct NativeMessage(u32);

        let request = BidRequest::builder()
            .native_request(NativeMessage(7))
            .build();
        assert_eq!(request.native_request::<NativeMessage>(), Some(&NativeMessage(7)));
        assert!(request.native_request::<String>().is_none());

        let without = BidRequest::builder().build();
        assert!(without.native_request::<NativeMessage>().is_none());
    }
}
