//! # bidpipe-openrtb
//!
//! Canonical, vendor-neutral auction schema used uniformly across exchanges.
//!
//! Every exchange adapter maps its native wire format into these types before
//! the interceptor pipeline runs, so interceptors can be written once against
//! a single schema. The model follows the OpenRTB 2.x JSON shape at the depth
//! the pipeline needs: a [`BidRequest`] carries impressions ([`Imp`]) that may
//! hold a [`Banner`] or [`Video`] placement, and a [`BidResponse`] groups
//! [`Bid`]s into named seats ([`SeatBid`]), with one implicit anonymous seat.
//!
//! Besides the plain data types, this crate provides the query and bulk-update
//! operations the pipeline relies on:
//!
//! - request side: find impressions by id, filter by predicate, classify by
//!   placement kind ([`BidRequest::banner_imps`], [`BidRequest::video_imps`]);
//! - response side: get-or-create seat groups, find bids by id or ad id,
//!   [`BidResponse::filter_bids`] (removes and reports whether anything was
//!   removed) and [`BidResponse::update_bids`] (applies a function and reports
//!   whether anything changed).
//!
//! All operations are pure over the builder state at call time and keep seat
//! groups in declaration order.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod request;
pub mod response;

pub use request::{Banner, BidRequest, Imp, Video};
pub use response::{Bid, BidResponse, SeatBid};
