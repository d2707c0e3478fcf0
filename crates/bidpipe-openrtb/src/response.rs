//! Canonical bid response: bids grouped into seats.

use serde::{Deserialize, Serialize};

/// A priced response to a [`crate::BidRequest`].
///
/// Bids are owned by seat groups; `seat == None` is the implicit anonymous
/// seat. Groups are kept in creation order and all multi-seat iteration
/// follows that order. The response is mutated progressively by the pipeline;
/// wire encoding only happens after the pipeline completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidResponse {
    /// Id of the bid request this responds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Seat groups, in creation order.
    #[serde(default)]
    pub seatbid: Vec<SeatBid>,

    /// Bidder-generated response id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidid: Option<String>,

    /// Bid currency, ISO-4217 code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cur: Option<String>,

    /// Reason for not bidding, when the response carries no bids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbr: Option<i32>,
}

impl BidResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the seat group for `seat`, creating it if absent.
    ///
    /// `None` selects the anonymous seat. Named seats should be present in
    /// the request's allowed-seat list, but that is not enforced here.
    pub fn seat_bid(&mut self, seat: Option<&str>) -> &mut SeatBid {
        let pos = match self
            .seatbid
            .iter()
            .position(|group| group.seat.as_deref() == seat)
        {
            Some(pos) => pos,
            None => {
                self.seatbid.push(SeatBid {
                    seat: seat.map(str::to_owned),
                    bid: Vec::new(),
                });
                self.seatbid.len() - 1
            }
        };
        &mut self.seatbid[pos]
    }

    /// Adds a bid to the anonymous seat.
    pub fn add_bid(&mut self, bid: Bid) -> &mut Self {
        self.seat_bid(None).bid.push(bid);
        self
    }

    /// Adds a bid to a named seat, creating the seat group if absent.
    pub fn add_seat_bid(&mut self, seat: &str, bid: Bid) -> &mut Self {
        self.seat_bid(Some(seat)).bid.push(bid);
        self
    }

    /// Iterates all bids, grouped by seat in declaration order.
    pub fn bids(&self) -> impl Iterator<Item = &Bid> {
        self.seatbid.iter().flat_map(|group| group.bid.iter())
    }

    /// Iterates all bids mutably, grouped by seat in declaration order.
    pub fn bids_mut(&mut self) -> impl Iterator<Item = &mut Bid> {
        self.seatbid.iter_mut().flat_map(|group| group.bid.iter_mut())
    }

    /// Returns the bids of one seat, or an empty slice if the seat has no
    /// group yet. `None` selects the anonymous seat.
    #[must_use]
    pub fn bids_in(&self, seat: Option<&str>) -> &[Bid] {
        self.seatbid
            .iter()
            .find(|group| group.seat.as_deref() == seat)
            .map_or(&[], |group| group.bid.as_slice())
    }

    /// Finds a bid by id across all seats.
    ///
    /// Bid ids are assumed unique within the response.
    pub fn bid_with_id(&mut self, id: &str) -> Option<&mut Bid> {
        self.bids_mut().find(|bid| bid.id == id)
    }

    /// Finds a bid by id within one seat.
    pub fn bid_with_id_in(&mut self, seat: Option<&str>, id: &str) -> Option<&mut Bid> {
        self.seatbid
            .iter_mut()
            .find(|group| group.seat.as_deref() == seat)
            .and_then(|group| group.bid.iter_mut().find(|bid| bid.id == id))
    }

    /// Finds a bid by ad id across all seats.
    pub fn bid_with_adid(&mut self, adid: &str) -> Option<&mut Bid> {
        self.bids_mut().find(|bid| bid.adid.as_deref() == Some(adid))
    }

    /// Finds a bid by ad id within one seat.
    pub fn bid_with_adid_in(&mut self, seat: Option<&str>, adid: &str) -> Option<&mut Bid> {
        self.seatbid
            .iter_mut()
            .find(|group| group.seat.as_deref() == seat)
            .and_then(|group| {
                group
                    .bid
                    .iter_mut()
                    .find(|bid| bid.adid.as_deref() == Some(adid))
            })
    }

    /// Iterates all bids that pass the predicate, grouped by seat.
    pub fn bids_with<P>(&self, mut predicate: P) -> impl Iterator<Item = &Bid>
    where
        P: FnMut(&Bid) -> bool,
    {
        self.bids().filter(move |bid| predicate(bid))
    }

    /// Applies `updater` to every bid in every seat.
    ///
    /// The updater returns whether it changed the bid; the result is `true`
    /// if at least one bid was changed.
    pub fn update_bids<F>(&mut self, mut updater: F) -> bool
    where
        F: FnMut(&mut Bid) -> bool,
    {
        let mut updated = false;
        for bid in self.bids_mut() {
            updated |= updater(bid);
        }
        updated
    }

    /// Applies `updater` to every bid of one seat.
    ///
    /// Returns `true` if at least one bid was changed. A seat with no group
    /// yields `false` without invoking the updater.
    pub fn update_bids_in<F>(&mut self, seat: Option<&str>, mut updater: F) -> bool
    where
        F: FnMut(&mut Bid) -> bool,
    {
        let mut updated = false;
        if let Some(group) = self
            .seatbid
            .iter_mut()
            .find(|group| group.seat.as_deref() == seat)
        {
            for bid in &mut group.bid {
                updated |= updater(bid);
            }
        }
        updated
    }

    /// Removes every bid failing the predicate, in every seat.
    ///
    /// Returns `true` if at least one bid was removed. Seat groups emptied by
    /// the filter are retained.
    pub fn filter_bids<P>(&mut self, mut predicate: P) -> bool
    where
        P: FnMut(&Bid) -> bool,
    {
        let mut removed = false;
        for group in &mut self.seatbid {
            let before = group.bid.len();
            group.bid.retain(|bid| predicate(bid));
            removed |= group.bid.len() != before;
        }
        removed
    }

    /// Removes every bid failing the predicate within one seat.
    ///
    /// Returns `true` if at least one bid was removed.
    pub fn filter_bids_in<P>(&mut self, seat: Option<&str>, mut predicate: P) -> bool
    where
        P: FnMut(&Bid) -> bool,
    {
        self.seatbid
            .iter_mut()
            .find(|group| group.seat.as_deref() == seat)
            .is_some_and(|group| {
                let before = group.bid.len();
                group.bid.retain(|bid| predicate(bid));
                group.bid.len() != before
            })
    }
}

/// A group of bids owned by one seat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeatBid {
    /// Seat id; `None` is the anonymous seat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,

    /// Bids in this group.
    #[serde(default)]
    pub bid: Vec<Bid>,
}

/// One priced offer for one impression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Bidder-generated bid id.
    pub id: String,

    /// Id of the impression this bid is for.
    pub impid: String,

    /// Bid price, CPM.
    #[serde(default)]
    pub price: f64,

    /// Advertiser ad id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adid: Option<String>,

    /// Win notice URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nurl: Option<String>,

    /// Ad markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adm: Option<String>,

    /// Advertiser domains, for block-list checking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adomain: Option<Vec<String>>,

    /// Campaign id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,

    /// Creative id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crid: Option<String>,

    /// Deal id, for private marketplace bids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealid: Option<String>,

    /// Creative width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<i32>,

    /// Creative height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<i32>,
}

impl Bid {
    /// Creates a bid for an impression with the given id and price.
    #[must_use]
    pub fn new(id: impl Into<String>, impid: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            impid: impid.into(),
            price,
            ..Self::default()
        }
    }
}
