//! A bidder whose behavior is entirely driven by configuration.

use anyhow::ensure;
use bidpipe_api::{BidChain, BidRequest, BidResponse, Interceptor, InterceptorError};
use bidpipe_openrtb::{Bid, Imp};
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

/// How to pick the creative size for banner bids when the placement does
/// not pin an exact size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeChoice {
    /// Bid with the placement's minimum size.
    Min,
    /// Bid with the placement's maximum size.
    Max,
    /// Bid with a random size among the placement's exact sizes.
    Random,
    /// Emit one bid per exact size the placement offers.
    All,
}

/// Configuration for [`ConfigurableBidInterceptor`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigurableBidOptions {
    /// Prototype bid; its id, impid, price and size are overwritten per
    /// impression, everything else (markup, advertiser domains, ...) is
    /// copied as-is.
    pub prototype: Bid,

    /// CPM = impression floor times this; defaults to `1.0` when neither
    /// multiplier nor value is set.
    pub cpm_multiplier: Option<f64>,

    /// Fixed CPM. Combined with `cpm_multiplier` it acts as a price cap.
    pub cpm_value: Option<f64>,

    /// Probability in `[0, 1]` of bidding at all on a given request.
    pub bid_probability: f64,

    /// Probability in `[0, 1]` of raising a fault instead of bidding, for
    /// failure-path testing. Only effective on requests selected for
    /// bidding.
    pub error_probability: f64,

    /// Banner size selection strategy.
    pub size_choice: SizeChoice,
}

impl Default for ConfigurableBidOptions {
    fn default() -> Self {
        Self {
            prototype: Bid::default(),
            cpm_multiplier: None,
            cpm_value: None,
            bid_probability: 1.0,
            error_probability: 0.0,
            size_choice: SizeChoice::Random,
        }
    }
}

/// An interceptor that bids with values determined by configuration.
///
/// Useful for general testing, including live bidding and load tests. A
/// prototype whose markup is a URL (a VAST pointer) makes this a video
/// bidder targeting video impressions; any other markup targets banner
/// impressions.
#[derive(Debug)]
pub struct ConfigurableBidInterceptor {
    options: ConfigurableBidOptions,
    is_video: bool,
}

impl ConfigurableBidInterceptor {
    /// Validates the configuration and builds the bidder.
    pub fn new(mut options: ConfigurableBidOptions) -> anyhow::Result<Self> {
        ensure!(
            options.cpm_multiplier.map_or(true, |m| m >= 0.0),
            "cpm_multiplier must be non-negative"
        );
        ensure!(
            options.cpm_value.map_or(true, |v| v >= 0.0),
            "cpm_value must be non-negative"
        );
        ensure!(
            (0.0..=1.0).contains(&options.bid_probability),
            "bid_probability must be within [0, 1]"
        );
        ensure!(
            (0.0..=1.0).contains(&options.error_probability),
            "error_probability must be within [0, 1]"
        );
        if options.cpm_multiplier.is_none() && options.cpm_value.is_none() {
            options.cpm_multiplier = Some(1.0);
        }

        let is_video = options
            .prototype
            .adm
            .as_deref()
            .map_or(false, |adm| adm.starts_with("http"));
        debug!(
            video = is_video,
            probability = options.bid_probability,
            "configurable bidder initialized"
        );

        Ok(Self { options, is_video })
    }

    fn price(&self, floor: f64) -> f64 {
        match (self.options.cpm_multiplier, self.options.cpm_value) {
            (Some(multiplier), Some(value)) => (floor * multiplier).min(value),
            (Some(multiplier), None) => floor * multiplier,
            (None, Some(value)) => value,
            (None, None) => floor,
        }
    }

    fn bid_for(&self, imp: &Imp, w: i32, h: i32) -> Bid {
        Bid {
            id: imp.id.clone(),
            impid: imp.id.clone(),
            price: self.price(imp.bidfloor),
            w: Some(w),
            h: Some(h),
            ..self.options.prototype.clone()
        }
    }

    fn video_bids(&self, request: &BidRequest) -> Result<Vec<Bid>, InterceptorError> {
        let mut bids = Vec::new();
        for imp in request.video_imps().map_err(anyhow::Error::from)? {
            let video = imp.video.as_ref().map_or((0, 0), |video| {
                (video.w.unwrap_or(0), video.h.unwrap_or(0))
            });
            bids.push(self.bid_for(imp, video.0, video.1));
        }
        Ok(bids)
    }

    fn banner_bids(&self, request: &BidRequest, rnd: f64) -> Result<Vec<Bid>, InterceptorError> {
        let mut bids = Vec::new();
        for imp in request.banner_imps().map_err(anyhow::Error::from)? {
            let Some(banner) = imp.banner.as_ref() else {
                continue;
            };
            let widths: Vec<i32> = banner.w.into_iter().collect();
            let heights: Vec<i32> = banner.h.into_iter().collect();

            if self.options.size_choice == SizeChoice::All {
                for (w, h) in widths.iter().zip(heights.iter()) {
                    bids.push(self.bid_for(imp, *w, *h));
                }
            } else {
                let w = self.choose_size(banner.w, banner.wmin, banner.wmax, &widths, rnd);
                let h = self.choose_size(banner.h, banner.hmin, banner.hmax, &heights, rnd);
                if let (Some(w), Some(h)) = (w, h) {
                    bids.push(self.bid_for(imp, w, h));
                }
            }
        }
        Ok(bids)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn choose_size(
        &self,
        exact: Option<i32>,
        min: Option<i32>,
        max: Option<i32>,
        all: &[i32],
        rnd: f64,
    ) -> Option<i32> {
        if exact.is_some() {
            return exact;
        }
        match self.options.size_choice {
            SizeChoice::Min => min,
            SizeChoice::Max => max,
            SizeChoice::Random if !all.is_empty() => {
                let index = ((all.len() as f64 * rnd) as usize).min(all.len() - 1);
                Some(all[index])
            }
            _ => None,
        }
    }
}

impl Interceptor<BidRequest, BidResponse> for ConfigurableBidInterceptor {
    fn name(&self) -> &'static str {
        "configurable-bid"
    }

    fn execute(&self, chain: &mut BidChain<'_>) -> Result<(), InterceptorError> {
        // One roll per request, reused by SizeChoice::Random so all the
        // imps of one request get consistent sizing.
        let rnd = rand::thread_rng().gen::<f64>();

        if rnd < self.options.bid_probability {
            if rnd < self.options.error_probability {
                return Err(InterceptorError::fault(anyhow::anyhow!(
                    "injected bidding failure"
                )));
            }

            let bids = if self.is_video {
                self.video_bids(chain.request())?
            } else {
                self.banner_bids(chain.request(), rnd)?
            };
            for bid in bids {
                debug!(id = %bid.id, price = bid.price, "creating bid");
                chain.response().add_bid(bid).map_err(anyhow::Error::from)?;
            }
        }

        chain.proceed()
    }
}
