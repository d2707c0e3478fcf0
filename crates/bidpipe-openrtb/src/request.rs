//! Canonical bid request: the auction and its biddable impressions.

use serde::{Deserialize, Serialize};

/// A bid opportunity sent by an exchange.
///
/// Requests are built once by the exchange adapter and are read-only for the
/// rest of the pipeline; every query method here is side-effect free.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidRequest {
    /// Unique request id, assigned by the exchange.
    pub id: String,

    /// Biddable impressions; ids are unique within the request.
    #[serde(default)]
    pub imp: Vec<Imp>,

    /// Test-mode flag (1 = not billable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<i32>,

    /// Auction type (1 = first price, 2 = second price).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<i32>,

    /// Maximum time in milliseconds the exchange waits for the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmax: Option<u64>,

    /// Allowed currencies, ISO-4217 codes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cur: Option<Vec<String>>,

    /// Blocked advertiser categories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcat: Option<Vec<String>>,

    /// Blocked advertiser domains.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badv: Option<Vec<String>>,
}

impl BidRequest {
    /// Creates an empty request with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Returns all impressions.
    #[must_use]
    pub fn imps(&self) -> &[Imp] {
        &self.imp
    }

    /// Returns all impressions that pass the predicate.
    pub fn imps_with<P>(&self, mut predicate: P) -> impl Iterator<Item = &Imp>
    where
        P: FnMut(&Imp) -> bool,
    {
        self.imp.iter().filter(move |imp| predicate(imp))
    }

    /// Finds an impression by id.
    #[must_use]
    pub fn imp_with_id(&self, id: &str) -> Option<&Imp> {
        self.imp.iter().find(|imp| imp.id == id)
    }

    /// Returns all impressions carrying a banner placement.
    pub fn banner_imps(&self) -> impl Iterator<Item = &Imp> {
        self.imp.iter().filter(|imp| imp.has_banner())
    }

    /// Returns all banner impressions that pass the predicate.
    ///
    /// The predicate is invoked only on impressions that carry a banner.
    pub fn banner_imps_with<P>(&self, mut predicate: P) -> impl Iterator<Item = &Imp>
    where
        P: FnMut(&Imp) -> bool,
    {
        self.imp
            .iter()
            .filter(move |imp| imp.has_banner() && predicate(imp))
    }

    /// Returns all impressions carrying a video placement.
    pub fn video_imps(&self) -> impl Iterator<Item = &Imp> {
        self.imp.iter().filter(|imp| imp.has_video())
    }

    /// Returns all video impressions that pass the predicate.
    ///
    /// The predicate is invoked only on impressions that carry a video.
    pub fn video_imps_with<P>(&self, mut predicate: P) -> impl Iterator<Item = &Imp>
    where
        P: FnMut(&Imp) -> bool,
    {
        self.imp
            .iter()
            .filter(move |imp| imp.has_video() && predicate(imp))
    }

    /// Finds an impression by its id and its banner's id.
    ///
    /// `imp_id` may be `None` when banner ids are unique within the request.
    #[must_use]
    pub fn banner_imp_with_id(&self, imp_id: Option<&str>, banner_id: &str) -> Option<&Imp> {
        self.imp.iter().find(|imp| {
            imp_id.map_or(true, |id| imp.id == id)
                && imp
                    .banner
                    .as_ref()
                    .is_some_and(|banner| banner.id.as_deref() == Some(banner_id))
        })
    }
}

/// One biddable ad placement within a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Imp {
    /// Placement id, unique within the request.
    pub id: String,

    /// Banner placement, if this is a display opportunity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,

    /// Video placement, if this is a video opportunity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,

    /// Minimum CPM the exchange will accept.
    #[serde(default)]
    pub bidfloor: f64,

    /// Currency of `bidfloor`, ISO-4217 code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidfloorcur: Option<String>,
}

impl Imp {
    /// Creates an empty impression with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if this impression carries a banner placement.
    #[must_use]
    pub fn has_banner(&self) -> bool {
        self.banner.is_some()
    }

    /// Returns `true` if this impression carries a video placement.
    #[must_use]
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }
}

/// A display (banner) placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    /// Banner id, unique within the request when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Exact width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<i32>,

    /// Exact height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<i32>,

    /// Minimum width in pixels, for flexible sizes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wmin: Option<i32>,

    /// Maximum width in pixels, for flexible sizes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wmax: Option<i32>,

    /// Minimum height in pixels, for flexible sizes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hmin: Option<i32>,

    /// Maximum height in pixels, for flexible sizes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hmax: Option<i32>,

    /// Ad position on screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<i32>,
}

/// A video placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// Supported content MIME types.
    #[serde(default)]
    pub mimes: Vec<String>,

    /// Minimum ad duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minduration: Option<i32>,

    /// Maximum ad duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxduration: Option<i32>,

    /// Player width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<i32>,

    /// Player height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<i32>,

    /// Supported video protocols.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<i32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banner_imp(id: &str, banner_id: Option<&str>) -> Imp {
        Imp {
            banner: Some(Banner {
                id: banner_id.map(str::to_owned),
                w: Some(300),
                h: Some(250),
                ..Banner::default()
            }),
            ..Imp::new(id)
        }
    }

    fn video_imp(id: &str) -> Imp {
        Imp {
            video: Some(Video {
                mimes: vec!["video/mp4".to_owned()],
                w: Some(640),
                h: Some(480),
                ..Video::default()
            }),
            ..Imp::new(id)
        }
    }

    fn request() -> BidRequest {
        BidRequest {
            imp: vec![banner_imp("1", Some("b1")), video_imp("2"), banner_imp("3", None)],
            ..BidRequest::new("req-1")
        }
    }

    #[test]
    fn test_imp_with_id() {
        let request = request();
        assert_eq!(request.imp_with_id("2").map(|imp| imp.id.as_str()), Some("2"));
        assert!(request.imp_with_id("nope").is_none());
    }

    #[test]
    fn test_imps_with_predicate() {
        let request = request();
        let floors: Vec<&str> = request
            .imps_with(|imp| imp.id != "2")
            .map(|imp| imp.id.as_str())
            .collect();
        assert_eq!(floors, vec!["1", "3"]);
    }

    #[test]
    fn test_banner_and_video_classification() {
        let request = request();
        let banners: Vec<&str> = request.banner_imps().map(|imp| imp.id.as_str()).collect();
        let videos: Vec<&str> = request.video_imps().map(|imp| imp.id.as_str()).collect();
        assert_eq!(banners, vec!["1", "3"]);
        assert_eq!(videos, vec!["2"]);
    }

    #[test]
    fn test_banner_imps_with_only_sees_banners() {
        let request = request();
        let mut seen = Vec::new();
        let _count = request
            .banner_imps_with(|imp| {
                seen.push(imp.id.clone());
                true
            })
            .count();
        assert_eq!(seen, vec!["1", "3"]);
    }

    #[test]
    fn test_banner_imp_with_id() {
        let request = request();
        assert!(request.banner_imp_with_id(Some("1"), "b1").is_some());
        assert!(request.banner_imp_with_id(None, "b1").is_some());
        assert!(request.banner_imp_with_id(Some("3"), "b1").is_none());
        assert!(request.banner_imp_with_id(None, "missing").is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let json = r#"{
            "id": "abc",
            "imp": [{"id": "1", "banner": {"w": 728, "h": 90}, "bidfloor": 0.5}],
            "tmax": 100
        }"#;
        let request: BidRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.id, "abc");
        assert_eq!(request.tmax, Some(100));
        assert_eq!(request.imp[0].bidfloor, 0.5);
        assert!(request.imp[0].has_banner());

        let encoded = serde_json::to_string(&request).unwrap();
        let decoded: BidRequest = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, request);
    }
}
