//! Domain records shared by the pipeline, the overlay engine and the controller.

use crate::core::geo::LatLng;
use serde::{Deserialize, Serialize};

/// Crowd congestion reported for a place, ordered from calmest to busiest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionLevel {
    Relaxed,
    Normal,
    Busy,
    Crowded,
}

impl CongestionLevel {
    pub const ALL: [CongestionLevel; 4] = [
        CongestionLevel::Relaxed,
        CongestionLevel::Normal,
        CongestionLevel::Busy,
        CongestionLevel::Crowded,
    ];

    /// Maps a server label to a level; unknown labels yield `None`
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "relaxed" | "RELAXED" | "여유" => Some(Self::Relaxed),
            "normal" | "NORMAL" | "보통" => Some(Self::Normal),
            "busy" | "BUSY" | "약간 붐빔" => Some(Self::Busy),
            "crowded" | "CROWDED" | "붐빔" => Some(Self::Crowded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relaxed => "relaxed",
            Self::Normal => "normal",
            Self::Busy => "busy",
            Self::Crowded => "crowded",
        }
    }
}

impl std::fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which backend source a place comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceKind {
    Official,
    User,
}

impl PlaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Official => "official",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for PlaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a place across both sources
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceRef {
    pub kind: PlaceKind,
    pub id: String,
}

impl PlaceRef {
    pub fn new(kind: PlaceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn official(id: impl Into<String>) -> Self {
        Self::new(PlaceKind::Official, id)
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(PlaceKind::User, id)
    }
}

impl std::fmt::Display for PlaceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// An officially tracked or user-reported place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceItem {
    /// Unique within `kind`
    pub id: String,
    pub kind: PlaceKind,
    pub coordinate: LatLng,
    pub name: String,
    pub congestion: Option<CongestionLevel>,
    /// Epoch milliseconds of the last observation
    pub last_observed_at: Option<i64>,
    pub is_favorite: bool,
    /// Outline of the tracked area (official places only)
    pub area: Option<Vec<LatLng>>,
}

impl PlaceItem {
    pub fn new(kind: PlaceKind, id: impl Into<String>, name: impl Into<String>, coordinate: LatLng) -> Self {
        Self {
            id: id.into(),
            kind,
            coordinate,
            name: name.into(),
            congestion: None,
            last_observed_at: None,
            is_favorite: false,
            area: None,
        }
    }

    pub fn with_congestion(mut self, level: CongestionLevel) -> Self {
        self.congestion = Some(level);
        self
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.is_favorite = favorite;
        self
    }

    pub fn with_area(mut self, ring: Vec<LatLng>) -> Self {
        self.area = Some(ring);
        self
    }

    pub fn place_ref(&self) -> PlaceRef {
        PlaceRef::new(self.kind, self.id.clone())
    }
}

/// Several nearby reports drawn as one marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterItem {
    pub coordinate: LatLng,
    pub count: usize,
    /// Congestion used to pick the cluster style
    pub congestion: Option<CongestionLevel>,
    /// Ids of the member places; empty for server-side summaries
    pub member_ids: Vec<String>,
}

impl ClusterItem {
    /// Aggregated by the backend rather than from local places
    pub fn is_server_summary(&self) -> bool {
        self.member_ids.is_empty()
    }
}

/// Result of a user-reported place query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserPlaces {
    pub places: Vec<PlaceItem>,
    /// Summaries the backend already aggregated
    pub clusters: Vec<ClusterItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicShare {
    pub label: String,
    /// Share in the range 0.0..=1.0
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Epoch milliseconds
    pub at: i64,
    pub congestion: Option<CongestionLevel>,
}

/// Detail record shown in the panel after a marker tap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetail {
    pub place: PlaceRef,
    pub name: String,
    pub congestion: Option<CongestionLevel>,
    pub congestion_message: Option<String>,
    pub demographics: Vec<DemographicShare>,
    pub forecast: Vec<ForecastPoint>,
    pub is_favorite: bool,
}
