//! Wire formats exchanged with the congestion backend and their conversion
//! into domain records.

use crate::core::geo::LatLng;
use crate::data::model::{
    ClusterItem, CongestionLevel, DemographicShare, ForecastPoint, PlaceDetail, PlaceItem,
    PlaceKind, PlaceRef, UserPlaces,
};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceDto {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub congestion: Option<String>,
    pub observed_at: Option<i64>,
    pub favorite: bool,
    /// `[lat, lng]` pairs
    pub area: Option<Vec<[f64; 2]>>,
}

impl PlaceDto {
    pub fn into_item(self, kind: PlaceKind) -> Result<PlaceItem> {
        let coordinate = LatLng::new(self.lat, self.lng);
        if !coordinate.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "place {} at ({}, {})",
                self.id, self.lat, self.lng
            )));
        }
        if self.id.is_empty() {
            return Err(MapError::ParseError("place record without id".into()));
        }

        let area = self
            .area
            .map(|ring| ring.into_iter().map(|[lat, lng]| LatLng::new(lat, lng)).collect::<Vec<_>>())
            .filter(|ring| ring.len() >= 3);

        Ok(PlaceItem {
            id: self.id,
            kind,
            coordinate,
            name: self.name,
            congestion: self.congestion.as_deref().and_then(CongestionLevel::from_label),
            last_observed_at: self.observed_at,
            is_favorite: self.favorite,
            area,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterDto {
    pub lat: f64,
    pub lng: f64,
    pub count: usize,
    pub congestion: Option<String>,
}

impl From<ClusterDto> for ClusterItem {
    fn from(dto: ClusterDto) -> Self {
        ClusterItem {
            coordinate: LatLng::new(dto.lat, dto.lng),
            count: dto.count,
            congestion: dto.congestion.as_deref().and_then(CongestionLevel::from_label),
            member_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceListDto {
    pub places: Vec<PlaceDto>,
    pub clusters: Vec<ClusterDto>,
}

impl PlaceListDto {
    /// Converts every well-formed record; malformed ones are logged and skipped
    pub fn into_places(self, kind: PlaceKind) -> Vec<PlaceItem> {
        self.places
            .into_iter()
            .filter_map(|dto| match dto.into_item(kind) {
                Ok(item) => Some(item),
                Err(err) => {
                    log::warn!("skipping malformed {} place: {}", kind, err);
                    None
                }
            })
            .collect()
    }

    pub fn into_user_places(mut self) -> UserPlaces {
        let clusters = std::mem::take(&mut self.clusters)
            .into_iter()
            .filter(|c| c.count > 0)
            .map(ClusterItem::from)
            .filter(|c| c.coordinate.is_valid())
            .collect();
        UserPlaces {
            places: self.into_places(PlaceKind::User),
            clusters,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DemographicDto {
    pub label: String,
    pub ratio: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForecastDto {
    pub at: i64,
    pub congestion: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceDetailDto {
    pub id: String,
    pub name: String,
    pub congestion: Option<String>,
    pub message: Option<String>,
    pub demographics: Vec<DemographicDto>,
    pub forecast: Vec<ForecastDto>,
    pub favorite: bool,
}

impl PlaceDetailDto {
    pub fn into_detail(self, place: &PlaceRef) -> PlaceDetail {
        PlaceDetail {
            place: place.clone(),
            name: self.name,
            congestion: self.congestion.as_deref().and_then(CongestionLevel::from_label),
            congestion_message: self.message,
            demographics: self
                .demographics
                .into_iter()
                .map(|d| DemographicShare {
                    label: d.label,
                    ratio: d.ratio.clamp(0.0, 1.0),
                })
                .collect(),
            forecast: self
                .forecast
                .into_iter()
                .map(|f| ForecastPoint {
                    at: f.at,
                    congestion: f.congestion.as_deref().and_then(CongestionLevel::from_label),
                })
                .collect(),
            is_favorite: self.favorite,
        }
    }
}

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDto {
    pub message: String,
}
