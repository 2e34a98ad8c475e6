pub mod conversion;
pub mod model;

pub use model::{
    ClusterItem, CongestionLevel, DemographicShare, ForecastPoint, PlaceDetail, PlaceItem,
    PlaceKind, PlaceRef, UserPlaces,
};
