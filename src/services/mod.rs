//! Backend collaborators consumed by the engine
//!
//! The engine only talks to the outside world through [`PlaceService`] and
//! [`location::LocationProvider`], so tests and hosts can swap in their own.

pub mod http;
pub mod location;

use crate::data::model::{PlaceDetail, PlaceItem, PlaceRef, UserPlaces};
use crate::pipeline::ViewportQuery;
use crate::Result;
use async_trait::async_trait;

pub use http::HttpPlaceService;
pub use location::{LocationFix, LocationProvider, ManualLocationProvider};

#[async_trait]
pub trait PlaceService: Send + Sync {
    /// Officially tracked places inside the query rect
    async fn official_places(&self, query: &ViewportQuery) -> Result<Vec<PlaceItem>>;

    /// User reports inside the query rect, possibly with server-side clusters
    async fn user_places(&self, query: &ViewportQuery) -> Result<UserPlaces>;

    async fn place_detail(&self, place: &PlaceRef) -> Result<PlaceDetail>;

    async fn set_favorite(&self, place: &PlaceRef, favorite: bool) -> Result<()>;
}
