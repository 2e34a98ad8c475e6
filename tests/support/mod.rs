//! In-memory backend shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use crowdmap::core::geo::LatLng;
use crowdmap::data::model::{
    ClusterItem, CongestionLevel, PlaceDetail, PlaceItem, PlaceKind, PlaceRef, UserPlaces,
};
use crowdmap::pipeline::ViewportQuery;
use crowdmap::services::PlaceService;
use crowdmap::{MapError, Result, ViewportRect};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct FakePlaceService {
    official: Mutex<Vec<PlaceItem>>,
    user: Mutex<UserPlaces>,
    official_calls: Mutex<Vec<ViewportQuery>>,
    user_calls: Mutex<Vec<ViewportQuery>>,
    detail_calls: AtomicUsize,
    favorite_calls: Mutex<Vec<(PlaceRef, bool)>>,
    delays: Mutex<Vec<(ViewportRect, Duration)>>,
    detail_delay: Mutex<Duration>,
    fail_official: AtomicBool,
    fail_detail: AtomicBool,
    fail_favorite: AtomicBool,
}

impl FakePlaceService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_official(places: Vec<PlaceItem>) -> Self {
        let service = Self::new();
        service.set_official(places);
        service
    }

    pub fn set_official(&self, places: Vec<PlaceItem>) {
        *self.official.lock().unwrap() = places;
    }

    pub fn set_user(&self, places: Vec<PlaceItem>, clusters: Vec<ClusterItem>) {
        *self.user.lock().unwrap() = UserPlaces { places, clusters };
    }

    /// Official and user fetches for `rect` take `delay` to resolve
    pub fn delay_for(&self, rect: ViewportRect, delay: Duration) {
        self.delays.lock().unwrap().push((rect, delay));
    }

    pub fn set_detail_delay(&self, delay: Duration) {
        *self.detail_delay.lock().unwrap() = delay;
    }

    pub fn fail_official(&self, fail: bool) {
        self.fail_official.store(fail, Ordering::SeqCst);
    }

    pub fn fail_detail(&self, fail: bool) {
        self.fail_detail.store(fail, Ordering::SeqCst);
    }

    pub fn fail_favorite(&self, fail: bool) {
        self.fail_favorite.store(fail, Ordering::SeqCst);
    }

    pub fn official_calls(&self) -> Vec<ViewportQuery> {
        self.official_calls.lock().unwrap().clone()
    }

    pub fn user_calls(&self) -> Vec<ViewportQuery> {
        self.user_calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn favorite_calls(&self) -> Vec<(PlaceRef, bool)> {
        self.favorite_calls.lock().unwrap().clone()
    }

    fn delay(&self, rect: &ViewportRect) -> Option<Duration> {
        self.delays
            .lock()
            .unwrap()
            .iter()
            .find(|(r, _)| r == rect)
            .map(|(_, d)| *d)
    }

    fn unavailable() -> MapError {
        MapError::Backend {
            status: 503,
            message: "service unavailable".to_string(),
        }
    }
}

#[async_trait]
impl PlaceService for FakePlaceService {
    async fn official_places(&self, query: &ViewportQuery) -> Result<Vec<PlaceItem>> {
        self.official_calls.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delay(&query.rect) {
            tokio::time::sleep(delay).await;
        }
        if self.fail_official.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.official.lock().unwrap().clone())
    }

    async fn user_places(&self, query: &ViewportQuery) -> Result<UserPlaces> {
        self.user_calls.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delay(&query.rect) {
            tokio::time::sleep(delay).await;
        }
        Ok(self.user.lock().unwrap().clone())
    }

    async fn place_detail(&self, place: &PlaceRef) -> Result<PlaceDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.detail_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_detail.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(PlaceDetail {
            place: place.clone(),
            name: format!("Detail {}", place.id),
            congestion: Some(CongestionLevel::Busy),
            congestion_message: Some("Getting busy".to_string()),
            demographics: Vec::new(),
            forecast: Vec::new(),
            is_favorite: false,
        })
    }

    async fn set_favorite(&self, place: &PlaceRef, favorite: bool) -> Result<()> {
        self.favorite_calls.lock().unwrap().push((place.clone(), favorite));
        if self.fail_favorite.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }
}

pub fn official(id: &str, lat: f64, lng: f64) -> PlaceItem {
    PlaceItem::new(PlaceKind::Official, id, format!("Official {}", id), LatLng::new(lat, lng))
        .with_congestion(CongestionLevel::Normal)
}

pub fn report(id: &str, lat: f64, lng: f64, level: CongestionLevel) -> PlaceItem {
    PlaceItem::new(PlaceKind::User, id, format!("Report {}", id), LatLng::new(lat, lng))
        .with_congestion(level)
}

/// A 0.02° square rect whose west edge is `west`
pub fn rect(west: f64) -> ViewportRect {
    ViewportRect::new(west, 37.55, west + 0.02, 37.57)
}
