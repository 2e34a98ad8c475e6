use crate::core::constants::{COORDINATE_PRECISION, MAX_ZOOM};
use crate::core::geo::LatLng;
use crate::traits::GeometryOps;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Axis-aligned geographic bounding box of the visible map area.
///
/// Equality and hashing are evaluated at [`COORDINATE_PRECISION`] decimal
/// digits so that floating point jitter from camera settles does not
/// produce distinct rectangles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewportRect {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl ViewportRect {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Builds a rectangle spanning two opposite corners
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self::new(
            a.lng.min(b.lng),
            a.lat.min(b.lat),
            a.lng.max(b.lng),
            a.lat.max(b.lat),
        )
    }

    /// Builds a rectangle of the given angular span around a center
    pub fn around(center: LatLng, lat_span: f64, lng_span: f64) -> Self {
        Self::new(
            center.lng - lng_span / 2.0,
            center.lat - lat_span / 2.0,
            center.lng + lng_span / 2.0,
            center.lat + lat_span / 2.0,
        )
    }

    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    fn key(&self) -> [i64; 4] {
        let (south, west) = self.south_west().truncated(COORDINATE_PRECISION);
        let (north, east) = self.north_east().truncated(COORDINATE_PRECISION);
        [west, south, east, north]
    }

    /// Whether both rectangles agree through `digits` decimal places
    pub fn same_at_precision(&self, other: &ViewportRect, digits: u32) -> bool {
        self.south_west().truncated(digits) == other.south_west().truncated(digits)
            && self.north_east().truncated(digits) == other.north_east().truncated(digits)
    }
}

impl PartialEq for ViewportRect {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ViewportRect {}

impl Hash for ViewportRect {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl GeometryOps<LatLng> for ViewportRect {
    fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    fn is_valid(&self) -> bool {
        self.west <= self.east
            && self.south <= self.north
            && self.south_west().is_valid()
            && self.north_east().is_valid()
    }
}

/// Integer map zoom level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ZoomLevel(pub u8);

impl ZoomLevel {
    pub fn new(level: u8) -> Self {
        Self(level.min(MAX_ZOOM))
    }

    /// Converts the fractional zoom reported by a camera into a level.
    ///
    /// Fractional zooms are floored, so 10.9 is still level 10.
    pub fn from_camera(zoom: f64) -> Self {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Self(0);
        }
        Self::new(zoom.floor().min(MAX_ZOOM as f64) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "z{}", self.0)
    }
}

/// Notification that the camera settled after a pan or zoom gesture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraStop {
    pub rect: ViewportRect,
    pub zoom: ZoomLevel,
}

impl CameraStop {
    pub fn new(rect: ViewportRect, zoom: ZoomLevel) -> Self {
        Self { rect, zoom }
    }

    pub fn center(&self) -> LatLng {
        self.rect.center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_equality_ignores_jitter() {
        let a = ViewportRect::new(126.9700001, 37.5600002, 126.9900003, 37.5700004);
        let b = ViewportRect::new(126.9700004, 37.5600009, 126.9900008, 37.5700001);
        assert_eq!(a, b);

        let c = ViewportRect::new(126.9700101, 37.5600002, 126.9900003, 37.5700004);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rect_equality_across_rounding_boundary() {
        let a = ViewportRect::new(126.9000004, 37.5500000, 126.9200000, 37.5700000);
        let b = ViewportRect::new(126.9000006, 37.5500000, 126.9200000, 37.5700000);
        assert_eq!(a, b);
        assert!(a.same_at_precision(&b, 6));

        let mut seen = crate::prelude::HashSet::default();
        seen.insert(a);
        assert!(!seen.insert(b));

        let c = ViewportRect::new(126.9000016, 37.5500000, 126.9200000, 37.5700000);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rect_center_and_validity() {
        let rect = ViewportRect::new(126.0, 37.0, 128.0, 38.0);
        assert_eq!(rect.center(), LatLng::new(37.5, 127.0));
        assert!(rect.is_valid());
        assert!(!ViewportRect::new(128.0, 37.0, 126.0, 38.0).is_valid());
        assert!(!ViewportRect::new(126.0, 37.0, 128.0, 95.0).is_valid());
    }

    #[test]
    fn test_rect_from_corners_normalizes() {
        let rect = ViewportRect::from_corners(LatLng::new(38.0, 128.0), LatLng::new(37.0, 126.0));
        assert_eq!(rect, ViewportRect::new(126.0, 37.0, 128.0, 38.0));
    }

    #[test]
    fn test_zoom_from_camera() {
        assert_eq!(ZoomLevel::from_camera(10.9), ZoomLevel(10));
        assert_eq!(ZoomLevel::from_camera(11.0), ZoomLevel(11));
        assert_eq!(ZoomLevel::from_camera(-2.0), ZoomLevel(0));
        assert_eq!(ZoomLevel::from_camera(40.0), ZoomLevel(MAX_ZOOM));
    }
}
