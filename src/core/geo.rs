use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Latitude limit of the Web Mercator projection
const MAX_LATITUDE: f64 = 85.0511287798;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Clamps latitude to the range Web Mercator can represent
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }

    /// Rounds both components to `digits` decimal places and returns them as integers.
    ///
    /// Two coordinates with the same quantized value are considered the same
    /// place for query and marker identity purposes.
    pub fn quantized(&self, digits: u32) -> (i64, i64) {
        let scale = 10_f64.powi(digits as i32);
        (
            (self.lat * scale).round() as i64,
            (self.lng * scale).round() as i64,
        )
    }

    /// Keeps the first `digits` decimal places and drops the rest.
    ///
    /// Unlike [`quantized`](Self::quantized), two values that agree through
    /// `digits` places always compare equal. Noise three places further out
    /// is rounded away first so that 126.9 does not truncate to 126.899999.
    pub fn truncated(&self, digits: u32) -> (i64, i64) {
        let fine = 10_f64.powi(digits as i32 + 3);
        let cut = |value: f64| (value * fine).round() as i64 / 1000;
        (cut(self.lat), cut(self.lng))
    }

    /// Projects to world pixel coordinates (256px tiles) at the given zoom level
    pub fn to_world_pixel(&self, zoom: f64) -> Point {
        let scale = 256.0 * 2_f64.powf(zoom);
        let x = (self.lng + 180.0) / 360.0 * scale;
        let sin_lat = Self::clamp_lat(self.lat).to_radians().sin();
        let y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)) * scale;
        Point::new(x, y)
    }

    /// Inverse of [`LatLng::to_world_pixel`]
    pub fn from_world_pixel(point: Point, zoom: f64) -> Self {
        let scale = 256.0 * 2_f64.powf(zoom);
        let lng = point.x / scale * 360.0 - 180.0;
        let n = PI - 2.0 * PI * point.y / scale;
        let lat = n.sinh().atan().to_degrees();
        Self::new(lat, lng)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<LatLng> for geo_types::Coord<f64> {
    fn from(value: LatLng) -> Self {
        geo_types::Coord {
            x: value.lng,
            y: value.lat,
        }
    }
}

/// Represents a point in screen or projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lng_creation() {
        let coord = LatLng::new(37.5665, 126.9780);
        assert_eq!(coord.lat, 37.5665);
        assert_eq!(coord.lng, 126.9780);
        assert!(coord.is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
    }

    #[test]
    fn test_world_pixel_round_trip() {
        let coord = LatLng::new(37.5665, 126.9780);
        let pixel = coord.to_world_pixel(14.0);
        let back = LatLng::from_world_pixel(pixel, 14.0);

        assert!((back.lat - coord.lat).abs() < 1e-9);
        assert!((back.lng - coord.lng).abs() < 1e-9);
    }

    #[test]
    fn test_world_pixel_origin() {
        let pixel = LatLng::new(0.0, 0.0).to_world_pixel(0.0);
        assert!((pixel.x - 128.0).abs() < 1e-9);
        assert!((pixel.y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_quantized_ignores_jitter() {
        let a = LatLng::new(37.12345612, 127.00000041);
        let b = LatLng::new(37.12345638, 127.00000009);
        assert_eq!(a.quantized(6), b.quantized(6));
        assert_ne!(a.quantized(7), b.quantized(7));
    }

    #[test]
    fn test_truncated_compares_leading_digits() {
        let a = LatLng::new(37.5600004, 126.9000004);
        let b = LatLng::new(37.5600006, 126.9000006);
        assert_ne!(a.quantized(6), b.quantized(6));
        assert_eq!(a.truncated(6), b.truncated(6));

        assert_eq!(LatLng::new(37.56, 126.9).truncated(6), (37_560_000, 126_900_000));
        assert_eq!(LatLng::new(-33.8688004, -151.2093009).truncated(6), (-33_868_800, -151_209_300));
        assert_ne!(LatLng::new(0.0, 126.900001).truncated(6), LatLng::new(0.0, 126.9).truncated(6));
    }
}
