//! Core constants for viewport querying and overlay rendering.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Camera stops below this zoom never reach the backend.
pub const MIN_QUERY_ZOOM: u8 = 11;

/// Highest zoom level a camera can report.
pub const MAX_ZOOM: u8 = 22;

/// Quiescence window applied to accepted camera stops.
pub const DEBOUNCE_MS: u64 = 250;

/// Decimal digits at which viewport rectangles are compared.
pub const COORDINATE_PRECISION: u32 = 6;

/// How long a device fix is usable as a distance-ranking anchor.
pub const LOCATION_TTL_SECS: u64 = 300;

/// Upper bound on a manual "my location" refresh.
pub const LOCATE_TIMEOUT_SECS: u64 = 120;

/// Digits used when deriving cluster marker identities from coordinates.
pub const CLUSTER_ID_PRECISION: u32 = 5;

/// Pixel radius within which user reports collapse into one cluster.
pub const CLUSTER_RADIUS_PX: f64 = 60.0;

/// At and above this zoom every report is drawn individually.
pub const CLUSTER_DISABLE_ZOOM: u8 = 17;

/// Base z-order for overlay layers; each group stacks above this.
pub const OVERLAY_BASE_Z: i32 = 100;
