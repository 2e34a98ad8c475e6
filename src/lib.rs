//! # crowdmap
//!
//! Viewport query and overlay engine for a crowd-congestion map.
//!
//! Camera telemetry flows through a gated, debounced [`pipeline`] into
//! cancel-on-new-request fetches of official and user-reported places. The
//! results are bound to per-group render layers by the [`overlay`] engine,
//! which creates every style and layer at most once and routes marker taps
//! back to the [`controller`], where the mode and panel state machine lives.

pub mod controller;
pub mod core;
pub mod data;
pub mod layers;
pub mod notice;
pub mod overlay;
pub mod pipeline;
pub mod prelude;
pub mod runtime;
pub mod services;
pub mod spatial;
pub mod traits;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::EngineConfig,
    geo::LatLng,
    viewport::{CameraStop, ViewportRect, ZoomLevel},
};

pub use controller::{MapController, MapMode, PanelExtent, PanelState};

pub use data::model::{ClusterItem, CongestionLevel, PlaceDetail, PlaceItem, PlaceKind, PlaceRef};

pub use layers::base::LayerTrait;

pub use notice::{Notice, NoticeKind};

pub use overlay::{ItemKind, OverlayGroup, OverlayManager};

pub use pipeline::{PipelineHandle, PlaceBatch, ViewportPipeline, ViewportQuery};

pub use services::{HttpPlaceService, LocationProvider, ManualLocationProvider, PlaceService};

pub use spatial::{clustering::Clusterer, index::SpatialIndex};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Location unavailable")]
    LocationUnavailable,

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Initialises `env_logger` from `RUST_LOG`; repeated calls are ignored
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}
