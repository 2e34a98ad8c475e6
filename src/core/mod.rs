pub mod config;
pub mod constants;
pub mod geo;
pub mod viewport;

pub use config::{
    BackendConfig, ClusteringConfig, ControllerConfig, EngineConfig, EngineProfile, PipelineConfig,
};
pub use geo::{LatLng, Point};
pub use viewport::{CameraStop, ViewportRect, ZoomLevel};
