//! Configuration for the viewport query pipeline, clustering, backend and controller
//!
//! Every section can be deserialized from JSON with missing fields falling back
//! to their defaults, or resolved from an [`EngineProfile`] preset.

use crate::core::constants::{
    CLUSTER_DISABLE_ZOOM, CLUSTER_RADIUS_PX, COORDINATE_PRECISION, DEBOUNCE_MS,
    LOCATE_TIMEOUT_SECS, LOCATION_TTL_SECS, MIN_QUERY_ZOOM,
};
use crate::core::viewport::ZoomLevel;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineProfile {
    Balanced,
    LowBandwidth,
    Responsive,
    Custom(EngineConfig),
}

impl EngineProfile {
    pub fn resolve(&self) -> EngineConfig {
        match self {
            Self::Balanced => EngineConfig::default(),
            Self::LowBandwidth => EngineConfig {
                pipeline: PipelineConfig::low_bandwidth(),
                clustering: ClusteringConfig {
                    radius_px: 80.0,
                    ..ClusteringConfig::default()
                },
                ..EngineConfig::default()
            },
            Self::Responsive => EngineConfig {
                pipeline: PipelineConfig {
                    debounce_ms: 150,
                    ..PipelineConfig::default()
                },
                controller: ControllerConfig {
                    detail_cache_size: 128,
                    detail_ttl_secs: 120,
                },
                ..EngineConfig::default()
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pipeline: PipelineConfig,
    pub clustering: ClusteringConfig,
    pub backend: BackendConfig,
    pub controller: ControllerConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.coordinate_precision > 9 {
            return Err(MapError::Config(format!(
                "coordinate_precision {} exceeds 9 digits",
                self.pipeline.coordinate_precision
            )));
        }
        if self.clustering.radius_px <= 0.0 {
            return Err(MapError::Config("clustering radius must be positive".into()));
        }
        if self.clustering.min_cluster_size < 2 {
            return Err(MapError::Config("min_cluster_size must be at least 2".into()));
        }
        if self.controller.detail_cache_size == 0 {
            return Err(MapError::Config("detail_cache_size must be non-zero".into()));
        }
        Ok(())
    }
}

/// Gating, debounce and location settings for the viewport pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub min_query_zoom: u8,
    pub debounce_ms: u64,
    pub coordinate_precision: u32,
    pub location_ttl_secs: u64,
    pub locate_timeout_secs: u64,
}

impl PipelineConfig {
    pub fn low_bandwidth() -> Self {
        Self {
            min_query_zoom: MIN_QUERY_ZOOM + 1,
            debounce_ms: 500,
            ..Self::default()
        }
    }

    pub fn min_zoom(&self) -> ZoomLevel {
        ZoomLevel::new(self.min_query_zoom)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn location_ttl(&self) -> Duration {
        Duration::from_secs(self.location_ttl_secs)
    }

    pub fn locate_timeout(&self) -> Duration {
        Duration::from_secs(self.locate_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_query_zoom: MIN_QUERY_ZOOM,
            debounce_ms: DEBOUNCE_MS,
            coordinate_precision: COORDINATE_PRECISION,
            location_ttl_secs: LOCATION_TTL_SECS,
            locate_timeout_secs: LOCATE_TIMEOUT_SECS,
        }
    }
}

/// Configuration for clustering user reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Maximum pixel distance from a cluster seed for a report to join it
    pub radius_px: f64,
    /// Zoom level at and above which clustering is disabled
    pub disable_at_zoom: u8,
    /// Smallest group rendered as a cluster instead of individual markers
    pub min_cluster_size: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            radius_px: CLUSTER_RADIUS_PX,
            disable_at_zoom: CLUSTER_DISABLE_ZOOM,
            min_cluster_size: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            request_timeout_secs: 15,
            user_agent: concat!("crowdmap/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub detail_cache_size: usize,
    pub detail_ttl_secs: u64,
}

impl ControllerConfig {
    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            detail_cache_size: 64,
            detail_ttl_secs: 60,
        }
    }
}
