//! Prelude module for common crowdmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use crowdmap::prelude::*;`

pub use crate::core::{
    config::{
        BackendConfig, ClusteringConfig, ControllerConfig, EngineConfig, EngineProfile,
        PipelineConfig,
    },
    geo::{LatLng, Point},
    viewport::{CameraStop, ViewportRect, ZoomLevel},
};

pub use crate::data::model::{
    ClusterItem, CongestionLevel, PlaceDetail, PlaceItem, PlaceKind, PlaceRef, UserPlaces,
};

pub use crate::layers::{
    base::LayerTrait, manager::LayerManager, marker::Marker, vector::PolygonShape,
};

pub use crate::overlay::{
    GroupVisual, ItemKind, OverlayGroup, OverlayManager, PolygonItem, StyleKey, TapHandler,
};

pub use crate::spatial::{ClusterOutcome, Clusterer};

pub use crate::pipeline::{PipelineHandle, PlaceBatch, ViewportPipeline, ViewportQuery};

pub use crate::services::{
    location::{LocationFix, LocationProvider, ManualLocationProvider},
    PlaceService,
};

pub use crate::controller::{
    panel::{MapMode, PanelExtent, PanelState},
    MapController,
};

pub use crate::notice::{Notice, NoticeKind, NoticeReceiver};

pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner, TokioSpawner};

pub use crate::traits::{Configurable, GeometryOps};

pub use crate::{MapError, Result};

pub use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

pub use futures::Future;
pub use std::pin::Pin;
