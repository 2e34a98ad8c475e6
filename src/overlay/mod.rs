//! Overlay engine: style and layer registries, tap routing and the
//! binding facade used by the controller

pub mod group;
pub mod manager;
pub mod registry;
pub mod style;
pub mod taps;

pub use group::{parse_shape_id, shape_id, ItemKind, OverlayGroup};
pub use manager::{cluster_item_id, OverlayItem, OverlayManager, PolygonItem};
pub use registry::LayerRegistry;
pub use style::{Graphic, GroupVisual, StyleHandle, StyleKey, StyleRegistry, StyleVariant};
pub use taps::{TapDisposer, TapHandler, TapRegistry};
