//! Style keys, graphics and the registry that creates each graphic once
//!
//! A [`StyleKey`] is a small structural key (group + variant) rather than an
//! ad hoc string, so two different styles can never alias one cache slot.
//! Cluster keys carry the member count because the badge is baked into the
//! graphic.

use crate::core::constants::OVERLAY_BASE_Z;
use crate::data::model::CongestionLevel;
use crate::layers::vector::SerializableColor;
use crate::overlay::group::OverlayGroup;
use crate::prelude::{Arc, HashMap};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Visual identity of an overlay group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupVisual {
    pub icon: String,
    pub fill_color: SerializableColor,
    pub stroke_color: SerializableColor,
    pub stroke_width: f32,
    pub marker_z: i32,
    pub polygon_z: i32,
}

impl GroupVisual {
    pub fn for_group(group: OverlayGroup) -> Self {
        match group {
            OverlayGroup::Official => Self {
                icon: "pin-official".to_string(),
                fill_color: SerializableColor::rgb(0x3D, 0x7B, 0xF7),
                stroke_color: SerializableColor::rgb(0x1B, 0x4D, 0xB3),
                stroke_width: 2.0,
                marker_z: OVERLAY_BASE_Z + 20,
                polygon_z: OVERLAY_BASE_Z,
            },
            OverlayGroup::Realtime => Self {
                icon: "pin-realtime".to_string(),
                fill_color: SerializableColor::rgb(0x8E, 0x44, 0xAD),
                stroke_color: SerializableColor::rgb(0x5B, 0x2C, 0x6F),
                stroke_width: 2.0,
                marker_z: OVERLAY_BASE_Z + 30,
                polygon_z: OVERLAY_BASE_Z + 10,
            },
            OverlayGroup::Favorite => Self {
                icon: "pin-favorite".to_string(),
                fill_color: SerializableColor::rgb(0xF5, 0xB7, 0x01),
                stroke_color: SerializableColor::rgb(0xB3, 0x83, 0x00),
                stroke_width: 2.5,
                marker_z: OVERLAY_BASE_Z + 40,
                polygon_z: OVERLAY_BASE_Z + 15,
            },
        }
    }

    /// Cluster markers stack directly above the group's point markers
    pub fn cluster_z(&self) -> i32 {
        self.marker_z + 1
    }
}

/// What a style draws, independent of its group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleVariant {
    GroupIcon,
    Marker {
        congestion: Option<CongestionLevel>,
        favorite: bool,
    },
    Cluster {
        congestion: Option<CongestionLevel>,
        count: usize,
    },
    Polygon {
        congestion: Option<CongestionLevel>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleKey {
    pub group: OverlayGroup,
    pub variant: StyleVariant,
}

impl StyleKey {
    pub fn group_icon(group: OverlayGroup) -> Self {
        Self {
            group,
            variant: StyleVariant::GroupIcon,
        }
    }

    pub fn marker(group: OverlayGroup, congestion: Option<CongestionLevel>, favorite: bool) -> Self {
        Self {
            group,
            variant: StyleVariant::Marker {
                congestion,
                favorite,
            },
        }
    }

    pub fn cluster(group: OverlayGroup, congestion: Option<CongestionLevel>, count: usize) -> Self {
        Self {
            group,
            variant: StyleVariant::Cluster { congestion, count },
        }
    }

    pub fn polygon(group: OverlayGroup, congestion: Option<CongestionLevel>) -> Self {
        Self {
            group,
            variant: StyleVariant::Polygon { congestion },
        }
    }
}

fn level_name(level: Option<CongestionLevel>) -> &'static str {
    level.map(|l| l.as_str()).unwrap_or("default")
}

impl std::fmt::Display for StyleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.variant {
            StyleVariant::GroupIcon => write!(f, "{}.icon", self.group),
            StyleVariant::Marker {
                congestion,
                favorite,
            } => {
                write!(f, "{}.marker.{}", self.group, level_name(congestion))?;
                if favorite {
                    f.write_str(".favorite")?;
                }
                Ok(())
            }
            StyleVariant::Cluster { congestion, count } => write!(
                f,
                "{}.cluster.{}.count.{}",
                self.group,
                level_name(congestion),
                count
            ),
            StyleVariant::Polygon { congestion } => {
                write!(f, "{}.polygon.{}", self.group, level_name(congestion))
            }
        }
    }
}

/// Fill color used for a congestion level
pub fn congestion_color(level: CongestionLevel) -> SerializableColor {
    match level {
        CongestionLevel::Relaxed => SerializableColor::rgb(0x2E, 0xCC, 0x71),
        CongestionLevel::Normal => SerializableColor::rgb(0xF1, 0xC4, 0x0F),
        CongestionLevel::Busy => SerializableColor::rgb(0xE6, 0x7E, 0x22),
        CongestionLevel::Crowded => SerializableColor::rgb(0xE7, 0x4C, 0x3C),
    }
}

/// Materialized draw resource for a marker or polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graphic {
    pub icon: Option<String>,
    pub fill: SerializableColor,
    pub stroke: SerializableColor,
    pub stroke_width: f32,
    pub badge: Option<String>,
    pub scale: f32,
}

impl Default for Graphic {
    fn default() -> Self {
        Self {
            icon: Some("pin-default".to_string()),
            fill: SerializableColor::rgb(0x95, 0xA5, 0xA6),
            stroke: SerializableColor::rgb(0x7F, 0x8C, 0x8D),
            stroke_width: 1.0,
            badge: None,
            scale: 1.0,
        }
    }
}

impl Graphic {
    /// Builds the graphic a key describes using the group's visual identity
    pub fn for_key(key: &StyleKey, visual: &GroupVisual) -> Result<Self> {
        if visual.icon.trim().is_empty() {
            return Err(MapError::Render(format!("no icon configured for {}", key)));
        }
        let tint = |level: Option<CongestionLevel>| {
            level.map(congestion_color).unwrap_or(visual.fill_color)
        };

        let graphic = match key.variant {
            StyleVariant::GroupIcon => Self {
                icon: Some(visual.icon.clone()),
                fill: visual.fill_color,
                stroke: visual.stroke_color,
                stroke_width: visual.stroke_width,
                badge: None,
                scale: 1.0,
            },
            StyleVariant::Marker {
                congestion,
                favorite,
            } => Self {
                icon: Some(if favorite {
                    format!("{}-star", visual.icon)
                } else {
                    visual.icon.clone()
                }),
                fill: tint(congestion),
                stroke: if favorite {
                    GroupVisual::for_group(OverlayGroup::Favorite).stroke_color
                } else {
                    visual.stroke_color
                },
                stroke_width: visual.stroke_width,
                badge: None,
                scale: 1.0,
            },
            StyleVariant::Cluster { congestion, count } => Self {
                icon: Some(format!("{}-cluster", visual.icon)),
                fill: tint(congestion),
                stroke: visual.stroke_color,
                stroke_width: visual.stroke_width,
                badge: Some(if count > 99 {
                    "99+".to_string()
                } else {
                    count.to_string()
                }),
                scale: 1.0 + (count.max(1) as f32).log10() * 0.25,
            },
            StyleVariant::Polygon { congestion } => Self {
                icon: None,
                fill: tint(congestion).with_alpha(0x66),
                stroke: visual.stroke_color,
                stroke_width: visual.stroke_width,
                badge: None,
                scale: 1.0,
            },
        };
        Ok(graphic)
    }
}

#[derive(Debug)]
struct StyleEntry {
    id: u32,
    graphic: Graphic,
}

/// Shared handle to a registered graphic; cheap to clone
#[derive(Debug, Clone)]
pub struct StyleHandle(Arc<StyleEntry>);

impl StyleHandle {
    pub fn new(id: u32, graphic: Graphic) -> Self {
        Self(Arc::new(StyleEntry { id, graphic }))
    }

    pub fn id(&self) -> u32 {
        self.0.id
    }

    pub fn graphic(&self) -> &Graphic {
        &self.0.graphic
    }

    /// True when both handles point at the same registered resource
    pub fn same_resource(&self, other: &StyleHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for StyleHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for StyleHandle {}

/// Deduplicating cache of graphics keyed by [`StyleKey`]
pub struct StyleRegistry {
    entries: HashMap<StyleKey, StyleHandle>,
    fallback: StyleHandle,
    next_id: u32,
    builds: usize,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::default(),
            fallback: StyleHandle::new(0, Graphic::default()),
            next_id: 1,
            builds: 0,
        }
    }

    /// Returns the cached handle for `key`, building it on first use.
    ///
    /// A failed build yields the fallback style and is not cached, so a later
    /// call with a working builder still registers the key.
    pub fn ensure_style<F>(&mut self, key: &StyleKey, build: F) -> StyleHandle
    where
        F: FnOnce() -> Result<Graphic>,
    {
        if let Some(handle) = self.entries.get(key) {
            return handle.clone();
        }

        self.builds += 1;
        match build() {
            Ok(graphic) => {
                let handle = StyleHandle::new(self.next_id, graphic);
                self.next_id += 1;
                log::debug!("registered style {} as #{}", key, handle.id());
                self.entries.insert(*key, handle.clone());
                handle
            }
            Err(err) => {
                log::warn!("style {} failed to build, using fallback: {}", key, err);
                self.fallback.clone()
            }
        }
    }

    pub fn get(&self, key: &StyleKey) -> Option<&StyleHandle> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &StyleKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn fallback(&self) -> &StyleHandle {
        &self.fallback
    }

    /// Number of registered styles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many times a builder has been invoked
    pub fn build_count(&self) -> usize {
        self.builds
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
