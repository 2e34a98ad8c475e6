use crate::data::model::PlaceDetail;
use crate::overlay::OverlayGroup;
use serde::{Deserialize, Serialize};

/// Which data source the map is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapMode {
    Idle,
    Official,
    Realtime,
}

impl MapMode {
    /// Overlay group shown exclusively in this mode
    pub fn group(&self) -> Option<OverlayGroup> {
        match self {
            Self::Idle => None,
            Self::Official => Some(OverlayGroup::Official),
            Self::Realtime => Some(OverlayGroup::Realtime),
        }
    }
}

impl Default for MapMode {
    fn default() -> Self {
        Self::Official
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PanelState {
    #[default]
    Collapsed,
    List,
    Detail(Box<PlaceDetail>),
}

impl PanelState {
    pub fn is_collapsed(&self) -> bool {
        matches!(self, Self::Collapsed)
    }

    pub fn detail(&self) -> Option<&PlaceDetail> {
        match self {
            Self::Detail(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Collapsed => "collapsed",
            Self::List => "list",
            Self::Detail(_) => "detail",
        }
    }
}

/// How much of the screen the panel covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelExtent {
    #[default]
    Partial,
    Full,
}
