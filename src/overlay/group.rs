use serde::{Deserialize, Serialize};

/// Independently toggleable category of rendered content
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayGroup {
    Official,
    Favorite,
    Realtime,
}

impl OverlayGroup {
    pub const ALL: [OverlayGroup; 3] = [
        OverlayGroup::Official,
        OverlayGroup::Favorite,
        OverlayGroup::Realtime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Official => "official",
            Self::Favorite => "favorite",
            Self::Realtime => "realtime",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "official" => Some(Self::Official),
            "favorite" => Some(Self::Favorite),
            "realtime" => Some(Self::Realtime),
            _ => None,
        }
    }
}

impl std::fmt::Display for OverlayGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of shape an overlay layer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Point,
    Cluster,
    Polygon,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Point, ItemKind::Cluster, ItemKind::Polygon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Cluster => "cluster",
            Self::Polygon => "polygon",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "point" => Some(Self::Point),
            "cluster" => Some(Self::Cluster),
            "polygon" => Some(Self::Polygon),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the namespaced `<group>.<kind>.<item>` identity of a rendered shape
pub fn shape_id(group: OverlayGroup, kind: ItemKind, item_id: &str) -> String {
    format!("{}.{}.{}", group, kind, item_id)
}

/// Splits a namespaced shape id back into its parts.
///
/// Item ids may themselves contain dots; only the first two separators count.
pub fn parse_shape_id(id: &str) -> Option<(OverlayGroup, ItemKind, &str)> {
    let mut parts = id.splitn(3, '.');
    let group = OverlayGroup::parse(parts.next()?)?;
    let kind = ItemKind::parse(parts.next()?)?;
    let item = parts.next()?;
    if item.is_empty() {
        return None;
    }
    Some((group, kind, item))
}
