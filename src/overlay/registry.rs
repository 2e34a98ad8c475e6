use crate::layers::{
    base::LayerTrait, manager::LayerManager, marker::MarkerLayer, vector::PolygonLayer,
};
use crate::overlay::group::{ItemKind, OverlayGroup};
use crate::prelude::HashMap;
use crate::Result;

/// Owns one render layer per (group, kind) pair.
///
/// Layers are created on first request and live for the whole map session.
pub struct LayerRegistry {
    manager: LayerManager,
    ids: HashMap<(OverlayGroup, ItemKind), String>,
    created: usize,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self {
            manager: LayerManager::new(),
            ids: HashMap::default(),
            created: 0,
        }
    }

    pub fn layer_id(group: OverlayGroup, kind: ItemKind) -> String {
        format!("{}.{}", group, kind)
    }

    /// Creates the layer for `(group, kind)` unless it already exists.
    ///
    /// Returns `true` when a new layer was created.
    pub fn ensure_layer(&mut self, group: OverlayGroup, kind: ItemKind, z_index: i32) -> Result<bool> {
        if self.ids.contains_key(&(group, kind)) {
            return Ok(false);
        }

        let id = Self::layer_id(group, kind);
        let name = format!("{} {}s", group, kind);
        let layer: Box<dyn LayerTrait> = match kind {
            ItemKind::Point | ItemKind::Cluster => Box::new(MarkerLayer::new(id.clone(), name, z_index)),
            ItemKind::Polygon => Box::new(PolygonLayer::new(id.clone(), name, z_index)),
        };
        self.manager.add_layer(layer)?;
        log::debug!("created layer {} at z={}", id, z_index);
        self.ids.insert((group, kind), id);
        self.created += 1;
        Ok(true)
    }

    pub fn has_layer(&self, group: OverlayGroup, kind: ItemKind) -> bool {
        self.ids.contains_key(&(group, kind))
    }

    /// Total number of layers ever created
    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn layer(&self, group: OverlayGroup, kind: ItemKind) -> Option<&dyn LayerTrait> {
        self.ids
            .get(&(group, kind))
            .and_then(|id| self.manager.get_layer(id))
    }

    pub fn marker_layer(&self, group: OverlayGroup, kind: ItemKind) -> Option<&MarkerLayer> {
        let id = self.ids.get(&(group, kind))?;
        self.manager.get_as::<MarkerLayer>(id)
    }

    pub fn marker_layer_mut(&mut self, group: OverlayGroup, kind: ItemKind) -> Option<&mut MarkerLayer> {
        let id = self.ids.get(&(group, kind))?;
        self.manager.get_as_mut::<MarkerLayer>(id)
    }

    pub fn polygon_layer(&self, group: OverlayGroup) -> Option<&PolygonLayer> {
        let id = self.ids.get(&(group, ItemKind::Polygon))?;
        self.manager.get_as::<PolygonLayer>(id)
    }

    pub fn polygon_layer_mut(&mut self, group: OverlayGroup) -> Option<&mut PolygonLayer> {
        let id = self.ids.get(&(group, ItemKind::Polygon))?;
        self.manager.get_as_mut::<PolygonLayer>(id)
    }

    pub fn set_visible(&mut self, group: OverlayGroup, kind: ItemKind, visible: bool) {
        if let Some(id) = self.ids.get(&(group, kind)) {
            self.manager.with_layer_mut(id, |layer| layer.set_visible(visible));
        }
    }

    pub fn set_group_visible(&mut self, group: OverlayGroup, visible: bool) {
        for kind in ItemKind::ALL {
            self.set_visible(group, kind, visible);
        }
    }

    pub fn is_visible(&self, group: OverlayGroup, kind: ItemKind) -> bool {
        self.layer(group, kind).map(|l| l.is_visible()).unwrap_or(false)
    }

    /// A group counts as visible when any of its layers is
    pub fn is_group_visible(&self, group: OverlayGroup) -> bool {
        ItemKind::ALL.iter().any(|&kind| self.is_visible(group, kind))
    }

    pub fn clear(&mut self, group: OverlayGroup, kind: ItemKind) {
        if let Some(id) = self.ids.get(&(group, kind)) {
            self.manager.with_layer_mut(id, |layer| layer.clear());
        }
    }

    /// Visible polygon layers from the topmost down
    pub fn visible_polygon_layers_top_down(&self) -> Vec<(OverlayGroup, &PolygonLayer)> {
        self.manager
            .render_order()
            .iter()
            .rev()
            .filter_map(|id| {
                let group = OverlayGroup::ALL
                    .into_iter()
                    .find(|&group| self.ids.get(&(group, ItemKind::Polygon)) == Some(id))?;
                let layer = self.polygon_layer(group)?;
                layer.is_visible().then_some((group, layer))
            })
            .collect()
    }

    pub fn manager(&self) -> &LayerManager {
        &self.manager
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
