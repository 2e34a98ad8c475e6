use crate::{layers::base::LayerTrait, MapError, Result};

use crate::prelude::HashMap;

/// Manages layers for the map, handling ordering and lookup
pub struct LayerManager {
    /// All layers indexed by ID
    layers: HashMap<String, Box<dyn LayerTrait>>,
    /// Ordered list of layer IDs for rendering (sorted by z-index)
    render_order: Vec<String>,
}

impl LayerManager {
    pub fn new() -> Self {
        Self {
            layers: HashMap::default(),
            render_order: Vec::new(),
        }
    }

    /// Adds a layer to the manager
    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        if self.layers.contains_key(&layer_id) {
            return Err(MapError::Layer(format!("layer '{}' already exists", layer_id)));
        }
        let z_index = layer.z_index();

        self.layers.insert(layer_id.clone(), layer);

        // Insert in sorted order by z-index
        let insert_pos = self
            .render_order
            .iter()
            .position(|id| {
                self.layers
                    .get(id)
                    .map(|l| l.z_index() > z_index)
                    .unwrap_or(false)
            })
            .unwrap_or(self.render_order.len());

        self.render_order.insert(insert_pos, layer_id);
        Ok(())
    }

    /// Gets a reference to a layer by ID
    pub fn get_layer(&self, layer_id: &str) -> Option<&dyn LayerTrait> {
        self.layers.get(layer_id).map(|l| l.as_ref())
    }

    /// Applies a function to a specific layer mutably
    pub fn with_layer_mut<F, R>(&mut self, layer_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn LayerTrait) -> R,
    {
        self.layers.get_mut(layer_id).map(|layer| f(layer.as_mut()))
    }

    /// Gets a layer downcast to its concrete type
    pub fn get_as<T: 'static>(&self, layer_id: &str) -> Option<&T> {
        self.layers
            .get(layer_id)
            .and_then(|l| l.as_any().downcast_ref::<T>())
    }

    pub fn get_as_mut<T: 'static>(&mut self, layer_id: &str) -> Option<&mut T> {
        self.layers
            .get_mut(layer_id)
            .and_then(|l| l.as_any_mut().downcast_mut::<T>())
    }

    /// Layer ids from bottom to top
    pub fn render_order(&self) -> &[String] {
        &self.render_order
    }

    /// Gets the number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::marker::MarkerLayer;
    use crate::layers::vector::PolygonLayer;

    #[test]
    fn test_render_order_follows_z_index() {
        let mut manager = LayerManager::new();
        manager
            .add_layer(Box::new(MarkerLayer::new("top".into(), "Top".into(), 30)))
            .unwrap();
        manager
            .add_layer(Box::new(PolygonLayer::new("bottom".into(), "Bottom".into(), 10)))
            .unwrap();
        manager
            .add_layer(Box::new(MarkerLayer::new("middle".into(), "Middle".into(), 20)))
            .unwrap();

        assert_eq!(manager.render_order(), &["bottom", "middle", "top"]);
    }

    #[test]
    fn test_duplicate_layer_rejected() {
        let mut manager = LayerManager::new();
        manager
            .add_layer(Box::new(MarkerLayer::new("a".into(), "A".into(), 0)))
            .unwrap();
        let err = manager
            .add_layer(Box::new(MarkerLayer::new("a".into(), "A".into(), 0)))
            .unwrap_err();
        assert!(matches!(err, MapError::Layer(_)));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_typed_access() {
        let mut manager = LayerManager::new();
        manager
            .add_layer(Box::new(MarkerLayer::new("points".into(), "Points".into(), 0)))
            .unwrap();

        assert!(manager.get_as::<MarkerLayer>("points").is_some());
        assert!(manager.get_as::<PolygonLayer>("points").is_none());
        assert!(manager.get_as_mut::<MarkerLayer>("points").is_some());
    }
}
