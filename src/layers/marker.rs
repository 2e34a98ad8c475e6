use crate::{
    core::geo::LatLng,
    layers::base::{LayerProperties, LayerType},
    overlay::style::StyleHandle,
    prelude::{HashMap, HashSet},
};

/// A single rendered point or cluster marker
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Namespaced marker identity, unique within the map session
    pub id: String,
    /// Opaque id of the domain item behind the marker
    pub item_id: String,
    pub position: LatLng,
    pub style: StyleHandle,
    /// Count badge drawn on cluster markers
    pub badge: Option<usize>,
}

impl Marker {
    pub fn new(id: String, item_id: String, position: LatLng, style: StyleHandle) -> Self {
        Self {
            id,
            item_id,
            position,
            style,
            badge: None,
        }
    }

    pub fn with_badge(mut self, count: usize) -> Self {
        self.badge = Some(count);
        self
    }
}

/// Layer holding markers keyed by their namespaced id
pub struct MarkerLayer {
    properties: LayerProperties,
    markers: Vec<Marker>,
    index: HashMap<String, usize>,
}

impl MarkerLayer {
    pub fn new(id: String, name: String, z_index: i32) -> Self {
        Self {
            properties: LayerProperties::new(id, name, LayerType::Marker).with_z_index(z_index),
            markers: Vec::new(),
            index: HashMap::default(),
        }
    }

    /// Adds a batch of markers and returns the ids that were created.
    ///
    /// A marker whose id already exists replaces the previous one in place.
    /// Repeated ids within one batch keep the last marker and are reported once.
    pub fn add_markers(&mut self, markers: Vec<Marker>) -> Vec<String> {
        let mut created = Vec::with_capacity(markers.len());
        let mut batch = HashSet::default();
        for marker in markers {
            if batch.insert(marker.id.clone()) {
                created.push(marker.id.clone());
            } else {
                log::warn!(
                    "marker id {} repeated in one batch of layer {}, keeping the last",
                    marker.id,
                    self.properties.id
                );
            }
            match self.index.get(&marker.id) {
                Some(&slot) => self.markers[slot] = marker,
                None => {
                    self.index.insert(marker.id.clone(), self.markers.len());
                    self.markers.push(marker);
                }
            }
        }
        created
    }

    pub fn get(&self, id: &str) -> Option<&Marker> {
        self.index.get(id).map(|&slot| &self.markers[slot])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Marker> {
        match self.index.get(id) {
            Some(&slot) => self.markers.get_mut(slot),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
}

crate::impl_layer_trait!(MarkerLayer, props: properties, shapes: markers, index: index);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::base::LayerTrait;
    use crate::overlay::style::{Graphic, StyleHandle};

    fn marker(id: &str, lat: f64) -> Marker {
        Marker::new(
            id.to_string(),
            id.to_string(),
            LatLng::new(lat, 127.0),
            StyleHandle::new(0, Graphic::default()),
        )
    }

    #[test]
    fn test_add_and_replace_markers() {
        let mut layer = MarkerLayer::new("test".into(), "Test".into(), 0);
        let ids = layer.add_markers(vec![marker("a", 37.0), marker("b", 37.1)]);
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(layer.len(), 2);

        layer.add_markers(vec![marker("a", 37.5)]);
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.get("a").map(|m| m.position.lat), Some(37.5));
    }

    #[test]
    fn test_repeated_id_in_batch_is_reported_once() {
        let mut layer = MarkerLayer::new("test".into(), "Test".into(), 0);
        let ids = layer.add_markers(vec![marker("a", 37.0), marker("b", 37.1), marker("a", 37.2)]);

        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.get("a").map(|m| m.position.lat), Some(37.2));
    }

    #[test]
    fn test_clear_keeps_layer_properties() {
        let mut layer = MarkerLayer::new("test".into(), "Test".into(), 7);
        layer.add_markers(vec![marker("a", 37.0)]);
        layer.set_visible(false);
        layer.clear();

        assert!(layer.is_empty());
        assert!(!layer.contains("a"));
        assert_eq!(layer.z_index(), 7);
        assert!(!layer.is_visible());
    }
}
