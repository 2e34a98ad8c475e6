//! Binding of domain items to render layers
//!
//! [`OverlayManager`] is the single entry point the controller uses to put
//! places, clusters and areas on the map. Every bind replaces the previous
//! contents of its (group, kind) slot wholesale; tap subscriptions for the
//! slot are released before the old markers are cleared so that no tap can
//! reach a marker from an earlier generation.

use crate::core::constants::CLUSTER_ID_PRECISION;
use crate::core::geo::LatLng;
use crate::data::model::{ClusterItem, CongestionLevel, PlaceItem};
use crate::layers::{
    base::LayerTrait,
    marker::Marker,
    vector::PolygonShape,
};
use crate::overlay::group::{shape_id, ItemKind, OverlayGroup};
use crate::overlay::registry::LayerRegistry;
use crate::overlay::style::{Graphic, GroupVisual, StyleHandle, StyleKey, StyleRegistry};
use crate::overlay::taps::{TapHandler, TapRegistry};
use crate::prelude::HashMap;
use crate::{MapError, Result};

/// Anything that can be drawn as a point marker
pub trait OverlayItem {
    /// Opaque id reported back through tap callbacks
    fn overlay_id(&self) -> &str;
    fn coordinate(&self) -> LatLng;
}

impl OverlayItem for PlaceItem {
    fn overlay_id(&self) -> &str {
        &self.id
    }

    fn coordinate(&self) -> LatLng {
        self.coordinate
    }
}

/// A closed outline to draw on a group's polygon layer
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonItem {
    pub id: String,
    pub ring: Vec<LatLng>,
    pub congestion: Option<CongestionLevel>,
}

impl PolygonItem {
    pub fn new(id: impl Into<String>, ring: Vec<LatLng>, congestion: Option<CongestionLevel>) -> Self {
        Self {
            id: id.into(),
            ring,
            congestion,
        }
    }

    /// Area outline of a place, if it has one
    pub fn from_place(place: &PlaceItem) -> Option<Self> {
        let ring = place.area.as_ref()?;
        Some(Self::new(place.id.clone(), ring.clone(), place.congestion))
    }
}

/// Deterministic item id for a cluster marker.
///
/// Clusters have no stable identity of their own, so the id is built from
/// the quantized position and the member count. Server summaries get a
/// `srv_` prefix so they never share an id with a local cluster.
pub fn cluster_item_id(cluster: &ClusterItem) -> String {
    let (lat, lng) = cluster.coordinate.quantized(CLUSTER_ID_PRECISION);
    let source = if cluster.is_server_summary() { "srv_" } else { "" };
    format!("{}{}_{}_{}", source, lat, lng, cluster.count)
}

pub struct OverlayManager {
    styles: StyleRegistry,
    layers: LayerRegistry,
    taps: TapRegistry,
    prepared: HashMap<OverlayGroup, GroupVisual>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self {
            styles: StyleRegistry::new(),
            layers: LayerRegistry::new(),
            taps: TapRegistry::new(),
            prepared: HashMap::default(),
        }
    }

    /// Creates the group's icon style, its polygon styles and its three
    /// layers. Calls after the first are no-ops.
    pub fn ensure_resources(&mut self, group: OverlayGroup, visual: &GroupVisual) -> Result<()> {
        if self.prepared.contains_key(&group) {
            return Ok(());
        }

        let icon = StyleKey::group_icon(group);
        self.styles.ensure_style(&icon, || Graphic::for_key(&icon, visual));

        let levels = std::iter::once(None).chain(CongestionLevel::ALL.iter().copied().map(Some));
        for level in levels {
            let key = StyleKey::polygon(group, level);
            self.styles.ensure_style(&key, || Graphic::for_key(&key, visual));
        }

        self.layers.ensure_layer(group, ItemKind::Point, visual.marker_z)?;
        self.layers.ensure_layer(group, ItemKind::Cluster, visual.cluster_z())?;
        self.layers.ensure_layer(group, ItemKind::Polygon, visual.polygon_z)?;

        log::info!("prepared overlay resources for {}", group);
        self.prepared.insert(group, visual.clone());
        Ok(())
    }

    pub fn is_prepared(&self, group: OverlayGroup) -> bool {
        self.prepared.contains_key(&group)
    }

    fn require_prepared(&self, group: OverlayGroup) -> Result<()> {
        if self.is_prepared(group) {
            Ok(())
        } else {
            Err(MapError::Layer(format!(
                "overlay resources for {} have not been prepared",
                group
            )))
        }
    }

    /// Releases taps and clears the layer for one (group, kind) slot
    fn reset_slot(&mut self, group: OverlayGroup, kind: ItemKind) {
        let released = self.taps.dispose_all(group, kind);
        self.layers.clear(group, kind);
        if released > 0 {
            log::trace!("released {} tap subscriptions on {}.{}", released, group, kind);
        }
    }

    fn style_for(&mut self, key: &StyleKey, visual: &GroupVisual) -> StyleHandle {
        self.styles.ensure_style(key, || Graphic::for_key(key, visual))
    }

    /// Replaces the point markers of `group` with `items`.
    ///
    /// Returns the number of markers created. An empty slice leaves an
    /// empty, visible layer.
    pub fn set_pois<T, F>(
        &mut self,
        group: OverlayGroup,
        items: &[T],
        visual: &GroupVisual,
        style_key: F,
        on_tap: Option<TapHandler>,
    ) -> Result<usize>
    where
        T: OverlayItem,
        F: Fn(&T) -> StyleKey,
    {
        self.require_prepared(group)?;
        self.reset_slot(group, ItemKind::Point);

        let mut staged = Vec::with_capacity(items.len());
        let mut item_ids = HashMap::default();
        for item in items {
            let key = style_key(item);
            let handle = self.style_for(&key, visual);
            let id = shape_id(group, ItemKind::Point, item.overlay_id());
            item_ids.insert(id.clone(), item.overlay_id().to_string());
            staged.push(Marker::new(
                id,
                item.overlay_id().to_string(),
                item.coordinate(),
                handle,
            ));
        }

        let layer = self
            .layers
            .marker_layer_mut(group, ItemKind::Point)
            .ok_or_else(|| MapError::Layer(format!("missing point layer for {}", group)))?;
        let created = layer.add_markers(staged);

        if let Some(handler) = on_tap {
            for id in &created {
                if let Some(item_id) = item_ids.get(id) {
                    self.taps
                        .subscribe(group, ItemKind::Point, id, item_id, handler.clone());
                }
            }
        }

        self.layers.set_visible(group, ItemKind::Point, true);
        let count = self.marker_count(group, ItemKind::Point);
        log::debug!("bound {} point markers to {}", count, group);
        Ok(count)
    }

    /// Replaces the cluster markers of `group`.
    ///
    /// Marker ids come from [`cluster_item_id`], so an unchanged cluster keeps
    /// its identity across re-renders.
    pub fn set_clusters<F>(
        &mut self,
        group: OverlayGroup,
        clusters: &[ClusterItem],
        visual: &GroupVisual,
        style_key: F,
    ) -> Result<usize>
    where
        F: Fn(&ClusterItem) -> StyleKey,
    {
        self.require_prepared(group)?;
        self.reset_slot(group, ItemKind::Cluster);

        let mut staged = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let key = style_key(cluster);
            let handle = self.style_for(&key, visual);
            let item_id = cluster_item_id(cluster);
            staged.push(
                Marker::new(
                    shape_id(group, ItemKind::Cluster, &item_id),
                    item_id,
                    cluster.coordinate,
                    handle,
                )
                .with_badge(cluster.count),
            );
        }

        let layer = self
            .layers
            .marker_layer_mut(group, ItemKind::Cluster)
            .ok_or_else(|| MapError::Layer(format!("missing cluster layer for {}", group)))?;
        layer.add_markers(staged);

        self.layers.set_visible(group, ItemKind::Cluster, true);
        let count = self.marker_count(group, ItemKind::Cluster);
        log::debug!("bound {} cluster markers to {}", count, group);
        Ok(count)
    }

    /// Replaces the area outlines of `group`. Rings are closed if needed;
    /// rings with fewer than three points are skipped.
    pub fn set_polygons(
        &mut self,
        group: OverlayGroup,
        polygons: &[PolygonItem],
        visual: &GroupVisual,
    ) -> Result<usize> {
        self.require_prepared(group)?;
        self.reset_slot(group, ItemKind::Polygon);

        let mut staged = Vec::with_capacity(polygons.len());
        for polygon in polygons {
            if polygon.ring.len() < 3 {
                log::warn!("skipping degenerate area {} on {}", polygon.id, group);
                continue;
            }
            let key = StyleKey::polygon(group, polygon.congestion);
            let handle = self.style_for(&key, visual);
            staged.push(PolygonShape::from_ring(
                shape_id(group, ItemKind::Polygon, &polygon.id),
                polygon.id.clone(),
                &polygon.ring,
                handle,
            ));
        }

        let layer = self
            .layers
            .polygon_layer_mut(group)
            .ok_or_else(|| MapError::Layer(format!("missing polygon layer for {}", group)))?;
        layer.add_shapes(staged);

        self.layers.set_visible(group, ItemKind::Polygon, true);
        let count = self.marker_count(group, ItemKind::Polygon);
        log::debug!("bound {} areas to {}", count, group);
        Ok(count)
    }

    /// Swaps the style of one bound point marker in place.
    ///
    /// Returns `false` when the marker is not currently bound.
    pub fn restyle_point(
        &mut self,
        group: OverlayGroup,
        item_id: &str,
        key: &StyleKey,
        visual: &GroupVisual,
    ) -> bool {
        let handle = self.style_for(key, visual);
        let id = shape_id(group, ItemKind::Point, item_id);
        match self
            .layers
            .marker_layer_mut(group, ItemKind::Point)
            .and_then(|layer| layer.get_mut(&id))
        {
            Some(marker) => {
                marker.style = handle;
                true
            }
            None => false,
        }
    }

    pub fn show(&mut self, group: OverlayGroup) {
        self.layers.set_group_visible(group, true);
    }

    pub fn hide(&mut self, group: OverlayGroup) {
        self.layers.set_group_visible(group, false);
    }

    /// Shows `group` and hides every other group
    pub fn show_only(&mut self, group: OverlayGroup) {
        for other in OverlayGroup::ALL {
            self.layers.set_group_visible(other, other == group);
        }
        log::debug!("showing only {}", group);
    }

    /// Removes every marker and shape of `group`, keeping its layers
    pub fn clear(&mut self, group: OverlayGroup) {
        for kind in ItemKind::ALL {
            self.reset_slot(group, kind);
        }
    }

    pub fn is_visible(&self, group: OverlayGroup) -> bool {
        self.layers.is_group_visible(group)
    }

    pub fn is_layer_visible(&self, group: OverlayGroup, kind: ItemKind) -> bool {
        self.layers.is_visible(group, kind)
    }

    /// Forwards a tap on a rendered marker to its subscription
    pub fn dispatch_tap(&self, shape_id: &str) -> bool {
        self.taps.dispatch(shape_id)
    }

    /// Topmost visible area under `point`, as `(group, item id)`
    pub fn polygon_at(&self, point: &LatLng) -> Option<(OverlayGroup, String)> {
        self.layers
            .visible_polygon_layers_top_down()
            .into_iter()
            .find_map(|(group, layer)| layer.shape_at(point).map(|shape| (group, shape.item_id.clone())))
    }

    pub fn marker_count(&self, group: OverlayGroup, kind: ItemKind) -> usize {
        self.layers.layer(group, kind).map(|l| l.len()).unwrap_or(0)
    }

    pub fn marker(&self, group: OverlayGroup, kind: ItemKind, item_id: &str) -> Option<&Marker> {
        self.layers
            .marker_layer(group, kind)?
            .get(&shape_id(group, kind, item_id))
    }

    pub fn markers(&self, group: OverlayGroup, kind: ItemKind) -> &[Marker] {
        self.layers
            .marker_layer(group, kind)
            .map(|layer| layer.markers())
            .unwrap_or(&[])
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    pub fn taps(&self) -> &TapRegistry {
        &self.taps
    }
}

impl Default for OverlayManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::PlaceKind;
    use crate::prelude::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn place(id: &str, lat: f64, lng: f64) -> PlaceItem {
        PlaceItem::new(PlaceKind::Official, id, format!("Place {}", id), LatLng::new(lat, lng))
            .with_congestion(CongestionLevel::Normal)
    }

    fn marker_key(group: OverlayGroup) -> impl Fn(&PlaceItem) -> StyleKey {
        move |item| StyleKey::marker(group, item.congestion, item.is_favorite)
    }

    fn prepared(group: OverlayGroup) -> (OverlayManager, GroupVisual) {
        let mut overlay = OverlayManager::new();
        let visual = GroupVisual::for_group(group);
        overlay.ensure_resources(group, &visual).unwrap();
        (overlay, visual)
    }

    #[test]
    fn test_ensure_resources_is_idempotent() {
        let (mut overlay, visual) = prepared(OverlayGroup::Official);
        let styles = overlay.styles().len();
        for _ in 0..5 {
            overlay.ensure_resources(OverlayGroup::Official, &visual).unwrap();
        }

        assert_eq!(overlay.layers().created_count(), 3);
        assert_eq!(overlay.styles().len(), styles);
        // icon + default + four congestion levels
        assert_eq!(styles, 6);
    }

    #[test]
    fn test_binding_requires_resources() {
        let mut overlay = OverlayManager::new();
        let visual = GroupVisual::for_group(OverlayGroup::Realtime);
        let result = overlay.set_pois(
            OverlayGroup::Realtime,
            &[place("1", 37.5, 127.0)],
            &visual,
            marker_key(OverlayGroup::Realtime),
            None,
        );
        assert!(matches!(result, Err(MapError::Layer(_))));
    }

    #[test]
    fn test_set_pois_replaces_previous_generation() {
        let (mut overlay, visual) = prepared(OverlayGroup::Official);
        let taps = Arc::new(AtomicUsize::new(0));
        let counter = taps.clone();
        let handler: TapHandler = Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let items = vec![place("1", 37.50, 127.00), place("2", 37.51, 127.01)];
        let created = overlay
            .set_pois(OverlayGroup::Official, &items, &visual, marker_key(OverlayGroup::Official), Some(handler))
            .unwrap();
        assert_eq!(created, 2);
        assert!(overlay.dispatch_tap("official.point.1"));

        let created = overlay
            .set_pois::<PlaceItem, _>(OverlayGroup::Official, &[], &visual, marker_key(OverlayGroup::Official), None)
            .unwrap();
        assert_eq!(created, 0);
        assert_eq!(overlay.taps().active_count(OverlayGroup::Official, ItemKind::Point), 0);
        assert!(!overlay.dispatch_tap("official.point.1"));
        assert_eq!(taps.load(Ordering::SeqCst), 1);
        assert!(overlay.is_layer_visible(OverlayGroup::Official, ItemKind::Point));
    }

    #[test]
    fn test_styles_are_shared_between_markers() {
        let (mut overlay, visual) = prepared(OverlayGroup::Official);
        let items: Vec<_> = (0..20).map(|i| place(&i.to_string(), 37.5, 127.0 + i as f64 * 0.001)).collect();
        overlay
            .set_pois(OverlayGroup::Official, &items, &visual, marker_key(OverlayGroup::Official), None)
            .unwrap();

        let markers = overlay.markers(OverlayGroup::Official, ItemKind::Point);
        assert_eq!(markers.len(), 20);
        assert!(markers.windows(2).all(|pair| pair[0].style.same_resource(&pair[1].style)));
    }

    #[test]
    fn test_cluster_ids_are_stable() {
        let (mut overlay, visual) = prepared(OverlayGroup::Realtime);
        let clusters = vec![ClusterItem {
            coordinate: LatLng::new(37.566_512_3, 126.978_012_3),
            count: 4,
            congestion: Some(CongestionLevel::Busy),
            member_ids: vec![],
        }];
        let key = |c: &ClusterItem| StyleKey::cluster(OverlayGroup::Realtime, c.congestion, c.count);

        overlay.set_clusters(OverlayGroup::Realtime, &clusters, &visual, key).unwrap();
        let first: Vec<String> = overlay
            .markers(OverlayGroup::Realtime, ItemKind::Cluster)
            .iter()
            .map(|m| m.id.clone())
            .collect();
        overlay.set_clusters(OverlayGroup::Realtime, &clusters, &visual, key).unwrap();
        let second: Vec<String> = overlay
            .markers(OverlayGroup::Realtime, ItemKind::Cluster)
            .iter()
            .map(|m| m.id.clone())
            .collect();

        assert_eq!(first, second);
        assert_eq!(first, vec!["realtime.cluster.srv_3756651_12697801_4".to_string()]);
        assert_eq!(overlay.markers(OverlayGroup::Realtime, ItemKind::Cluster)[0].badge, Some(4));
    }

    #[test]
    fn test_local_and_server_clusters_at_same_spot_both_render() {
        let (mut overlay, visual) = prepared(OverlayGroup::Realtime);
        let local = ClusterItem {
            coordinate: LatLng::new(37.566_51, 126.978_01),
            count: 2,
            congestion: Some(CongestionLevel::Relaxed),
            member_ids: vec!["u1".into(), "u2".into()],
        };
        let server = ClusterItem {
            member_ids: vec![],
            ..local.clone()
        };
        assert_ne!(cluster_item_id(&local), cluster_item_id(&server));

        let key = |c: &ClusterItem| StyleKey::cluster(OverlayGroup::Realtime, c.congestion, c.count);
        overlay
            .set_clusters(OverlayGroup::Realtime, &[local, server], &visual, key)
            .unwrap();

        assert_eq!(overlay.markers(OverlayGroup::Realtime, ItemKind::Cluster).len(), 2);
    }

    #[test]
    fn test_show_only_and_clear() {
        let mut overlay = OverlayManager::new();
        for group in OverlayGroup::ALL {
            overlay.ensure_resources(group, &GroupVisual::for_group(group)).unwrap();
        }

        overlay.show_only(OverlayGroup::Realtime);
        assert!(overlay.is_visible(OverlayGroup::Realtime));
        assert!(!overlay.is_visible(OverlayGroup::Official));
        assert!(!overlay.is_visible(OverlayGroup::Favorite));

        let visual = GroupVisual::for_group(OverlayGroup::Realtime);
        overlay
            .set_pois(OverlayGroup::Realtime, &[place("1", 37.5, 127.0)], &visual, marker_key(OverlayGroup::Realtime), None)
            .unwrap();
        overlay.clear(OverlayGroup::Realtime);
        assert_eq!(overlay.marker_count(OverlayGroup::Realtime, ItemKind::Point), 0);
        assert!(overlay.layers().has_layer(OverlayGroup::Realtime, ItemKind::Point));
    }

    #[test]
    fn test_restyle_point() {
        let (mut overlay, visual) = prepared(OverlayGroup::Official);
        overlay
            .set_pois(OverlayGroup::Official, &[place("7", 37.5, 127.0)], &visual, marker_key(OverlayGroup::Official), None)
            .unwrap();

        let starred = StyleKey::marker(OverlayGroup::Official, Some(CongestionLevel::Normal), true);
        assert!(overlay.restyle_point(OverlayGroup::Official, "7", &starred, &visual));
        let marker = overlay.marker(OverlayGroup::Official, ItemKind::Point, "7").unwrap();
        assert_eq!(marker.style.graphic().icon.as_deref(), Some("pin-official-star"));
        assert!(!overlay.restyle_point(OverlayGroup::Official, "missing", &starred, &visual));
    }

    #[test]
    fn test_polygon_hit_test_uses_visible_layers() {
        let mut overlay = OverlayManager::new();
        for group in [OverlayGroup::Official, OverlayGroup::Favorite] {
            overlay.ensure_resources(group, &GroupVisual::for_group(group)).unwrap();
        }
        let ring = vec![
            LatLng::new(37.0, 127.0),
            LatLng::new(37.1, 127.0),
            LatLng::new(37.1, 127.1),
            LatLng::new(37.0, 127.1),
        ];
        for group in [OverlayGroup::Official, OverlayGroup::Favorite] {
            overlay
                .set_polygons(
                    group,
                    &[PolygonItem::new("area", ring.clone(), None)],
                    &GroupVisual::for_group(group),
                )
                .unwrap();
        }

        let inside = LatLng::new(37.05, 127.05);
        assert_eq!(overlay.polygon_at(&inside), Some((OverlayGroup::Favorite, "area".to_string())));

        overlay.hide(OverlayGroup::Favorite);
        assert_eq!(overlay.polygon_at(&inside), Some((OverlayGroup::Official, "area".to_string())));
        assert_eq!(overlay.polygon_at(&LatLng::new(36.0, 127.05)), None);
    }
}
