//! Presentation facade tying the pipeline, the overlay engine and the panel
//!
//! [`MapController`] lives on the UI thread. It forwards camera and tap
//! events, and applies everything that background tasks produce (place
//! batches, detail and favorite completions) from [`MapController::pump`],
//! so overlay state is only ever mutated from the thread that owns it.

pub mod panel;

use crate::core::config::EngineConfig;
use crate::core::geo::LatLng;
use crate::core::viewport::{CameraStop, ViewportRect, ZoomLevel};
use crate::data::model::{ClusterItem, PlaceDetail, PlaceItem, PlaceKind, PlaceRef};
use crate::notice::{self, Notice, NoticeKind, NoticeReceiver, NoticeSender};
use crate::overlay::{
    GroupVisual, OverlayGroup, OverlayItem, OverlayManager, PolygonItem, StyleKey, TapHandler,
};
use crate::pipeline::{BatchReceiver, PipelineHandle, PlaceBatch, ViewportPipeline};
use crate::prelude::{Arc, HashMap, HashSet};
use crate::runtime;
use crate::services::location::LocationProvider;
use crate::services::PlaceService;
use crate::spatial::Clusterer;
use crate::{MapError, Result};
use crossbeam_channel::{Receiver, Sender};
use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::time::Instant;

pub use panel::{MapMode, PanelExtent, PanelState};

/// A tap routed out of the overlay engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapEvent {
    pub group: OverlayGroup,
    pub item_id: String,
}

struct DetailOutcome {
    token: u64,
    place: PlaceRef,
    result: Result<PlaceDetail>,
}

struct FavoriteOutcome {
    place: PlaceRef,
    favorite: bool,
    result: Result<()>,
}

struct PendingDetail {
    token: u64,
    place: PlaceRef,
    mode: MapMode,
}

struct CachedDetail {
    detail: PlaceDetail,
    fetched_at: Instant,
}

/// A favorited place drawn on the favorite overlay.
///
/// Keyed by `kind:id` since official and user ids share one id space there.
#[derive(Debug, Clone)]
struct FavoriteEntry {
    key: String,
    place: PlaceItem,
}

impl OverlayItem for FavoriteEntry {
    fn overlay_id(&self) -> &str {
        &self.key
    }

    fn coordinate(&self) -> LatLng {
        self.place.coordinate
    }
}

fn group_for(kind: PlaceKind) -> OverlayGroup {
    match kind {
        PlaceKind::Official => OverlayGroup::Official,
        PlaceKind::User => OverlayGroup::Realtime,
    }
}

fn kind_for(mode: MapMode) -> Option<PlaceKind> {
    match mode {
        MapMode::Idle => None,
        MapMode::Official => Some(PlaceKind::Official),
        MapMode::Realtime => Some(PlaceKind::User),
    }
}

pub struct MapController {
    config: EngineConfig,
    overlay: OverlayManager,
    visuals: HashMap<OverlayGroup, GroupVisual>,
    clusterer: Clusterer,
    service: Arc<dyn PlaceService>,
    pipeline: PipelineHandle,
    official_rx: BatchReceiver,
    user_rx: BatchReceiver,
    notices: NoticeSender,

    mode: MapMode,
    panel: PanelState,
    extent: PanelExtent,
    controls_enabled: bool,

    official: Vec<PlaceItem>,
    user: Vec<PlaceItem>,
    user_clusters: Vec<ClusterItem>,
    favorites: Vec<FavoriteEntry>,

    tap_tx: Sender<TapEvent>,
    tap_rx: Receiver<TapEvent>,
    detail_tx: Sender<DetailOutcome>,
    detail_rx: Receiver<DetailOutcome>,
    favorite_tx: Sender<FavoriteOutcome>,
    favorite_rx: Receiver<FavoriteOutcome>,

    detail_token: u64,
    pending_detail: Option<PendingDetail>,
    detail_cache: LruCache<PlaceRef, CachedDetail>,
}

impl MapController {
    /// Builds the controller and starts its viewport pipeline.
    ///
    /// Must run inside a tokio runtime unless a spawner bound to one was
    /// installed with [`runtime::init_runtime`].
    pub fn new(
        config: EngineConfig,
        service: Arc<dyn PlaceService>,
        location: Arc<dyn LocationProvider>,
    ) -> Result<(Self, NoticeReceiver)> {
        config.validate()?;
        let cache_size = NonZeroUsize::new(config.controller.detail_cache_size)
            .ok_or_else(|| MapError::Config("detail_cache_size must be non-zero".into()))?;

        let (notices, notice_rx) = notice::channel();
        let pipeline = ViewportPipeline::spawn(
            config.pipeline.clone(),
            service.clone(),
            location,
            notices.clone(),
        );

        let mut overlay = OverlayManager::new();
        let mut visuals = HashMap::default();
        for group in OverlayGroup::ALL {
            let visual = GroupVisual::for_group(group);
            overlay.ensure_resources(group, &visual)?;
            visuals.insert(group, visual);
        }
        overlay.show_only(OverlayGroup::Official);
        overlay.show(OverlayGroup::Favorite);

        let (tap_tx, tap_rx) = crossbeam_channel::unbounded();
        let (detail_tx, detail_rx) = crossbeam_channel::unbounded();
        let (favorite_tx, favorite_rx) = crossbeam_channel::unbounded();

        let controller = Self {
            clusterer: Clusterer::new(config.clustering.clone()),
            official_rx: pipeline.official(),
            user_rx: pipeline.user(),
            config,
            overlay,
            visuals,
            service,
            pipeline,
            notices,
            mode: MapMode::Official,
            panel: PanelState::Collapsed,
            extent: PanelExtent::Partial,
            controls_enabled: true,
            official: Vec::new(),
            user: Vec::new(),
            user_clusters: Vec::new(),
            favorites: Vec::new(),
            tap_tx,
            tap_rx,
            detail_tx,
            detail_rx,
            favorite_tx,
            favorite_rx,
            detail_token: 0,
            pending_detail: None,
            detail_cache: LruCache::new(cache_size),
        };
        Ok((controller, notice_rx))
    }

    // --- camera and location input -------------------------------------------------------------

    pub fn on_camera_stopped(&self, rect: ViewportRect, zoom: f64) {
        self.pipeline
            .camera_stopped(CameraStop::new(rect, ZoomLevel::from_camera(zoom)));
    }

    pub fn on_zoom_changed(&self, zoom: f64) {
        self.pipeline.zoom_changed(ZoomLevel::from_camera(zoom));
    }

    pub fn locate_me(&self) {
        self.pipeline.locate_me();
    }

    // --- user actions --------------------------------------------------------------------------

    /// Switches between the official and realtime overlays
    pub fn select_mode(&mut self, mode: MapMode) {
        if mode == self.mode {
            return;
        }
        log::info!("mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;

        match mode.group() {
            Some(group) => self.overlay.show_only(group),
            None => {
                self.overlay.hide(OverlayGroup::Official);
                self.overlay.hide(OverlayGroup::Realtime);
            }
        }
        self.overlay.show(OverlayGroup::Favorite);

        if let Some(kind) = kind_for(mode) {
            self.pipeline.requery(kind);
        }
        let panel = self.list_panel();
        self.set_panel(panel);
    }

    /// Routes a tap on a rendered marker. Returns `false` for stale or
    /// unknown markers.
    pub fn handle_marker_tap(&mut self, shape_id: &str) -> bool {
        let hit = self.overlay.dispatch_tap(shape_id);
        self.drain_taps();
        hit
    }

    /// Routes a tap on the map surface to the area underneath, if any
    pub fn handle_map_tap(&mut self, point: LatLng) -> bool {
        match self.overlay.polygon_at(&point) {
            Some((group, item_id)) => {
                self.on_tap(TapEvent { group, item_id });
                true
            }
            None => false,
        }
    }

    /// Flips the favorite flag of a known place.
    ///
    /// The change is applied immediately and rolled back if the backend
    /// rejects it. Returns `false` if the place is not currently loaded.
    pub fn toggle_favorite(&mut self, place: &PlaceRef) -> bool {
        let Some(current) = self.find_place(place).map(|p| p.is_favorite) else {
            log::debug!("cannot toggle favorite for unknown place {}", place);
            return false;
        };
        let favorite = !current;
        self.apply_favorite(place, favorite);

        let service = self.service.clone();
        let tx = self.favorite_tx.clone();
        let place = place.clone();
        runtime::spawn(async move {
            let result = service.set_favorite(&place, favorite).await;
            let outcome = FavoriteOutcome {
                place,
                favorite,
                result,
            };
            if tx.send(outcome).is_err() {
                log::debug!("favorite receiver dropped");
            }
        });
        true
    }

    /// Dragging the panel to full screen disables the map's own controls
    pub fn set_panel_extent(&mut self, extent: PanelExtent) {
        if self.panel.is_collapsed() && extent == PanelExtent::Full {
            return;
        }
        self.extent = extent;
        self.controls_enabled = extent == PanelExtent::Partial;
    }

    /// Leaves the detail panel for the list (or collapsed) state
    pub fn close_detail(&mut self) {
        self.pending_detail = None;
        if self.panel.detail().is_some() {
            let panel = self.list_panel();
            self.set_panel(panel);
        }
    }

    // --- event application ---------------------------------------------------------------------

    /// Applies everything background tasks delivered since the last call.
    ///
    /// Returns the number of updates applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;

        if self.official_rx.has_changed().unwrap_or(false) {
            let batch = self.official_rx.borrow_and_update().clone();
            if let Err(err) = self.apply_official(&batch) {
                log::error!("failed to bind official places: {}", err);
            }
            applied += 1;
        }
        if self.user_rx.has_changed().unwrap_or(false) {
            let batch = self.user_rx.borrow_and_update().clone();
            if let Err(err) = self.apply_user(&batch) {
                log::error!("failed to bind user places: {}", err);
            }
            applied += 1;
        }

        applied += self.drain_taps();

        while let Ok(outcome) = self.detail_rx.try_recv() {
            self.apply_detail(outcome);
            applied += 1;
        }
        while let Ok(outcome) = self.favorite_rx.try_recv() {
            self.apply_favorite_outcome(outcome);
            applied += 1;
        }
        applied
    }

    fn drain_taps(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.tap_rx.try_recv() {
            self.on_tap(event);
            handled += 1;
        }
        handled
    }

    fn visual(&self, group: OverlayGroup) -> GroupVisual {
        self.visuals
            .get(&group)
            .cloned()
            .unwrap_or_else(|| GroupVisual::for_group(group))
    }

    fn tap_handler(&self) -> TapHandler {
        let tx = self.tap_tx.clone();
        Arc::new(move |group, item_id: &str| {
            let event = TapEvent {
                group,
                item_id: item_id.to_string(),
            };
            if tx.send(event).is_err() {
                log::debug!("tap receiver dropped");
            }
        })
    }

    fn apply_official(&mut self, batch: &PlaceBatch) -> Result<()> {
        self.official = batch.places.clone();
        self.bind_official()?;
        self.bind_favorites()?;
        self.after_group_result(OverlayGroup::Official, self.official.is_empty());
        Ok(())
    }

    fn bind_official(&mut self) -> Result<()> {
        let group = OverlayGroup::Official;
        let visual = self.visual(group);
        let handler = self.tap_handler();
        self.overlay.set_pois(
            group,
            &self.official,
            &visual,
            |item| StyleKey::marker(group, item.congestion, item.is_favorite),
            Some(handler),
        )?;

        let areas: Vec<PolygonItem> = self.official.iter().filter_map(PolygonItem::from_place).collect();
        self.overlay.set_polygons(group, &areas, &visual)?;
        Ok(())
    }

    fn apply_user(&mut self, batch: &PlaceBatch) -> Result<()> {
        self.user = batch.places.clone();
        self.user_clusters = batch.clusters.clone();
        let zoom = batch
            .query
            .as_ref()
            .map(|q| q.zoom)
            .unwrap_or_else(|| self.config.pipeline.min_zoom());
        self.bind_user(zoom)?;
        self.bind_favorites()?;
        self.after_group_result(OverlayGroup::Realtime, batch.is_empty());
        Ok(())
    }

    fn bind_user(&mut self, zoom: ZoomLevel) -> Result<()> {
        let group = OverlayGroup::Realtime;
        let visual = self.visual(group);
        let handler = self.tap_handler();

        let outcome = self.clusterer.cluster(&self.user, zoom);
        let mut clusters = outcome.clusters;
        clusters.extend(self.user_clusters.iter().cloned());

        self.overlay.set_pois(
            group,
            &outcome.singles,
            &visual,
            |item| StyleKey::marker(group, item.congestion, item.is_favorite),
            Some(handler),
        )?;
        self.overlay.set_clusters(group, &clusters, &visual, |cluster| {
            StyleKey::cluster(group, cluster.congestion, cluster.count)
        })?;
        Ok(())
    }

    fn bind_favorites(&mut self) -> Result<()> {
        let mut seen = HashSet::default();
        self.favorites = self
            .official
            .iter()
            .chain(self.user.iter())
            .filter(|place| place.is_favorite)
            .filter(|place| seen.insert(place.place_ref()))
            .map(|place| FavoriteEntry {
                key: place.place_ref().to_string(),
                place: place.clone(),
            })
            .collect();

        let group = OverlayGroup::Favorite;
        let visual = self.visual(group);
        let handler = self.tap_handler();
        self.overlay.set_pois(
            group,
            &self.favorites,
            &visual,
            |entry| StyleKey::marker(group, entry.place.congestion, false),
            Some(handler),
        )?;
        Ok(())
    }

    /// Re-hides inactive groups after a bind and moves the panel
    fn after_group_result(&mut self, group: OverlayGroup, empty: bool) {
        if self.mode.group() != Some(group) {
            self.overlay.hide(group);
            return;
        }
        if self.panel.detail().is_some() {
            return;
        }
        let panel = if empty {
            PanelState::Collapsed
        } else {
            PanelState::List
        };
        self.set_panel(panel);
    }

    fn list_panel(&self) -> PanelState {
        if self.list_items().is_empty() && self.active_clusters().is_empty() {
            PanelState::Collapsed
        } else {
            PanelState::List
        }
    }

    fn set_panel(&mut self, panel: PanelState) {
        if panel.name() != self.panel.name() {
            log::debug!("panel {} -> {}", self.panel.name(), panel.name());
        }
        if panel.is_collapsed() {
            self.extent = PanelExtent::Partial;
            self.controls_enabled = true;
        }
        self.panel = panel;
    }

    fn resolve_tap(&self, event: &TapEvent) -> Option<PlaceRef> {
        match event.group {
            OverlayGroup::Official => self
                .official
                .iter()
                .find(|p| p.id == event.item_id)
                .map(PlaceItem::place_ref),
            OverlayGroup::Realtime => self
                .user
                .iter()
                .find(|p| p.id == event.item_id)
                .map(PlaceItem::place_ref),
            OverlayGroup::Favorite => self
                .favorites
                .iter()
                .find(|entry| entry.key == event.item_id)
                .map(|entry| entry.place.place_ref()),
        }
    }

    fn on_tap(&mut self, event: TapEvent) {
        let active = event.group == OverlayGroup::Favorite || self.mode.group() == Some(event.group);
        if !active || !self.overlay.is_visible(event.group) {
            log::debug!("ignoring tap on inactive group {}", event.group);
            return;
        }
        match self.resolve_tap(&event) {
            Some(place) => self.open_detail(place),
            None => log::debug!("tap on {} item {} with no backing place", event.group, event.item_id),
        }
    }

    fn open_detail(&mut self, place: PlaceRef) {
        let ttl = self.config.controller.detail_ttl();
        let cached = self
            .detail_cache
            .get(&place)
            .filter(|entry| entry.fetched_at.elapsed() <= ttl)
            .map(|entry| entry.detail.clone());
        if let Some(detail) = cached {
            log::debug!("detail for {} served from cache", place);
            self.pending_detail = None;
            self.show_detail(detail);
            return;
        }

        self.detail_token += 1;
        let token = self.detail_token;
        self.pending_detail = Some(PendingDetail {
            token,
            place: place.clone(),
            mode: self.mode,
        });

        let service = self.service.clone();
        let tx = self.detail_tx.clone();
        log::debug!("fetching detail #{} for {}", token, place);
        runtime::spawn(async move {
            let result = service.place_detail(&place).await;
            if tx.send(DetailOutcome { token, place, result }).is_err() {
                log::debug!("detail receiver dropped for #{}", token);
            }
        });
    }

    fn show_detail(&mut self, mut detail: PlaceDetail) {
        if let Some(place) = self.find_place(&detail.place) {
            detail.is_favorite = place.is_favorite;
        }
        self.set_panel(PanelState::Detail(Box::new(detail)));
    }

    fn apply_detail(&mut self, outcome: DetailOutcome) {
        let pending = match self.pending_detail.take() {
            Some(pending) if pending.token == outcome.token && pending.place == outcome.place => pending,
            other => {
                self.pending_detail = other;
                if let Ok(detail) = outcome.result {
                    self.cache_detail(detail);
                }
                log::debug!("discarding stale detail #{} for {}", outcome.token, outcome.place);
                return;
            }
        };

        match outcome.result {
            Ok(detail) => {
                self.cache_detail(detail.clone());
                if pending.mode != self.mode {
                    log::debug!("mode changed while loading {}; not opening detail", pending.place);
                    return;
                }
                self.show_detail(detail);
            }
            Err(err) => {
                log::warn!("detail for {} failed: {}", pending.place, err);
                self.notices.emit(Notice::new(
                    NoticeKind::DetailFailed(pending.place),
                    format!("Could not load place details: {}", err),
                ));
            }
        }
    }

    fn cache_detail(&mut self, detail: PlaceDetail) {
        self.detail_cache.put(
            detail.place.clone(),
            CachedDetail {
                detail,
                fetched_at: Instant::now(),
            },
        );
    }

    fn find_place(&self, place: &PlaceRef) -> Option<&PlaceItem> {
        let list = match place.kind {
            PlaceKind::Official => &self.official,
            PlaceKind::User => &self.user,
        };
        list.iter().find(|p| p.id == place.id)
    }

    fn apply_favorite(&mut self, place: &PlaceRef, favorite: bool) {
        let list = match place.kind {
            PlaceKind::Official => &mut self.official,
            PlaceKind::User => &mut self.user,
        };
        let Some(item) = list.iter_mut().find(|p| p.id == place.id) else {
            return;
        };
        item.is_favorite = favorite;
        let congestion = item.congestion;

        let group = group_for(place.kind);
        let visual = self.visual(group);
        let key = StyleKey::marker(group, congestion, favorite);
        if !self.overlay.restyle_point(group, &place.id, &key, &visual) {
            log::trace!("{} is not bound as a point marker", place);
        }
        if let Err(err) = self.bind_favorites() {
            log::error!("failed to rebind favorites: {}", err);
        }

        if let PanelState::Detail(detail) = &mut self.panel {
            if detail.place == *place {
                detail.is_favorite = favorite;
            }
        }
        if let Some(cached) = self.detail_cache.peek_mut(place) {
            cached.detail.is_favorite = favorite;
        }
    }

    fn apply_favorite_outcome(&mut self, outcome: FavoriteOutcome) {
        match outcome.result {
            Ok(()) => log::info!("{} favorite set to {}", outcome.place, outcome.favorite),
            Err(err) => {
                let still_applied = self
                    .find_place(&outcome.place)
                    .map(|p| p.is_favorite == outcome.favorite)
                    .unwrap_or(false);
                if still_applied {
                    self.apply_favorite(&outcome.place, !outcome.favorite);
                }
                self.notices.emit(Notice::new(
                    NoticeKind::FavoriteFailed(outcome.place),
                    format!("Could not update favorite: {}", err),
                ));
            }
        }
    }

    // --- accessors -----------------------------------------------------------------------------

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn panel_extent(&self) -> PanelExtent {
        self.extent
    }

    /// Whether the map's zoom and locate buttons accept input
    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    /// Places listed in the panel for the current mode
    pub fn list_items(&self) -> &[PlaceItem] {
        match self.mode {
            MapMode::Idle => &[],
            MapMode::Official => &self.official,
            MapMode::Realtime => &self.user,
        }
    }

    fn active_clusters(&self) -> &[ClusterItem] {
        match self.mode {
            MapMode::Realtime => &self.user_clusters,
            _ => &[],
        }
    }

    pub fn official_places(&self) -> &[PlaceItem] {
        &self.official
    }

    pub fn user_places(&self) -> &[PlaceItem] {
        &self.user
    }

    pub fn favorite_count(&self) -> usize {
        self.favorites.len()
    }

    pub fn overlay(&self) -> &OverlayManager {
        &self.overlay
    }

    pub fn pipeline(&self) -> &PipelineHandle {
        &self.pipeline
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
