//! Viewport query pipeline
//!
//! Camera stops go through the zoom gate, the change filter and the
//! debounce, are paired with the freshest device coordinate and fan out to
//! one fetch per place kind:
//!
//! ```text
//! CameraStopped ─► QueryGate ─► Debouncer ─► ViewportQuery ─┬─► official FetchSlot ─► watch
//!                                                            └─► user FetchSlot     ─► watch
//! ```
//!
//! The loop runs as a single task; the host talks to it through a
//! [`PipelineHandle`] and reads results from the replay-latest watch
//! receivers. Nothing here fails the loop: fetch errors become empty
//! batches plus a notice.

pub mod fetch;
pub mod gate;

use crate::core::config::PipelineConfig;
use crate::core::geo::LatLng;
use crate::core::viewport::{CameraStop, ViewportRect, ZoomLevel};
use crate::data::model::PlaceKind;
use crate::notice::{Notice, NoticeKind, NoticeSender};
use crate::prelude::Arc;
use crate::runtime::{self, AsyncHandle};
use crate::services::location::{fresh_coordinate, refresh_with_timeout, LocationFix, LocationProvider};
use crate::services::PlaceService;
use crate::traits::GeometryOps;
use crate::Result;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

pub use fetch::{BatchReceiver, FetchSlot, PlaceBatch};
pub use gate::{Debouncer, GateDecision, QueryGate};

/// Where a query's distance-ranking anchor came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorSource {
    Device,
    ViewportCenter,
}

/// A gated, debounced request for one viewport
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportQuery {
    pub rect: ViewportRect,
    pub anchor: LatLng,
    pub anchor_source: AnchorSource,
    pub zoom: ZoomLevel,
}

impl std::fmt::Display for ViewportQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.6},{:.6},{:.6},{:.6}] {} anchor ({:.6},{:.6})",
            self.rect.west,
            self.rect.south,
            self.rect.east,
            self.rect.north,
            self.zoom,
            self.anchor.lat,
            self.anchor.lng
        )
    }
}

#[derive(Debug, Clone)]
pub enum PipelineInput {
    CameraStopped(CameraStop),
    ZoomChanged(ZoomLevel),
    /// Refresh the device location now, bypassing the debounce
    LocateMe,
    /// Re-run the last query for one kind immediately
    Requery(PlaceKind),
    Shutdown,
}

pub struct ViewportPipeline {
    config: PipelineConfig,
    service: Arc<dyn PlaceService>,
    location: Arc<dyn LocationProvider>,
    location_rx: watch::Receiver<Option<LocationFix>>,
    notices: NoticeSender,
    gate: QueryGate,
    debouncer: Debouncer<CameraStop>,
    latest_zoom: Option<ZoomLevel>,
    last_query: Option<ViewportQuery>,
    official: FetchSlot,
    user: FetchSlot,
    inputs: mpsc::UnboundedReceiver<PipelineInput>,
    located_tx: mpsc::UnboundedSender<Result<LocationFix>>,
    located_rx: mpsc::UnboundedReceiver<Result<LocationFix>>,
    locating: Option<Box<dyn AsyncHandle>>,
    queries: watch::Sender<Option<ViewportQuery>>,
}

impl ViewportPipeline {
    /// Starts the pipeline loop on the installed runtime
    pub fn spawn(
        config: PipelineConfig,
        service: Arc<dyn PlaceService>,
        location: Arc<dyn LocationProvider>,
        notices: NoticeSender,
    ) -> PipelineHandle {
        let (input_tx, inputs) = mpsc::unbounded_channel();
        let (located_tx, located_rx) = mpsc::unbounded_channel();
        let (official, official_rx) = FetchSlot::new(PlaceKind::Official, notices.clone());
        let (user, user_rx) = FetchSlot::new(PlaceKind::User, notices.clone());
        let (queries, queries_rx) = watch::channel(None);

        let pipeline = Self {
            debouncer: Debouncer::new(config.debounce()),
            gate: QueryGate::new(&config),
            location_rx: location.subscribe(),
            config,
            service,
            location,
            notices,
            latest_zoom: None,
            last_query: None,
            official,
            user,
            inputs,
            located_tx,
            located_rx,
            locating: None,
            queries,
        };
        let task = runtime::spawn(pipeline.run());

        PipelineHandle {
            inputs: input_tx,
            official: official_rx,
            user: user_rx,
            queries: queries_rx,
            task,
        }
    }

    async fn run(mut self) {
        log::debug!("viewport pipeline started");
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(PipelineInput::Shutdown) | None => break,
                    Some(input) => self.handle_input(input),
                },
                Some(located) = self.located_rx.recv() => self.on_located(located),
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(stop) = self.debouncer.poll(Instant::now()) {
                        self.submit(stop.rect);
                    }
                }
            }
        }

        if let Some(stop) = self.debouncer.cancel() {
            log::debug!("dropping pending camera stop at {}", stop.zoom);
        }
        self.official.cancel();
        self.user.cancel();
        if let Some(handle) = self.locating.take() {
            handle.cancel();
        }
        log::debug!("viewport pipeline stopped");
    }

    fn handle_input(&mut self, input: PipelineInput) {
        match input {
            PipelineInput::CameraStopped(stop) => self.on_camera_stopped(stop),
            PipelineInput::ZoomChanged(zoom) => self.latest_zoom = Some(zoom),
            PipelineInput::LocateMe => self.locate(),
            PipelineInput::Requery(kind) => self.requery(kind),
            PipelineInput::Shutdown => {}
        }
    }

    fn on_camera_stopped(&mut self, stop: CameraStop) {
        match self.gate.check(&stop) {
            GateDecision::BelowMinZoom => {
                log::trace!("dropping camera stop at {} below {}", stop.zoom, self.config.min_zoom());
            }
            GateDecision::InvalidRect => {
                log::warn!("dropping camera stop with invalid viewport {:?}", stop.rect);
            }
            GateDecision::Duplicate => {
                log::trace!("dropping duplicate camera stop");
            }
            GateDecision::Admit => {
                self.latest_zoom = Some(stop.zoom);
                self.debouncer.push(stop, Instant::now());
            }
        }
    }

    fn build_query(&self, rect: ViewportRect) -> ViewportQuery {
        let (anchor, anchor_source) = match fresh_coordinate(&self.location_rx, self.config.location_ttl()) {
            Some(coordinate) => (coordinate, AnchorSource::Device),
            None => (rect.center(), AnchorSource::ViewportCenter),
        };
        ViewportQuery {
            rect,
            anchor,
            anchor_source,
            zoom: self.latest_zoom.unwrap_or_else(|| self.config.min_zoom()),
        }
    }

    fn submit(&mut self, rect: ViewportRect) {
        let query = self.build_query(rect);
        log::info!("querying viewport {}", query);
        self.start_fetch(PlaceKind::Official, query.clone());
        self.start_fetch(PlaceKind::User, query.clone());
        self.last_query = Some(query.clone());
        self.queries.send_replace(Some(query));
    }

    fn start_fetch(&mut self, kind: PlaceKind, query: ViewportQuery) {
        let service = self.service.clone();
        let request = query.clone();
        match kind {
            PlaceKind::Official => {
                self.official.start(query, async move {
                    service.official_places(&request).await.map(|places| (places, Vec::new()))
                });
            }
            PlaceKind::User => {
                self.user.start(query, async move {
                    service
                        .user_places(&request)
                        .await
                        .map(|found| (found.places, found.clusters))
                });
            }
        }
    }

    fn requery(&mut self, kind: PlaceKind) {
        let Some(last) = &self.last_query else {
            log::debug!("no viewport queried yet; ignoring {} requery", kind);
            return;
        };
        let query = self.build_query(last.rect);
        self.start_fetch(kind, query);
    }

    fn locate(&mut self) {
        if self.locating.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            log::debug!("location refresh already in flight");
            return;
        }
        let provider = self.location.clone();
        let timeout = self.config.locate_timeout();
        let tx = self.located_tx.clone();
        self.locating = Some(runtime::spawn(async move {
            let result = refresh_with_timeout(provider.as_ref(), timeout).await;
            if tx.send(result).is_err() {
                log::debug!("location result dropped; pipeline stopped");
            }
        }));
    }

    fn on_located(&mut self, located: Result<LocationFix>) {
        match located {
            Ok(fix) => {
                log::info!(
                    "device located at ({:.6}, {:.6})",
                    fix.coordinate.lat,
                    fix.coordinate.lng
                );
                if let Some(last) = &self.last_query {
                    let rect = last.rect;
                    self.submit(rect);
                }
            }
            Err(err) => {
                self.notices.emit(Notice::new(
                    NoticeKind::LocationFailed,
                    format!("Could not determine your location: {}", err),
                ));
            }
        }
    }
}

/// Host-side handle to a running [`ViewportPipeline`].
///
/// Dropping the handle stops the loop and cancels its fetches.
pub struct PipelineHandle {
    inputs: mpsc::UnboundedSender<PipelineInput>,
    official: BatchReceiver,
    user: BatchReceiver,
    queries: watch::Receiver<Option<ViewportQuery>>,
    task: Box<dyn AsyncHandle>,
}

impl PipelineHandle {
    pub fn send(&self, input: PipelineInput) {
        if self.inputs.send(input).is_err() {
            log::debug!("viewport pipeline is no longer running");
        }
    }

    pub fn camera_stopped(&self, stop: CameraStop) {
        self.send(PipelineInput::CameraStopped(stop));
    }

    pub fn zoom_changed(&self, zoom: ZoomLevel) {
        self.send(PipelineInput::ZoomChanged(zoom));
    }

    pub fn locate_me(&self) {
        self.send(PipelineInput::LocateMe);
    }

    pub fn requery(&self, kind: PlaceKind) {
        self.send(PipelineInput::Requery(kind));
    }

    pub fn shutdown(&self) {
        self.send(PipelineInput::Shutdown);
    }

    /// Replay-latest stream of official place batches
    pub fn official(&self) -> BatchReceiver {
        self.official.clone()
    }

    /// Replay-latest stream of user place batches
    pub fn user(&self) -> BatchReceiver {
        self.user.clone()
    }

    pub fn batches(&self, kind: PlaceKind) -> BatchReceiver {
        match kind {
            PlaceKind::Official => self.official(),
            PlaceKind::User => self.user(),
        }
    }

    /// Most recent query submitted to the fetch slots
    pub fn queries(&self) -> watch::Receiver<Option<ViewportQuery>> {
        self.queries.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.shutdown();
        self.task.cancel();
    }
}
