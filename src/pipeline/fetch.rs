//! Cancel-on-new-request fetch slots
//!
//! Each place kind owns one [`FetchSlot`]. Starting a fetch bumps the slot's
//! generation and aborts the previous task; a finished task publishes only
//! if its generation is still current, checked inside the watch channel's
//! modify closure so the check and the write cannot interleave with a newer
//! start.

use crate::data::model::{ClusterItem, PlaceItem, PlaceKind};
use crate::notice::{Notice, NoticeKind, NoticeSender};
use crate::pipeline::ViewportQuery;
use crate::prelude::{Arc, Future};
use crate::runtime::{self, AsyncHandle};
use crate::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Latest result for one place kind
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceBatch {
    pub kind: PlaceKind,
    /// Zero for the initial empty batch
    pub generation: u64,
    pub query: Option<ViewportQuery>,
    pub places: Vec<PlaceItem>,
    /// Summaries the backend aggregated itself
    pub clusters: Vec<ClusterItem>,
    /// Set when the fetch failed and the batch was degraded to empty
    pub error: Option<String>,
}

impl PlaceBatch {
    pub fn empty(kind: PlaceKind) -> Self {
        Self {
            kind,
            generation: 0,
            query: None,
            places: Vec::new(),
            clusters: Vec::new(),
            error: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty() && self.clusters.is_empty()
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

pub type BatchReceiver = watch::Receiver<Arc<PlaceBatch>>;

/// What a fetch task resolves to
pub type FetchOutput = Result<(Vec<PlaceItem>, Vec<ClusterItem>)>;

pub struct FetchSlot {
    kind: PlaceKind,
    generation: Arc<AtomicU64>,
    tx: Arc<watch::Sender<Arc<PlaceBatch>>>,
    inflight: Option<Box<dyn AsyncHandle>>,
    notices: NoticeSender,
}

impl FetchSlot {
    pub fn new(kind: PlaceKind, notices: NoticeSender) -> (Self, BatchReceiver) {
        let (tx, rx) = watch::channel(Arc::new(PlaceBatch::empty(kind)));
        let slot = Self {
            kind,
            generation: Arc::new(AtomicU64::new(0)),
            tx: Arc::new(tx),
            inflight: None,
            notices,
        };
        (slot, rx)
    }

    pub fn kind(&self) -> PlaceKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> BatchReceiver {
        self.tx.subscribe()
    }

    /// Starts `fetch` for `query`, superseding any fetch still in flight
    pub fn start<Fut>(&mut self, query: ViewportQuery, fetch: Fut) -> u64
    where
        Fut: Future<Output = FetchOutput> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_inflight();

        let kind = self.kind;
        let current = self.generation.clone();
        let tx = self.tx.clone();
        let notices = self.notices.clone();
        log::debug!("fetching {} places #{} for {}", kind, generation, query);

        let handle = runtime::spawn(async move {
            let outcome = fetch.await;
            if current.load(Ordering::SeqCst) != generation {
                log::debug!("discarding stale {} result #{}", kind, generation);
                return;
            }

            let batch = match outcome {
                Ok((places, clusters)) => {
                    log::info!(
                        "{} fetch #{} returned {} places and {} clusters",
                        kind,
                        generation,
                        places.len(),
                        clusters.len()
                    );
                    PlaceBatch {
                        kind,
                        generation,
                        query: Some(query),
                        places,
                        clusters,
                        error: None,
                    }
                }
                Err(err) => {
                    log::warn!("{} fetch #{} failed: {}", kind, generation, err);
                    notices.emit(Notice::new(
                        NoticeKind::FetchFailed(kind),
                        format!("Could not load {} places: {}", kind, err),
                    ));
                    PlaceBatch {
                        kind,
                        generation,
                        query: Some(query),
                        places: Vec::new(),
                        clusters: Vec::new(),
                        error: Some(err.to_string()),
                    }
                }
            };

            let batch = Arc::new(batch);
            tx.send_if_modified(|latest| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *latest = batch;
                true
            });
        });
        self.inflight = Some(handle);
        generation
    }

    pub fn is_inflight(&self) -> bool {
        self.inflight.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    fn abort_inflight(&mut self) {
        if let Some(handle) = self.inflight.take() {
            if !handle.is_finished() {
                log::debug!("cancelling in-flight {} fetch", self.kind);
                handle.cancel();
            }
        }
    }

    /// Aborts the in-flight fetch and invalidates its result
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_inflight();
    }
}

impl Drop for FetchSlot {
    fn drop(&mut self) {
        self.abort_inflight();
    }
}
