//! Device location as a replay-latest stream plus on-demand refresh

use crate::core::geo::LatLng;
use crate::prelude::{Duration, Mutex};
use crate::{MapError, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

/// A device position and when it was observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub coordinate: LatLng,
    pub observed_at: Instant,
}

impl LocationFix {
    pub fn now(coordinate: LatLng) -> Self {
        Self {
            coordinate,
            observed_at: Instant::now(),
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.observed_at.elapsed() <= ttl
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Latest known fix, replayed to new subscribers
    fn subscribe(&self) -> watch::Receiver<Option<LocationFix>>;

    /// Obtains a new fix and publishes it to subscribers
    async fn refresh(&self) -> Result<LocationFix>;
}

/// Coordinate from `receiver` if it is younger than `ttl`
pub fn fresh_coordinate(
    receiver: &watch::Receiver<Option<LocationFix>>,
    ttl: Duration,
) -> Option<LatLng> {
    receiver
        .borrow()
        .as_ref()
        .filter(|fix| fix.is_fresh(ttl))
        .map(|fix| fix.coordinate)
}

/// Runs [`LocationProvider::refresh`] with an upper bound on its duration
pub async fn refresh_with_timeout(
    provider: &dyn LocationProvider,
    timeout: Duration,
) -> Result<LocationFix> {
    match tokio::time::timeout(timeout, provider.refresh()).await {
        Ok(result) => result,
        Err(_) => Err(MapError::Timeout(format!(
            "no location fix within {}s",
            timeout.as_secs()
        ))),
    }
}

/// In-memory provider whose position is set by the host.
///
/// While no position is set, [`refresh`](LocationProvider::refresh) waits
/// for the next one.
pub struct ManualLocationProvider {
    tx: watch::Sender<Option<LocationFix>>,
    device: Mutex<Option<LatLng>>,
}

impl ManualLocationProvider {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            device: Mutex::new(None),
        }
    }

    pub fn with_position(coordinate: LatLng) -> Self {
        let provider = Self::new();
        provider.set_position(coordinate);
        provider
    }

    /// Sets the device position and publishes a fix for it
    pub fn set_position(&self, coordinate: LatLng) {
        if let Ok(mut device) = self.device.lock() {
            *device = Some(coordinate);
        }
        self.tx.send_replace(Some(LocationFix::now(coordinate)));
    }

    /// Makes the device unavailable; the last fix stays published
    pub fn clear_position(&self) {
        if let Ok(mut device) = self.device.lock() {
            *device = None;
        }
    }

    fn device(&self) -> Option<LatLng> {
        self.device.lock().ok().and_then(|device| *device)
    }
}

impl Default for ManualLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationProvider for ManualLocationProvider {
    fn subscribe(&self) -> watch::Receiver<Option<LocationFix>> {
        self.tx.subscribe()
    }

    async fn refresh(&self) -> Result<LocationFix> {
        if let Some(coordinate) = self.device() {
            let fix = LocationFix::now(coordinate);
            self.tx.send_replace(Some(fix));
            return Ok(fix);
        }

        let mut rx = self.tx.subscribe();
        loop {
            rx.changed()
                .await
                .map_err(|_| MapError::LocationUnavailable)?;
            if let Some(fix) = *rx.borrow_and_update() {
                return Ok(fix);
            }
        }
    }
}
