use crate::core::config::PipelineConfig;
use crate::core::viewport::{CameraStop, ViewportRect, ZoomLevel};
use crate::prelude::Duration;
use crate::traits::GeometryOps;
use tokio::time::Instant;

/// Outcome of offering a camera stop to the [`QueryGate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Admit,
    BelowMinZoom,
    /// Inverted corners or coordinates off the globe
    InvalidRect,
    Duplicate,
}

/// Zoom gate followed by the change filter.
///
/// Duplicates are judged against the last rect that passed the zoom gate.
#[derive(Debug, Clone)]
pub struct QueryGate {
    min_zoom: ZoomLevel,
    precision: u32,
    last_admitted: Option<ViewportRect>,
}

impl QueryGate {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            min_zoom: config.min_zoom(),
            precision: config.coordinate_precision,
            last_admitted: None,
        }
    }

    pub fn check(&mut self, stop: &CameraStop) -> GateDecision {
        if stop.zoom < self.min_zoom {
            return GateDecision::BelowMinZoom;
        }
        if !stop.rect.is_valid() {
            return GateDecision::InvalidRect;
        }
        if let Some(last) = &self.last_admitted {
            if last.same_at_precision(&stop.rect, self.precision) {
                return GateDecision::Duplicate;
            }
        }
        self.last_admitted = Some(stop.rect);
        GateDecision::Admit
    }

    pub fn last_admitted(&self) -> Option<&ViewportRect> {
        self.last_admitted.as_ref()
    }
}

/// Trailing-edge debounce: each push restarts the quiet window
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replaces the pending value and restarts the window at `now`
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Takes the pending value once its window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
