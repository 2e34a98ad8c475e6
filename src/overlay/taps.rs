//! Tap subscriptions for rendered markers
//!
//! Every subscription is recorded under its (group, kind) slot so that a
//! whole slot can be released in one call before its markers are replaced.

use crate::overlay::group::{ItemKind, OverlayGroup};
use crate::prelude::{Arc, HashMap};

/// Callback receiving the group and opaque item id of a tapped shape
pub type TapHandler = Arc<dyn Fn(OverlayGroup, &str) + Send + Sync>;

/// Handle to one marker's tap subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapDisposer {
    id: u64,
    group: OverlayGroup,
    kind: ItemKind,
    shape_id: String,
}

impl TapDisposer {
    pub fn group(&self) -> OverlayGroup {
        self.group
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn shape_id(&self) -> &str {
        &self.shape_id
    }
}

struct Subscription {
    id: u64,
    group: OverlayGroup,
    item_id: String,
    handler: TapHandler,
}

pub struct TapRegistry {
    next_id: u64,
    by_shape: HashMap<String, Subscription>,
    by_slot: HashMap<(OverlayGroup, ItemKind), Vec<TapDisposer>>,
}

impl TapRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            by_shape: HashMap::default(),
            by_slot: HashMap::default(),
        }
    }

    pub fn subscribe(
        &mut self,
        group: OverlayGroup,
        kind: ItemKind,
        shape_id: &str,
        item_id: &str,
        handler: TapHandler,
    ) -> TapDisposer {
        let id = self.next_id;
        self.next_id += 1;

        self.by_shape.insert(
            shape_id.to_string(),
            Subscription {
                id,
                group,
                item_id: item_id.to_string(),
                handler,
            },
        );
        let disposer = TapDisposer {
            id,
            group,
            kind,
            shape_id: shape_id.to_string(),
        };
        self.by_slot
            .entry((group, kind))
            .or_default()
            .push(disposer.clone());
        disposer
    }

    /// Releases one subscription; returns `false` if it was already gone
    pub fn dispose(&mut self, disposer: &TapDisposer) -> bool {
        if let Some(slot) = self.by_slot.get_mut(&(disposer.group, disposer.kind)) {
            slot.retain(|d| d.id != disposer.id);
        }
        match self.by_shape.get(&disposer.shape_id) {
            Some(sub) if sub.id == disposer.id => {
                self.by_shape.remove(&disposer.shape_id);
                true
            }
            _ => false,
        }
    }

    /// Releases every subscription registered for `(group, kind)`
    pub fn dispose_all(&mut self, group: OverlayGroup, kind: ItemKind) -> usize {
        let Some(disposers) = self.by_slot.remove(&(group, kind)) else {
            return 0;
        };
        let mut released = 0;
        for disposer in disposers {
            if matches!(self.by_shape.get(&disposer.shape_id), Some(sub) if sub.id == disposer.id) {
                self.by_shape.remove(&disposer.shape_id);
                released += 1;
            }
        }
        released
    }

    /// Invokes the handler registered for `shape_id`.
    ///
    /// Returns `false` without side effects for unknown or released shapes.
    pub fn dispatch(&self, shape_id: &str) -> bool {
        match self.by_shape.get(shape_id) {
            Some(sub) => {
                (sub.handler)(sub.group, &sub.item_id);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, shape_id: &str) -> bool {
        self.by_shape.contains_key(shape_id)
    }

    pub fn active_count(&self, group: OverlayGroup, kind: ItemKind) -> usize {
        self.by_slot.get(&(group, kind)).map(Vec::len).unwrap_or(0)
    }

    pub fn total_active(&self) -> usize {
        self.by_shape.len()
    }
}

impl Default for TapRegistry {
    fn default() -> Self {
        Self::new()
    }
}
