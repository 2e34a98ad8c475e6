//! User-visible, non-blocking notifications
//!
//! Failures that the engine recovers from (a fetch degraded to an empty
//! list, a rolled-back favorite toggle) are still reported here so the host
//! can show a toast. Sending never blocks and never fails the caller.

use crate::data::model::{PlaceKind, PlaceRef};
use crossbeam_channel::{Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    /// A viewport fetch failed and was shown as empty
    FetchFailed(PlaceKind),
    DetailFailed(PlaceRef),
    FavoriteFailed(PlaceRef),
    LocationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

pub type NoticeReceiver = Receiver<Notice>;

/// Cloneable sending half of the notice channel
#[derive(Debug, Clone)]
pub struct NoticeSender {
    tx: Sender<Notice>,
}

impl NoticeSender {
    pub fn emit(&self, notice: Notice) {
        log::warn!("notice: {:?}: {}", notice.kind, notice.message);
        if self.tx.send(notice).is_err() {
            log::debug!("notice receiver dropped");
        }
    }
}

pub fn channel() -> (NoticeSender, NoticeReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (NoticeSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_survives_dropped_receiver() {
        let (tx, rx) = channel();
        tx.emit(Notice::new(NoticeKind::LocationFailed, "location timed out"));
        assert_eq!(rx.try_recv().unwrap().message, "location timed out");

        drop(rx);
        tx.emit(Notice::new(NoticeKind::FetchFailed(PlaceKind::User), "offline"));
    }
}
