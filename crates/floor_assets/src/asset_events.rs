use tokio::sync::broadcast;

/// Catalog change notifications, in the order the changes were published.
///
/// Indices refer to the snapshot the change produced (`Inserted`) or the one
/// it replaced (`Removed`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    Rebuilt { len: usize },
    Inserted { index: usize, hash: String },
    Removed { index: usize, hash: String },
}

/// Subscribers that fall this far behind start losing the oldest events.
pub const EVENT_BACKLOG: usize = 64;

pub(crate) fn channel() -> broadcast::Sender<CatalogEvent> {
    broadcast::channel(EVENT_BACKLOG).0
}

pub(crate) fn publish(sender: &broadcast::Sender<CatalogEvent>, event: CatalogEvent) {
    log::debug!("  [CatalogEvents] {:?}", event);
    // No receivers is fine: nobody is watching yet.
    let _ = sender.send(event);
}
