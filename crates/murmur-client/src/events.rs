use tokio::sync::broadcast;

use murmur_shared::constants::VIEW_EVENT_CAPACITY;
use murmur_shared::{ApiError, ItemId, UserId};

/// Notifications telling the view what to re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Items, cursor or loading status of the feed changed.
    FeedChanged,
    /// Like or reply counters of one item changed.
    ItemChanged(ItemId),
    /// A like/unlike was rejected and has been reverted.
    LikeFailed { item: ItemId, error: ApiError },
    PostPublished(ItemId),
    /// The reply list under this parent changed.
    RepliesChanged(ItemId),
    /// A user's timeline was (re)loaded.
    ProfileChanged(UserId),
}

/// Broadcast hub for [`ViewEvent`]s. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ViewEvents {
    tx: broadcast::Sender<ViewEvent>,
}

impl ViewEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(VIEW_EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ViewEvent) {
        // No subscriber is a normal state (headless use, tests).
        if self.tx.send(event).is_err() {
            tracing::trace!("View event dropped: no subscribers");
        }
    }
}

impl Default for ViewEvents {
    fn default() -> Self {
        Self::new()
    }
}
