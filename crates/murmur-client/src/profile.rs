//! One user's timeline.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use murmur_shared::{ApiError, FeedApi, Item, ItemId, UserId};

use crate::events::{ViewEvent, ViewEvents};
use crate::item::SharedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    NotLoaded,
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub user: UserId,
    /// Whether the timeline belongs to the signed-in user.
    pub own: bool,
    pub items: Vec<Item>,
    pub status: ProfileStatus,
    pub error: Option<ApiError>,
}

#[derive(Debug)]
struct ProfileState {
    items: Vec<SharedItem>,
    status: ProfileStatus,
    last_error: Option<ApiError>,
    generation: u64,
}

/// Posts of a single author, fetched in one request.
///
/// Follows the same rules as a reply thread: one fetch in flight, answers
/// arriving after [`ProfileTimeline::close`] are dropped, failures are state.
pub struct ProfileTimeline {
    api: Arc<dyn FeedApi>,
    user: UserId,
    own: bool,
    state: Mutex<ProfileState>,
    events: ViewEvents,
}

impl ProfileTimeline {
    pub fn new(api: Arc<dyn FeedApi>, user: UserId, own: bool, events: ViewEvents) -> Self {
        Self {
            api,
            user,
            own,
            state: Mutex::new(ProfileState {
                items: Vec::new(),
                status: ProfileStatus::NotLoaded,
                last_error: None,
                generation: 0,
            }),
            events,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn is_own(&self) -> bool {
        self.own
    }

    pub fn status(&self) -> ProfileStatus {
        self.lock().status
    }

    pub fn items(&self) -> Vec<SharedItem> {
        self.lock().items.clone()
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        let state = self.lock();
        ProfileSnapshot {
            user: self.user.clone(),
            own: self.own,
            items: state.items.iter().map(SharedItem::snapshot).collect(),
            status: state.status,
            error: state.last_error.clone(),
        }
    }

    /// Fetch the timeline, replacing what was shown before.
    /// Returns `false` if a fetch was already in flight or the answer was stale.
    pub async fn load(&self) -> bool {
        let generation = {
            let mut state = self.lock();
            if state.status == ProfileStatus::Loading {
                return false;
            }
            state.status = ProfileStatus::Loading;
            state.generation
        };

        let result = self.api.fetch_user_items(&self.user).await;

        {
            let mut state = self.lock();
            if state.generation != generation {
                warn!(user = %self.user, "Discarding timeline for a closed profile");
                return false;
            }
            match result {
                Ok(items) => {
                    let mut seen: HashSet<ItemId> = HashSet::new();
                    state.items = items
                        .into_iter()
                        .filter(|item| seen.insert(item.id.clone()))
                        .map(SharedItem::new)
                        .collect();
                    state.status = ProfileStatus::Loaded;
                    state.last_error = None;
                    debug!(user = %self.user, count = state.items.len(), "Timeline loaded");
                }
                Err(e) => {
                    warn!(user = %self.user, error = %e, "Loading timeline failed");
                    state.status = ProfileStatus::Error;
                    state.last_error = Some(e);
                }
            }
        }

        self.events.emit(ViewEvent::ProfileChanged(self.user.clone()));
        true
    }

    pub fn close(&self) {
        let mut state = self.lock();
        state.generation += 1;
        if state.status == ProfileStatus::Loading {
            state.status = ProfileStatus::NotLoaded;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProfileState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{item, settle, FakeFeedApi};

    fn timeline(own: bool) -> (Arc<FakeFeedApi>, Arc<ProfileTimeline>) {
        let api = Arc::new(FakeFeedApi::new());
        let profile = Arc::new(ProfileTimeline::new(
            api.clone(),
            UserId::new("42"),
            own,
            ViewEvents::new(),
        ));
        (api, profile)
    }

    #[tokio::test]
    async fn test_load_keeps_server_order_without_duplicates() {
        let (api, profile) = timeline(true);
        api.push_timeline(Ok(vec![item("c", 30), item("a", 10), item("c", 30)]));

        assert!(profile.load().await);
        let snapshot = profile.snapshot();
        assert!(snapshot.own);
        assert_eq!(snapshot.status, ProfileStatus::Loaded);
        let ids: Vec<&str> = snapshot.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(api.timeline_calls(), vec![UserId::new("42")]);
    }

    #[tokio::test]
    async fn test_failure_is_state_and_retry_recovers() {
        let (api, profile) = timeline(false);
        api.push_timeline(Err(ApiError::Server {
            status: 500,
            message: "boom".into(),
        }));
        profile.load().await;
        assert_eq!(profile.status(), ProfileStatus::Error);
        assert!(profile.snapshot().error.is_some());

        api.push_timeline(Ok(vec![item("a", 10)]));
        profile.load().await;
        assert_eq!(profile.status(), ProfileStatus::Loaded);
        assert_eq!(profile.snapshot().error, None);
        assert_eq!(profile.items().len(), 1);
    }

    #[tokio::test]
    async fn test_close_drops_late_answer() {
        let (api, profile) = timeline(false);
        let gate = api.push_gated_timeline();

        let task = tokio::spawn({
            let profile = profile.clone();
            async move { profile.load().await }
        });
        settle().await;
        assert!(!profile.load().await);

        profile.close();
        gate.send(Ok(vec![item("late", 5)])).unwrap();
        assert!(!task.await.unwrap());
        assert!(profile.items().is_empty());
        assert_eq!(profile.status(), ProfileStatus::NotLoaded);
    }
}
