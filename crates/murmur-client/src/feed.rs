//! Paginated feed retrieval.
//!
//! [`FeedController`] owns the feed state and grows it one page at a time.
//! At most one page request is outstanding per generation; every `reset`
//! starts a new generation so that a response belonging to the previous
//! session is dropped instead of merged.
//!
//! Loading is split into [`FeedController::begin_load`] and
//! [`FeedController::complete_load`] so the state machine can be driven
//! without a network; [`FeedController::load_more`] glues the two around the
//! actual fetch.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use murmur_shared::{ApiError, FeedApi, Item, ItemId, Page, PageCursor};

use crate::events::{ViewEvent, ViewEvents};
use crate::item::SharedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    Loading,
    /// The server returned an empty page; nothing older exists.
    Exhausted,
    /// The last page request failed; `load_more` retries from the same cursor.
    Error,
}

/// Proof that a page request was started, tagged with the generation and
/// cursor it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    cursor: Option<PageCursor>,
}

impl LoadTicket {
    pub fn cursor(&self) -> Option<PageCursor> {
        self.cursor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What a `load_more` call ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Already loading or exhausted; no request was issued.
    Skipped,
    /// The page was merged; `added` items were new.
    Merged { added: usize },
    Exhausted,
    Failed(ApiError),
    /// The response belonged to a generation superseded by `reset`.
    Discarded,
}

/// Read-only view of the feed for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Items published from this client, newest first, outside pagination.
    pub fresh: Vec<Item>,
    /// Paginated items, newest first.
    pub items: Vec<Item>,
    pub cursor: Option<PageCursor>,
    pub status: FeedStatus,
    pub loading: bool,
    pub exhausted: bool,
    pub error: Option<ApiError>,
}

#[derive(Debug)]
struct FeedState {
    items: Vec<SharedItem>,
    ids: HashSet<ItemId>,
    fresh: Vec<SharedItem>,
    cursor: Option<PageCursor>,
    status: FeedStatus,
    last_error: Option<ApiError>,
    generation: u64,
}

impl FeedState {
    fn new(generation: u64) -> Self {
        Self {
            items: Vec::new(),
            ids: HashSet::new(),
            fresh: Vec::new(),
            cursor: None,
            status: FeedStatus::Idle,
            last_error: None,
            generation,
        }
    }

    fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id) || self.fresh.iter().any(|f| f.id() == id)
    }

    /// Add the unseen items of `page`, keeping `items` sorted newest first.
    /// Items sharing a timestamp stay in the order they were first seen.
    fn merge(&mut self, page: Vec<Item>) -> usize {
        let mut added = 0;
        for item in page {
            if self.contains(&item.id) {
                debug!(item = %item.id, "Skipping duplicate item");
                continue;
            }
            let created_at = item.created_at;
            let pos = self
                .items
                .partition_point(|existing| existing.created_at() >= created_at);
            self.ids.insert(item.id.clone());
            self.items.insert(pos, SharedItem::new(item));
            added += 1;
        }
        added
    }

    /// Move the cursor towards older items, never back.
    fn advance_cursor(&mut self, candidate: Option<PageCursor>) -> bool {
        let next = match (self.cursor, candidate) {
            (Some(current), Some(candidate)) => Some(current.min(candidate)),
            (None, candidate) => candidate,
            (current, None) => current,
        };
        let moved = next != self.cursor;
        self.cursor = next;
        moved
    }
}

pub struct FeedController {
    api: Arc<dyn FeedApi>,
    state: Mutex<FeedState>,
    events: ViewEvents,
}

impl FeedController {
    pub fn new(api: Arc<dyn FeedApi>, events: ViewEvents) -> Self {
        Self {
            api,
            state: Mutex::new(FeedState::new(0)),
            events,
        }
    }

    pub fn status(&self) -> FeedStatus {
        self.lock().status
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        self.lock().cursor
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Handles to the paginated items, newest first.
    pub fn items(&self) -> Vec<SharedItem> {
        self.lock().items.clone()
    }

    /// Look an item up among fresh and paginated items.
    pub fn find(&self, id: &ItemId) -> Option<SharedItem> {
        let state = self.lock();
        state
            .fresh
            .iter()
            .chain(state.items.iter())
            .find(|item| item.id() == id)
            .cloned()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.lock();
        FeedSnapshot {
            fresh: state.fresh.iter().map(SharedItem::snapshot).collect(),
            items: state.items.iter().map(SharedItem::snapshot).collect(),
            cursor: state.cursor,
            status: state.status,
            loading: state.status == FeedStatus::Loading,
            exhausted: state.status == FeedStatus::Exhausted,
            error: state.last_error.clone(),
        }
    }

    /// Start a page request if the feed is `Idle` or `Error`.
    ///
    /// Returns `None` while a request is already in flight or once the feed
    /// is exhausted; callers must not issue a fetch in that case.
    pub fn begin_load(&self) -> Option<LoadTicket> {
        let ticket = {
            let mut state = self.lock();
            match state.status {
                FeedStatus::Loading | FeedStatus::Exhausted => {
                    debug!(status = ?state.status, "load_more ignored");
                    return None;
                }
                FeedStatus::Idle | FeedStatus::Error => {}
            }
            state.status = FeedStatus::Loading;
            LoadTicket {
                generation: state.generation,
                cursor: state.cursor,
            }
        };

        debug!(
            generation = ticket.generation,
            cursor = ?ticket.cursor.map(|c| c.to_param()),
            "Page request started"
        );
        self.events.emit(ViewEvent::FeedChanged);
        Some(ticket)
    }

    /// Apply the result of the request identified by `ticket`.
    pub fn complete_load(&self, ticket: LoadTicket, result: Result<Page, ApiError>) -> LoadOutcome {
        let outcome = {
            let mut state = self.lock();
            if ticket.generation != state.generation {
                warn!(
                    ticket = ticket.generation,
                    current = state.generation,
                    "Discarding page from a previous session"
                );
                return LoadOutcome::Discarded;
            }

            match result {
                Ok(page) if page.is_empty() => {
                    state.status = FeedStatus::Exhausted;
                    state.last_error = None;
                    info!(total = state.items.len(), "Feed exhausted");
                    LoadOutcome::Exhausted
                }
                Ok(page) => {
                    let next_cursor = page.next_cursor();
                    let received = page.len();
                    let added = state.merge(page.items);
                    let moved = state.advance_cursor(next_cursor);
                    state.last_error = None;

                    if added == 0 && !moved {
                        // Same page again: asking once more cannot make progress.
                        warn!(received, "Page brought nothing new; treating feed as exhausted");
                        state.status = FeedStatus::Exhausted;
                        LoadOutcome::Exhausted
                    } else {
                        state.status = FeedStatus::Idle;
                        info!(
                            received,
                            added,
                            total = state.items.len(),
                            cursor = ?state.cursor.map(|c| c.to_param()),
                            "Page merged"
                        );
                        LoadOutcome::Merged { added }
                    }
                }
                Err(e) => {
                    warn!(error = %e, retryable = e.is_retryable(), "Page request failed");
                    state.status = FeedStatus::Error;
                    state.last_error = Some(e.clone());
                    LoadOutcome::Failed(e)
                }
            }
        };

        self.events.emit(ViewEvent::FeedChanged);
        outcome
    }

    /// Fetch and merge the next page, unless one is already in flight or the
    /// feed is exhausted.
    pub async fn load_more(&self) -> LoadOutcome {
        let Some(ticket) = self.begin_load() else {
            return LoadOutcome::Skipped;
        };
        let result = self.api.fetch_page(ticket.cursor).await;
        self.complete_load(ticket, result)
    }

    /// Forget everything and start a new generation.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            let generation = state.generation + 1;
            *state = FeedState::new(generation);
            debug!(generation, "Feed reset");
        }
        self.events.emit(ViewEvent::FeedChanged);
    }

    /// Show an item published from this client at the top of the feed.
    /// Pagination state is left untouched.
    pub fn push_created(&self, item: Item) -> SharedItem {
        let shared = {
            let mut state = self.lock();
            if let Some(existing) = state
                .fresh
                .iter()
                .chain(state.items.iter())
                .find(|existing| existing.id() == &item.id)
            {
                return existing.clone();
            }
            let shared = SharedItem::new(item);
            state.fresh.insert(0, shared.clone());
            shared
        };
        self.events.emit(ViewEvent::FeedChanged);
        shared
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cursor_at, item, page, settle, FakeFeedApi};

    fn controller() -> (Arc<FakeFeedApi>, Arc<FeedController>) {
        let api = Arc::new(FakeFeedApi::new());
        let controller = Arc::new(FeedController::new(api.clone(), ViewEvents::new()));
        (api, controller)
    }

    fn ids(snapshot: &FeedSnapshot) -> Vec<&str> {
        snapshot.items.iter().map(|i| i.id.as_str()).collect()
    }

    fn assert_sorted_and_unique(snapshot: &FeedSnapshot) {
        for pair in snapshot.items.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
        let unique: HashSet<_> = snapshot.items.iter().map(|i| &i.id).collect();
        assert_eq!(unique.len(), snapshot.items.len());
    }

    #[tokio::test]
    async fn test_boundary_overlap_is_deduplicated() {
        let (api, feed) = controller();
        api.push_page(Ok(page(&[("B", 10), ("A", 5)])));
        api.push_page(Ok(page(&[("A", 5), ("Z", 1)])));

        assert_eq!(feed.load_more().await, LoadOutcome::Merged { added: 2 });
        let snapshot = feed.snapshot();
        assert_eq!(ids(&snapshot), vec!["B", "A"]);
        assert_eq!(snapshot.cursor, Some(cursor_at(5)));
        assert_eq!(snapshot.status, FeedStatus::Idle);

        assert_eq!(feed.load_more().await, LoadOutcome::Merged { added: 1 });
        let snapshot = feed.snapshot();
        assert_eq!(ids(&snapshot), vec!["B", "A", "Z"]);
        assert_eq!(snapshot.cursor, Some(cursor_at(1)));

        assert_eq!(api.page_calls(), vec![None, Some(cursor_at(5))]);
    }

    #[tokio::test]
    async fn test_empty_page_is_terminal_until_reset() {
        let (api, feed) = controller();
        api.push_page(Ok(Page::default()));

        assert_eq!(feed.load_more().await, LoadOutcome::Exhausted);
        assert!(feed.snapshot().exhausted);

        assert_eq!(feed.load_more().await, LoadOutcome::Skipped);
        assert_eq!(feed.load_more().await, LoadOutcome::Skipped);
        assert_eq!(api.page_calls().len(), 1);

        feed.reset();
        api.push_page(Ok(page(&[("A", 5)])));
        assert_eq!(feed.load_more().await, LoadOutcome::Merged { added: 1 });
        assert_eq!(api.page_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_state_and_retries_same_cursor() {
        let (api, feed) = controller();
        api.push_page(Ok(page(&[("B", 10), ("A", 5)])));
        api.push_page(Err(ApiError::Timeout));
        api.push_page(Ok(page(&[("Z", 1)])));

        feed.load_more().await;
        assert_eq!(feed.load_more().await, LoadOutcome::Failed(ApiError::Timeout));

        let snapshot = feed.snapshot();
        assert_eq!(snapshot.status, FeedStatus::Error);
        assert_eq!(snapshot.error, Some(ApiError::Timeout));
        assert_eq!(ids(&snapshot), vec!["B", "A"]);
        assert_eq!(snapshot.cursor, Some(cursor_at(5)));

        assert_eq!(feed.load_more().await, LoadOutcome::Merged { added: 1 });
        assert_eq!(feed.snapshot().error, None);
        assert_eq!(
            api.page_calls(),
            vec![None, Some(cursor_at(5)), Some(cursor_at(5))]
        );
    }

    #[tokio::test]
    async fn test_at_most_one_request_in_flight() {
        let (api, feed) = controller();
        let gate = api.push_gated_page();

        let first = tokio::spawn({
            let feed = feed.clone();
            async move { feed.load_more().await }
        });
        settle().await;
        assert_eq!(feed.status(), FeedStatus::Loading);

        // Rapid repeated triggers collapse into the outstanding request.
        assert_eq!(feed.load_more().await, LoadOutcome::Skipped);
        assert_eq!(feed.load_more().await, LoadOutcome::Skipped);
        assert_eq!(api.page_calls().len(), 1);

        gate.send(Ok(page(&[("A", 5)]))).unwrap();
        assert_eq!(first.await.unwrap(), LoadOutcome::Merged { added: 1 });
        assert_eq!(feed.status(), FeedStatus::Idle);
    }

    #[tokio::test]
    async fn test_stale_response_after_reset_is_discarded() {
        let (api, feed) = controller();
        let gate = api.push_gated_page();

        let stale = tokio::spawn({
            let feed = feed.clone();
            async move { feed.load_more().await }
        });
        settle().await;

        feed.reset();
        assert_eq!(feed.status(), FeedStatus::Idle);

        gate.send(Ok(page(&[("OLD", 50)]))).unwrap();
        assert_eq!(stale.await.unwrap(), LoadOutcome::Discarded);

        let snapshot = feed.snapshot();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.cursor, None);
        assert_eq!(snapshot.status, FeedStatus::Idle);
    }

    #[test]
    fn test_ticket_from_old_generation_cannot_touch_new_session() {
        let api = Arc::new(FakeFeedApi::new());
        let feed = FeedController::new(api, ViewEvents::new());

        let old = feed.begin_load().unwrap();
        feed.reset();
        let fresh = feed.begin_load().unwrap();
        assert_ne!(old.generation(), fresh.generation());

        assert_eq!(
            feed.complete_load(old, Ok(page(&[("X", 9)]))),
            LoadOutcome::Discarded
        );
        // The new request is still the one in flight.
        assert_eq!(feed.status(), FeedStatus::Loading);
        assert_eq!(
            feed.complete_load(fresh, Ok(page(&[("Y", 8)]))),
            LoadOutcome::Merged { added: 1 }
        );
        assert_eq!(ids(&feed.snapshot()), vec!["Y"]);
    }

    #[test]
    fn test_ordering_and_uniqueness_hold_across_messy_pages() {
        let api = Arc::new(FakeFeedApi::new());
        let feed = FeedController::new(api, ViewEvents::new());
        let pages = [
            page(&[("e", 50), ("d", 40), ("c", 40)]),
            page(&[("c", 40), ("b", 40), ("d", 40), ("a", 30)]),
            // Out-of-order server answer containing something newer.
            page(&[("late", 45), ("a", 30), ("z", 10)]),
            page(&[("z", 10), ("z", 10), ("y", 5)]),
        ];

        for p in pages {
            let ticket = feed.begin_load().unwrap();
            feed.complete_load(ticket, Ok(p));
            assert_sorted_and_unique(&feed.snapshot());
        }

        let snapshot = feed.snapshot();
        assert_eq!(
            ids(&snapshot),
            vec!["e", "late", "d", "c", "b", "a", "z", "y"]
        );
        assert_eq!(snapshot.cursor, Some(cursor_at(5)));
    }

    #[test]
    fn test_repeated_identical_page_stops_pagination() {
        let api = Arc::new(FakeFeedApi::new());
        let feed = FeedController::new(api, ViewEvents::new());

        let ticket = feed.begin_load().unwrap();
        feed.complete_load(ticket, Ok(page(&[("a", 10), ("b", 5)])));
        let ticket = feed.begin_load().unwrap();
        assert_eq!(
            feed.complete_load(ticket, Ok(page(&[("b", 5)]))),
            LoadOutcome::Exhausted
        );
        assert!(feed.begin_load().is_none());
    }

    #[test]
    fn test_created_items_stay_outside_pagination() {
        let api = Arc::new(FakeFeedApi::new());
        let feed = FeedController::new(api, ViewEvents::new());

        let created = feed.push_created(item("mine", 100));
        let snapshot = feed.snapshot();
        assert_eq!(snapshot.fresh.len(), 1);
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.cursor, None);

        // The first page contains the new post; it is not shown twice.
        let ticket = feed.begin_load().unwrap();
        feed.complete_load(ticket, Ok(page(&[("mine", 100), ("older", 50)])));
        let snapshot = feed.snapshot();
        assert_eq!(ids(&snapshot), vec!["older"]);
        assert_eq!(snapshot.cursor, Some(cursor_at(50)));
        assert!(feed.find(&ItemId::new("mine")).unwrap().same_record(&created));

        feed.reset();
        assert!(feed.snapshot().fresh.is_empty());
    }

    #[tokio::test]
    async fn test_events_announce_changes() {
        let (api, feed) = controller();
        let mut rx = feed.events.subscribe();
        api.push_page(Ok(page(&[("A", 5)])));

        feed.load_more().await;
        assert_eq!(rx.recv().await.unwrap(), ViewEvent::FeedChanged);
        assert_eq!(rx.recv().await.unwrap(), ViewEvent::FeedChanged);
    }
}
