//! Optimistic like/unlike.
//!
//! A toggle is applied to the item immediately and confirmed or reverted
//! when the server answers. Several toggles on the same item may be in
//! flight at once; each item keeps an ordered ledger of its unresolved
//! toggles on top of the last confirmed baseline:
//!
//! - a confirmed toggle stays in the ledger until everything issued before it
//!   has resolved, then folds into the baseline;
//! - a failed toggle is dropped from the ledger;
//! - after every resolution the item shows the baseline with the remaining
//!   toggles re-applied in issue order.
//!
//! Reverting a failure therefore only undoes that toggle's own effect and
//! never overwrites a newer optimistic state.
//!
//! Ledgers belong to a record, not to an id. After a feed reset the same id
//! comes back as a new record, and toggles still in flight for the old one
//! never touch it.
//!
//! A toggle rejected with [`ApiError::Conflict`] means the local copy is out
//! of date; [`MutationCoordinator::toggle_like`] then re-reads the item once
//! nothing else is pending on it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use murmur_shared::{ApiError, FeedApi, ItemId, LikeState};

use crate::events::{ViewEvent, ViewEvents};
use crate::item::{RecordKey, SharedItem};

/// A toggle that has been applied locally but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLike {
    pub mutation: u64,
    pub item_id: ItemId,
    pub previous_liked: bool,
    pub previous_count: u32,
    pub target_liked: bool,
    confirmed: bool,
}

#[derive(Debug)]
struct Ledger {
    // Keeps the record alive, so its key cannot be reused while the ledger exists.
    record: SharedItem,
    baseline: LikeState,
    entries: VecDeque<PendingLike>,
}

impl Ledger {
    fn displayed(&self) -> LikeState {
        self.entries
            .iter()
            .fold(self.baseline, |state, entry| state.with_liked(entry.target_liked))
    }

    fn fold_confirmed(&mut self) {
        while self.entries.front().is_some_and(|entry| entry.confirmed) {
            if let Some(entry) = self.entries.pop_front() {
                self.baseline = self.baseline.with_liked(entry.target_liked);
            }
        }
    }
}

/// Handle for one optimistic toggle, needed to resolve it.
#[derive(Debug)]
pub struct LikeTicket {
    mutation: u64,
    item: SharedItem,
    target_liked: bool,
}

impl LikeTicket {
    pub fn target_liked(&self) -> bool {
        self.target_liked
    }

    pub fn item_id(&self) -> &ItemId {
        self.item.id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The server accepted the toggle. `state` is what the item shows now.
    Confirmed(LikeState),
    /// The server rejected the toggle and its effect was undone.
    RolledBack { state: LikeState, error: ApiError },
}

#[derive(Debug, Default)]
struct Ledgers {
    next_mutation: u64,
    by_record: HashMap<RecordKey, Ledger>,
}

pub struct MutationCoordinator {
    api: Arc<dyn FeedApi>,
    ledgers: Mutex<Ledgers>,
    events: ViewEvents,
}

impl MutationCoordinator {
    pub fn new(api: Arc<dyn FeedApi>, events: ViewEvents) -> Self {
        Self {
            api,
            ledgers: Mutex::new(Ledgers::default()),
            events,
        }
    }

    /// Flip the like on `item` locally, recording what to undo on failure.
    pub fn begin_toggle(&self, item: &SharedItem) -> LikeTicket {
        let mut ledgers = self.lock();
        ledgers.next_mutation += 1;
        let mutation = ledgers.next_mutation;

        let (previous, next) = item.update(|record| {
            let previous = record.like_state();
            let next = previous.with_liked(!previous.liked);
            record.set_like_state(next);
            (previous, next)
        });

        let ledger = ledgers
            .by_record
            .entry(item.record_key())
            .or_insert_with(|| Ledger {
                record: item.clone(),
                baseline: previous,
                entries: VecDeque::new(),
            });
        ledger.entries.push_back(PendingLike {
            mutation,
            item_id: item.id().clone(),
            previous_liked: previous.liked,
            previous_count: previous.count,
            target_liked: next.liked,
            confirmed: false,
        });
        drop(ledgers);

        debug!(
            item = %item.id(),
            mutation,
            liked = next.liked,
            count = next.count,
            "Optimistic like applied"
        );
        self.events.emit(ViewEvent::ItemChanged(item.id().clone()));

        LikeTicket {
            mutation,
            item: item.clone(),
            target_liked: next.liked,
        }
    }

    /// Reconcile the toggle behind `ticket` with the server's answer.
    pub fn resolve(&self, ticket: LikeTicket, result: Result<(), ApiError>) -> LikeOutcome {
        let id = ticket.item.id().clone();
        let key = ticket.item.record_key();
        let mut ledgers = self.lock();

        let Some(ledger) = ledgers.by_record.get_mut(&key) else {
            warn!(item = %id, mutation = ticket.mutation, "Resolution for unknown like");
            let state = ticket.item.like_state();
            return match result {
                Ok(()) => LikeOutcome::Confirmed(state),
                Err(error) => LikeOutcome::RolledBack { state, error },
            };
        };

        let position = ledger
            .entries
            .iter()
            .position(|entry| entry.mutation == ticket.mutation);

        match (&result, position) {
            (Ok(()), Some(pos)) => ledger.entries[pos].confirmed = true,
            (Err(_), Some(pos)) => {
                ledger.entries.remove(pos);
            }
            (_, None) => {
                warn!(item = %id, mutation = ticket.mutation, "Like resolved twice");
            }
        }
        ledger.fold_confirmed();

        let state = ledger.displayed();
        ledger.record.update(|record| record.set_like_state(state));

        let settled = ledger.entries.is_empty();
        if settled {
            ledgers.by_record.remove(&key);
        }
        drop(ledgers);

        self.events.emit(ViewEvent::ItemChanged(id.clone()));

        match result {
            Ok(()) => {
                debug!(item = %id, mutation = ticket.mutation, settled, "Like confirmed");
                LikeOutcome::Confirmed(state)
            }
            Err(error) => {
                warn!(
                    item = %id,
                    mutation = ticket.mutation,
                    error = %error,
                    liked = state.liked,
                    count = state.count,
                    "Like rejected, reverted"
                );
                self.events.emit(ViewEvent::LikeFailed {
                    item: id,
                    error: error.clone(),
                });
                LikeOutcome::RolledBack { state, error }
            }
        }
    }

    /// Toggle the like on `item`: optimistic update, server call, reconciliation.
    pub async fn toggle_like(&self, item: &SharedItem) -> LikeOutcome {
        let ticket = self.begin_toggle(item);
        let result = self
            .api
            .fetch_set_like(item.id(), ticket.target_liked)
            .await;
        match self.resolve(ticket, result) {
            LikeOutcome::Confirmed(state) => {
                info!(item = %item.id(), liked = state.liked, "Like saved");
                LikeOutcome::Confirmed(state)
            }
            LikeOutcome::RolledBack {
                error: error @ ApiError::Conflict(_),
                state,
            } => {
                let state = match self.refresh(item).await {
                    Ok(true) => item.like_state(),
                    Ok(false) => state,
                    Err(e) => {
                        warn!(item = %item.id(), error = %e, "Refresh after conflict failed");
                        state
                    }
                };
                LikeOutcome::RolledBack { state, error }
            }
            rolled_back => rolled_back,
        }
    }

    /// Re-read `item` from the server and adopt its like and reply counters.
    ///
    /// Returns `Ok(false)` without applying anything while a toggle on the
    /// record is unresolved, since the server copy would hide it.
    pub async fn refresh(&self, item: &SharedItem) -> Result<bool, ApiError> {
        if self.has_pending(item) {
            debug!(item = %item.id(), "Refresh skipped, toggles pending");
            return Ok(false);
        }

        let fresh = self.api.fetch_item(item.id()).await?;

        let ledgers = self.lock();
        if ledgers.by_record.contains_key(&item.record_key()) {
            debug!(item = %item.id(), "Refresh dropped, a toggle started meanwhile");
            return Ok(false);
        }
        let state = fresh.like_state();
        item.update(|record| {
            record.set_like_state(state);
            record.reply_count = fresh.reply_count;
        });
        drop(ledgers);

        info!(item = %item.id(), liked = state.liked, count = state.count, "Item refreshed");
        self.events.emit(ViewEvent::ItemChanged(item.id().clone()));
        Ok(true)
    }

    /// Unresolved toggles on `item`, oldest first.
    pub fn pending(&self, item: &SharedItem) -> Vec<PendingLike> {
        self.lock()
            .by_record
            .get(&item.record_key())
            .map(|ledger| {
                ledger
                    .entries
                    .iter()
                    .filter(|entry| !entry.confirmed)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_pending(&self, item: &SharedItem) -> bool {
        !self.pending(item).is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Ledgers> {
        self.ledgers.lock().unwrap_or_else(|e| e.into_inner())
    }
}
