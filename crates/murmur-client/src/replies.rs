//! Reply thread under a single post.
//!
//! Replies are fetched in one request (no pagination) and kept in the order
//! the server returns them. Like the feed, a thread allows one fetch in flight
//! and drops answers that arrive after [`ReplyThread::close`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use murmur_shared::{ApiError, FeedApi, Item, ItemId};

use crate::compose::Draft;
use crate::error::ComposeError;
use crate::events::{ViewEvent, ViewEvents};
use crate::item::SharedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    NotLoaded,
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSnapshot {
    pub parent: Item,
    pub replies: Vec<Item>,
    pub status: ThreadStatus,
    pub error: Option<ApiError>,
}

#[derive(Debug)]
struct ThreadState {
    replies: Vec<SharedItem>,
    ids: HashSet<ItemId>,
    status: ThreadStatus,
    last_error: Option<ApiError>,
    generation: u64,
}

impl ThreadState {
    fn push(&mut self, reply: Item) -> Option<SharedItem> {
        if !self.ids.insert(reply.id.clone()) {
            return None;
        }
        let shared = SharedItem::new(reply);
        self.replies.push(shared.clone());
        Some(shared)
    }
}

pub struct ReplyThread {
    api: Arc<dyn FeedApi>,
    parent: SharedItem,
    state: Mutex<ThreadState>,
    events: ViewEvents,
}

impl ReplyThread {
    pub fn new(api: Arc<dyn FeedApi>, parent: SharedItem, events: ViewEvents) -> Self {
        Self {
            api,
            parent,
            state: Mutex::new(ThreadState {
                replies: Vec::new(),
                ids: HashSet::new(),
                status: ThreadStatus::NotLoaded,
                last_error: None,
                generation: 0,
            }),
            events,
        }
    }

    pub fn parent(&self) -> &SharedItem {
        &self.parent
    }

    pub fn status(&self) -> ThreadStatus {
        self.lock().status
    }

    pub fn replies(&self) -> Vec<SharedItem> {
        self.lock().replies.clone()
    }

    pub fn snapshot(&self) -> ThreadSnapshot {
        let state = self.lock();
        ThreadSnapshot {
            parent: self.parent.snapshot(),
            replies: state.replies.iter().map(SharedItem::snapshot).collect(),
            status: state.status,
            error: state.last_error.clone(),
        }
    }

    /// Fetch the replies, replacing whatever was shown before.
    /// Returns `false` if a fetch was already in flight or the answer was stale.
    pub async fn load(&self) -> bool {
        let generation = {
            let mut state = self.lock();
            if state.status == ThreadStatus::Loading {
                return false;
            }
            state.status = ThreadStatus::Loading;
            state.generation
        };

        let result = self.api.fetch_replies(self.parent.id()).await;

        {
            let mut state = self.lock();
            if state.generation != generation {
                warn!(parent = %self.parent.id(), "Discarding replies for a closed thread");
                return false;
            }
            match result {
                Ok(replies) => {
                    state.replies.clear();
                    state.ids.clear();
                    for reply in replies {
                        state.push(reply);
                    }
                    state.status = ThreadStatus::Loaded;
                    state.last_error = None;

                    let count = u32::try_from(state.replies.len()).unwrap_or(u32::MAX);
                    self.parent.update(|p| p.reply_count = count);
                    debug!(parent = %self.parent.id(), count, "Replies loaded");
                }
                Err(e) => {
                    warn!(parent = %self.parent.id(), error = %e, "Loading replies failed");
                    state.status = ThreadStatus::Error;
                    state.last_error = Some(e);
                }
            }
        }

        self.events
            .emit(ViewEvent::RepliesChanged(self.parent.id().clone()));
        true
    }

    /// Publish a reply and append it to the thread.
    pub async fn reply(&self, draft: Draft) -> Result<SharedItem, ComposeError> {
        let post = draft.into_post()?;
        let created = self
            .api
            .fetch_create_reply(self.parent.id(), &post)
            .await?;
        let id = created.id.clone();

        let appended = self.lock().push(created);
        let shared = match appended {
            Some(shared) => {
                self.parent
                    .update(|p| p.reply_count = p.reply_count.saturating_add(1));
                shared
            }
            // A concurrent load already brought this reply in.
            None => self
                .replies()
                .into_iter()
                .find(|r| r.id() == &id)
                .ok_or_else(|| ComposeError::Api(ApiError::InvalidResponse(id.to_string())))?,
        };

        info!(parent = %self.parent.id(), reply = %shared.id(), "Reply published");
        self.events
            .emit(ViewEvent::RepliesChanged(self.parent.id().clone()));
        self.events
            .emit(ViewEvent::ItemChanged(self.parent.id().clone()));
        Ok(shared)
    }

    /// Stop accepting answers for requests issued so far.
    pub fn close(&self) {
        let mut state = self.lock();
        state.generation += 1;
        if state.status == ThreadStatus::Loading {
            state.status = ThreadStatus::NotLoaded;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ThreadState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
