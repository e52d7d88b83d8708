//! Scriptable in-memory [`FeedApi`] for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::oneshot;

use murmur_shared::{ApiError, FeedApi, Item, ItemId, NewPost, Page, PageCursor, UserId};

/// One scripted answer: available now, or held until the test releases it.
pub(crate) enum Reply<T> {
    Ready(Result<T, ApiError>),
    Gated(oneshot::Receiver<Result<T, ApiError>>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> Result<T, ApiError> {
        match self {
            Reply::Ready(result) => result,
            Reply::Gated(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ApiError::Network("gate dropped".into()))),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeFeedApi {
    pages: Mutex<VecDeque<Reply<Page>>>,
    likes: Mutex<VecDeque<Reply<()>>>,
    replies: Mutex<VecDeque<Reply<Vec<Item>>>>,
    lookups: Mutex<VecDeque<Reply<Item>>>,
    timelines: Mutex<VecDeque<Reply<Vec<Item>>>>,
    creates: Mutex<VecDeque<Result<(), ApiError>>>,
    page_calls: Mutex<Vec<Option<PageCursor>>>,
    like_calls: Mutex<Vec<(ItemId, bool)>>,
    reply_calls: Mutex<Vec<ItemId>>,
    lookup_calls: Mutex<Vec<ItemId>>,
    timeline_calls: Mutex<Vec<UserId>>,
    created: Mutex<Vec<NewPost>>,
    next_id: AtomicU64,
}

impl FakeFeedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, result: Result<Page, ApiError>) {
        self.pages.lock().unwrap().push_back(Reply::Ready(result));
    }

    pub fn push_gated_page(&self) -> oneshot::Sender<Result<Page, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.pages.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    pub fn push_like(&self, result: Result<(), ApiError>) {
        self.likes.lock().unwrap().push_back(Reply::Ready(result));
    }

    pub fn push_gated_like(&self) -> oneshot::Sender<Result<(), ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.likes.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    pub fn push_replies(&self, result: Result<Vec<Item>, ApiError>) {
        self.replies.lock().unwrap().push_back(Reply::Ready(result));
    }

    pub fn push_gated_replies(&self) -> oneshot::Sender<Result<Vec<Item>, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    pub fn push_lookup(&self, result: Result<Item, ApiError>) {
        self.lookups.lock().unwrap().push_back(Reply::Ready(result));
    }

    pub fn push_gated_lookup(&self) -> oneshot::Sender<Result<Item, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.lookups.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    pub fn push_timeline(&self, result: Result<Vec<Item>, ApiError>) {
        self.timelines.lock().unwrap().push_back(Reply::Ready(result));
    }

    pub fn push_gated_timeline(&self) -> oneshot::Sender<Result<Vec<Item>, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.timelines.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    pub fn fail_next_create(&self, error: ApiError) {
        self.creates.lock().unwrap().push_back(Err(error));
    }

    pub fn page_calls(&self) -> Vec<Option<PageCursor>> {
        self.page_calls.lock().unwrap().clone()
    }

    pub fn like_calls(&self) -> Vec<(ItemId, bool)> {
        self.like_calls.lock().unwrap().clone()
    }

    pub fn reply_calls(&self) -> Vec<ItemId> {
        self.reply_calls.lock().unwrap().clone()
    }

    pub fn lookup_calls(&self) -> Vec<ItemId> {
        self.lookup_calls.lock().unwrap().clone()
    }

    pub fn timeline_calls(&self) -> Vec<UserId> {
        self.timeline_calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewPost> {
        self.created.lock().unwrap().clone()
    }

    fn echo(&self, post: &NewPost) -> Result<Item, ApiError> {
        if let Some(Err(e)) = self.creates.lock().unwrap().pop_front() {
            return Err(e);
        }
        self.created.lock().unwrap().push(post.clone());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut created = item(&format!("new-{n}"), 1_000_000 + n as i64);
        created.content = post.content.clone();
        created.media_ref = post.media_ref.clone();
        created.hashtags = post.hashtags.clone();
        created.mentions = post.mentions.clone();
        Ok(created)
    }
}

#[async_trait]
impl FeedApi for FakeFeedApi {
    async fn fetch_page(&self, cursor: Option<PageCursor>) -> Result<Page, ApiError> {
        self.page_calls.lock().unwrap().push(cursor);
        let reply = self.pages.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(Page::default()),
        }
    }

    async fn fetch_item(&self, item: &ItemId) -> Result<Item, ApiError> {
        self.lookup_calls.lock().unwrap().push(item.clone());
        let reply = self.lookups.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Err(ApiError::Conflict(format!("{item} not found"))),
        }
    }

    async fn fetch_user_items(&self, user: &UserId) -> Result<Vec<Item>, ApiError> {
        self.timeline_calls.lock().unwrap().push(user.clone());
        let reply = self.timelines.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_create(&self, post: &NewPost) -> Result<Item, ApiError> {
        self.echo(post)
    }

    async fn fetch_set_like(&self, item: &ItemId, liked: bool) -> Result<(), ApiError> {
        self.like_calls.lock().unwrap().push((item.clone(), liked));
        let reply = self.likes.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(()),
        }
    }

    async fn fetch_replies(&self, parent: &ItemId) -> Result<Vec<Item>, ApiError> {
        self.reply_calls.lock().unwrap().push(parent.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_create_reply(&self, _parent: &ItemId, post: &NewPost) -> Result<Item, ApiError> {
        self.echo(post)
    }
}

/// Item with the given id created `secs` seconds after the epoch.
pub(crate) fn item(id: &str, secs: i64) -> Item {
    Item {
        id: ItemId::new(id),
        author_id: UserId::new("author"),
        author_name: "author".into(),
        content: format!("post {id}"),
        media_ref: None,
        hashtags: Vec::new(),
        mentions: Vec::new(),
        created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        like_count: 0,
        liked_by_current_user: false,
        reply_count: 0,
    }
}

pub(crate) fn page(items: &[(&str, i64)]) -> Page {
    Page::new(items.iter().map(|(id, secs)| item(id, *secs)).collect())
}

pub(crate) fn cursor_at(secs: i64) -> PageCursor {
    PageCursor::at(Utc.timestamp_opt(secs, 0).unwrap())
}

/// Let spawned tasks run until they block.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
