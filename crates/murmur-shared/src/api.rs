//! The remote collaborators the feed engine talks to.
//!
//! Transport and encoding live behind [`FeedApi`]; the engine only sees
//! decoded domain values and an [`ApiError`] on failure.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::post::NewPost;
use crate::types::{Item, ItemId, Page, PageCursor, UserId};

#[async_trait]
pub trait FeedApi: Send + Sync {
    /// Fetch the page of items strictly older than `cursor` (newest first),
    /// or the newest page when `cursor` is `None`. Safe to retry.
    async fn fetch_page(&self, cursor: Option<PageCursor>) -> Result<Page, ApiError>;

    /// Current server copy of one item.
    async fn fetch_item(&self, item: &ItemId) -> Result<Item, ApiError>;

    /// Every post written by `user`, as the server orders them.
    async fn fetch_user_items(&self, user: &UserId) -> Result<Vec<Item>, ApiError>;

    /// Publish a new top-level post.
    async fn fetch_create(&self, post: &NewPost) -> Result<Item, ApiError>;

    /// Set whether the current user likes `item`.
    async fn fetch_set_like(&self, item: &ItemId, liked: bool) -> Result<(), ApiError>;

    /// All replies to `parent`.
    async fn fetch_replies(&self, parent: &ItemId) -> Result<Vec<Item>, ApiError>;

    /// Publish a reply to `parent`.
    async fn fetch_create_reply(&self, parent: &ItemId, post: &NewPost) -> Result<Item, ApiError>;
}
