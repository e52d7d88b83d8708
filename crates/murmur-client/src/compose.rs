//! Writing and publishing new posts.

use std::sync::Arc;

use tracing::info;

use murmur_shared::{FeedApi, NewPost};

use crate::error::ComposeError;
use crate::events::{ViewEvent, ViewEvents};
use crate::feed::FeedController;
use crate::item::SharedItem;

/// Text and optional media reference being written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub content: String,
    pub media_ref: Option<String>,
}

impl Draft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            media_ref: None,
        }
    }

    /// Attach an already-uploaded media object.
    pub fn with_media(mut self, media_ref: impl Into<String>) -> Self {
        self.media_ref = Some(media_ref.into());
        self
    }

    pub fn is_publishable(&self) -> bool {
        !self.content.trim().is_empty() || self.media_ref.is_some()
    }

    pub fn into_post(self) -> Result<NewPost, ComposeError> {
        if !self.is_publishable() {
            return Err(ComposeError::Empty);
        }
        Ok(NewPost::new(self.content, self.media_ref))
    }
}

/// Publishes drafts and puts the result at the top of the feed.
pub struct Composer {
    api: Arc<dyn FeedApi>,
    feed: Arc<FeedController>,
    events: ViewEvents,
}

impl Composer {
    pub fn new(api: Arc<dyn FeedApi>, feed: Arc<FeedController>, events: ViewEvents) -> Self {
        Self { api, feed, events }
    }

    pub async fn publish(&self, draft: Draft) -> Result<SharedItem, ComposeError> {
        let post = draft.into_post()?;
        let created = self.api.fetch_create(&post).await?;
        let shared = self.feed.push_created(created);

        info!(item = %shared.id(), hashtags = post.hashtags.len(), "Post published");
        self.events.emit(ViewEvent::PostPublished(shared.id().clone()));
        Ok(shared)
    }
}
