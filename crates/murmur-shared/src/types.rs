use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, server-assigned identifier of a post or reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// The server hands out user ids as strings or integers; both are kept as text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The like-related part of an item: what the viewer sees next to the heart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub count: u32,
}

impl LikeState {
    pub fn new(liked: bool, count: u32) -> Self {
        Self { liked, count }
    }

    /// State after setting `liked` to `target`.
    ///
    /// Setting the value the state already has changes nothing; otherwise the
    /// count moves by one in the matching direction and never drops below zero.
    pub fn with_liked(self, target: bool) -> Self {
        if self.liked == target {
            return self;
        }
        let count = if target {
            self.count.saturating_add(1)
        } else {
            self.count.saturating_sub(1)
        };
        Self {
            liked: target,
            count,
        }
    }
}

/// A feed entry or a reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub author_id: UserId,
    pub author_name: String,
    pub content: String,
    pub media_ref: Option<String>,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: u32,
    pub liked_by_current_user: bool,
    pub reply_count: u32,
}

impl Item {
    pub fn like_state(&self) -> LikeState {
        LikeState::new(self.liked_by_current_user, self.like_count)
    }

    pub fn set_like_state(&mut self, state: LikeState) {
        self.liked_by_current_user = state.liked;
        self.like_count = state.count;
    }
}

/// One batch of items returned by a single page fetch, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<Item>,
}

impl Page {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Cursor pointing just past this page, if it has any items.
    pub fn next_cursor(&self) -> Option<PageCursor> {
        self.items.last().map(|item| PageCursor::at(item.created_at))
    }
}

/// Pagination marker: the `created_at` of the oldest item merged so far.
///
/// Absence of a cursor (`Option::None`) means "start of feed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageCursor(DateTime<Utc>);

impl PageCursor {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// Encoding used on the wire: milliseconds since the Unix epoch.
    pub fn to_param(&self) -> String {
        self.0.timestamp_millis().to_string()
    }

    pub fn from_param(param: &str) -> Option<Self> {
        let millis = param.trim().parse::<i64>().ok()?;
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }
}

impl std::fmt::Display for PageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_param())
    }
}
