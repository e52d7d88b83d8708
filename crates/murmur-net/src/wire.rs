//! JSON shapes exchanged with the feed server.
//!
//! The server speaks Mongo extended JSON: ids arrive as `{"$oid": ...}` and
//! timestamps as `{"$date": ...}`. Everything is normalised into
//! [`murmur_shared::Item`] here so nothing above this layer sees wire types.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use murmur_shared::{ApiError, Item, ItemId, NewPost, UserId};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Oid {
        #[serde(rename = "$oid")]
        oid: String,
    },
    Plain(String),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Oid { oid } => oid,
            WireId::Plain(s) => s,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireDateValue {
    Millis(i64),
    Text(String),
    Long {
        #[serde(rename = "$numberLong")]
        number_long: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireDate {
    Extended {
        #[serde(rename = "$date")]
        date: WireDateValue,
    },
    Bare(WireDateValue),
}

impl WireDate {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let value = match self {
            WireDate::Extended { date } => date,
            WireDate::Bare(value) => value,
        };
        match value {
            WireDateValue::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            WireDateValue::Long { number_long } => number_long
                .parse::<i64>()
                .ok()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            WireDateValue::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok(),
        }
    }
}

/// A post or reply as the server serialises it.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemWire {
    #[serde(rename = "_id")]
    pub id: WireId,
    pub user_id: serde_json::Value,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub tweet_content: String,
    #[serde(default)]
    pub likes: Vec<serde_json::Value>,
    #[serde(default)]
    pub media_url: Option<String>,
    pub created_at: WireDate,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub reply_count: Option<u32>,
}

impl ItemWire {
    /// Convert to a domain item as seen by `viewer`.
    pub fn into_item(self, viewer: Option<&UserId>) -> Result<Item, ApiError> {
        let created_at = self.created_at.to_datetime().ok_or_else(|| {
            ApiError::InvalidResponse(format!("unreadable created_at: {:?}", self.created_at))
        })?;

        let likers: Vec<String> = self.likes.iter().map(value_to_text).collect();
        let liked_by_current_user =
            viewer.is_some_and(|v| likers.iter().any(|l| l == v.as_str()));

        Ok(Item {
            id: ItemId::new(self.id.into_string()),
            author_id: UserId::new(value_to_text(&self.user_id)),
            author_name: self.username,
            content: self.tweet_content,
            media_ref: self.media_url.filter(|m| !m.is_empty()),
            hashtags: self.hashtags,
            mentions: self.mentions,
            created_at,
            like_count: u32::try_from(likers.len()).unwrap_or(u32::MAX),
            liked_by_current_user,
            reply_count: self.reply_count.unwrap_or(0),
        })
    }
}

/// `{"tweets": [...]}` envelope used by list endpoints.
#[derive(Debug, Deserialize)]
pub struct ItemsEnvelope {
    #[serde(default)]
    pub tweets: Vec<ItemWire>,
}

/// Single-item endpoints answer with `{"tweets": {...}}` (lookup),
/// `{"tweet": {...}}` or the bare item (create).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ItemEnvelope {
    Lookup { tweets: ItemWire },
    Wrapped { tweet: ItemWire },
    Bare(ItemWire),
}

impl ItemEnvelope {
    pub fn into_wire(self) -> ItemWire {
        match self {
            ItemEnvelope::Lookup { tweets } => tweets,
            ItemEnvelope::Wrapped { tweet } => tweet,
            ItemEnvelope::Bare(wire) => wire,
        }
    }
}

/// Request body for new posts and replies.
#[derive(Debug, Serialize)]
pub struct CreateBody<'a> {
    pub tweet_content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_id: Option<&'a str>,
    pub likes: Vec<String>,
    pub hashtags: &'a [String],
    pub mentions: &'a [String],
    pub media_url: Option<&'a str>,
}

impl<'a> CreateBody<'a> {
    pub fn new(post: &'a NewPost, parent: Option<&'a ItemId>) -> Self {
        Self {
            tweet_content: &post.content,
            tweet_id: parent.map(|p| p.as_str()),
            likes: Vec::new(),
            hashtags: &post.hashtags,
            mentions: &post.mentions,
            media_url: post.media_ref.as_deref(),
        }
    }
}

/// Decode a list of wire items, failing on the first unreadable one.
pub fn items_from_wire(
    wires: Vec<ItemWire>,
    viewer: Option<&UserId>,
) -> Result<Vec<Item>, ApiError> {
    wires.into_iter().map(|w| w.into_item(viewer)).collect()
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
