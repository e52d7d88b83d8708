//! # murmur-shared
//!
//! Domain types, error taxonomy, credential decoding and the remote feed
//! contract shared by every Murmur crate.

pub mod api;
pub mod constants;
pub mod error;
pub mod identity;
pub mod post;
pub mod session;
pub mod types;

pub use api::FeedApi;
pub use error::{ApiError, DecodeError, SessionError};
pub use identity::Identity;
pub use post::NewPost;
pub use session::{FileSessionStore, IdentitySession, MemorySessionStore, SessionStore};
pub use types::{Item, ItemId, LikeState, Page, PageCursor, UserId};
