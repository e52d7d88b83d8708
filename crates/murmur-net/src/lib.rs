// HTTP transport for the feed server.

pub mod http;
pub mod wire;

pub use http::{error_for_status, user_agent, HttpFeedApi};
pub use wire::{CreateBody, ItemWire};
