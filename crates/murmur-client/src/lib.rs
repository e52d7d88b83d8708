//! # murmur-client
//!
//! Client-side engine of the Murmur feed: paginated loading, optimistic likes,
//! scroll-driven prefetch, publishing, reply threads and user timelines.

pub mod app;
pub mod compose;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod item;
pub mod mutation;
pub mod profile;
pub mod replies;
pub mod scroll;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use app::MurmurApp;
pub use compose::{Composer, Draft};
pub use config::ClientConfig;
pub use error::{ClientError, ComposeError};
pub use events::{ViewEvent, ViewEvents};
pub use feed::{FeedController, FeedSnapshot, FeedStatus, LoadOutcome, LoadTicket};
pub use item::SharedItem;
pub use mutation::{LikeOutcome, LikeTicket, MutationCoordinator, PendingLike};
pub use profile::{ProfileSnapshot, ProfileStatus, ProfileTimeline};
pub use replies::{ReplyThread, ThreadSnapshot, ThreadStatus};
pub use scroll::{ScrollConfig, ScrollPosition, ScrollTrigger};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("murmur_client=debug,murmur_net=info,murmur_shared=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
