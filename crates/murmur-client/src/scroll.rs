//! Turns a stream of scroll positions into "load more" requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::feed::{FeedController, FeedStatus};

/// Geometry of the scrolled document at one instant, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ScrollPosition {
    pub fn new(scroll_top: f64, viewport_height: f64, document_height: f64) -> Self {
        Self {
            scroll_top,
            viewport_height,
            document_height,
        }
    }

    /// Pixels left below the bottom edge of the viewport.
    pub fn remaining_distance(&self) -> f64 {
        self.document_height - (self.scroll_top + self.viewport_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollConfig {
    /// Near-bottom margin that triggers loading.
    pub threshold: f64,
    /// Quiet period a burst of signals must be followed by before it counts.
    pub debounce: Duration,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            threshold: murmur_shared::constants::DEFAULT_SCROLL_THRESHOLD_PX,
            debounce: Duration::from_millis(murmur_shared::constants::DEFAULT_DEBOUNCE_MS),
        }
    }
}

pub struct ScrollTrigger {
    feed: Arc<FeedController>,
    config: ScrollConfig,
}

impl ScrollTrigger {
    pub fn new(feed: Arc<FeedController>, config: ScrollConfig) -> Self {
        Self { feed, config }
    }

    /// Whether a settled position should ask the feed for more items.
    pub fn should_load(&self, position: &ScrollPosition) -> bool {
        if position.remaining_distance() > self.config.threshold {
            return false;
        }
        !matches!(
            self.feed.status(),
            FeedStatus::Loading | FeedStatus::Exhausted
        )
    }

    /// Run the trigger on its own task until the signal channel closes.
    pub fn spawn(self, signals: mpsc::Receiver<ScrollPosition>) -> JoinHandle<()> {
        tokio::spawn(self.run(signals))
    }

    /// Debounce loop: every burst of signals is reduced to its last position,
    /// evaluated once the channel has been quiet for `debounce`.
    pub async fn run(self, mut signals: mpsc::Receiver<ScrollPosition>) {
        while let Some(mut latest) = signals.recv().await {
            let mut closed = false;
            loop {
                match tokio::time::timeout(self.config.debounce, signals.recv()).await {
                    Ok(Some(position)) => {
                        trace!(remaining = position.remaining_distance(), "Scroll signal");
                        latest = position;
                    }
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break,
                }
            }

            self.fire(&latest);
            if closed {
                break;
            }
        }
        debug!("Scroll trigger stopped");
    }

    fn fire(&self, position: &ScrollPosition) {
        if !self.should_load(position) {
            return;
        }
        debug!(
            remaining = position.remaining_distance(),
            "Near bottom, requesting more items"
        );
        let feed = self.feed.clone();
        tokio::spawn(async move {
            feed.load_more().await;
        });
    }
}
