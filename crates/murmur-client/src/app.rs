//! Application state shared by every view.
//!
//! [`MurmurApp`] wires the session, the API and the controllers together so a
//! front end only has to hold one value.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use murmur_net::HttpFeedApi;
use murmur_shared::{FeedApi, Identity, IdentitySession, SessionStore, UserId};

use crate::compose::Composer;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::ViewEvents;
use crate::feed::FeedController;
use crate::item::SharedItem;
use crate::mutation::MutationCoordinator;
use crate::profile::ProfileTimeline;
use crate::replies::ReplyThread;
use crate::scroll::{ScrollPosition, ScrollTrigger};

/// Scroll signals buffered between the view and the trigger task.
const SCROLL_CHANNEL_CAPACITY: usize = 64;

pub struct MurmurApp {
    pub config: ClientConfig,
    pub session: Arc<IdentitySession>,
    pub api: Arc<dyn FeedApi>,
    pub feed: Arc<FeedController>,
    pub likes: Arc<MutationCoordinator>,
    pub composer: Composer,
    pub events: ViewEvents,
}

impl MurmurApp {
    /// Build the app against the HTTP API named in `config`.
    pub fn new(config: ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let session = Arc::new(IdentitySession::new(store));
        let api = HttpFeedApi::new(&config.api_url, config.request_timeout, session.clone())?;
        info!(api_url = %config.api_url, "Client configured");
        Ok(Self::with_api(config, session, Arc::new(api)))
    }

    pub fn with_api(
        config: ClientConfig,
        session: Arc<IdentitySession>,
        api: Arc<dyn FeedApi>,
    ) -> Self {
        let events = ViewEvents::new();
        let feed = Arc::new(FeedController::new(api.clone(), events.clone()));
        let likes = Arc::new(MutationCoordinator::new(api.clone(), events.clone()));
        let composer = Composer::new(api.clone(), feed.clone(), events.clone());
        Self {
            config,
            session,
            api,
            feed,
            likes,
            composer,
            events,
        }
    }

    /// Store a credential and restart the feed under the new identity.
    pub fn login(&self, credential: &str) -> Result<Option<Identity>, ClientError> {
        let identity = self.session.login(credential)?;
        self.feed.reset();
        Ok(identity)
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.session.logout()?;
        self.feed.reset();
        Ok(())
    }

    /// Start a scroll trigger task and return the sender the view feeds it with.
    pub fn scroll_trigger(&self) -> (mpsc::Sender<ScrollPosition>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(SCROLL_CHANNEL_CAPACITY);
        let handle = ScrollTrigger::new(self.feed.clone(), self.config.scroll).spawn(rx);
        (tx, handle)
    }

    pub fn open_thread(&self, parent: SharedItem) -> ReplyThread {
        ReplyThread::new(self.api.clone(), parent, self.events.clone())
    }

    pub fn open_profile(&self, user: UserId) -> ProfileTimeline {
        let own = self.session.is_own_profile(&user);
        ProfileTimeline::new(self.api.clone(), user, own, self.events.clone())
    }

    /// Timeline of the signed-in user, if there is one.
    pub fn open_own_profile(&self) -> Option<ProfileTimeline> {
        let identity = self.session.current_identity()?;
        Some(self.open_profile(identity.subject_id))
    }

    /// Look up an item already shown in the feed.
    pub fn item(&self, id: &str) -> Result<SharedItem, ClientError> {
        self.feed
            .find(&murmur_shared::ItemId::new(id))
            .ok_or_else(|| ClientError::ItemNotFound(id.to_string()))
    }
}
