//! Credential storage and the cached identity derived from it.
//!
//! A [`SessionStore`] holds the raw bearer credential. [`IdentitySession`]
//! decodes it on demand and caches the result until the store reports a new
//! revision (login, logout) or the cache is explicitly invalidated.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use directories::ProjectDirs;
use tracing::{debug, info};

use crate::constants::SESSION_FILE_NAME;
use crate::error::SessionError;
use crate::identity::{normalize_credential, Identity};
use crate::types::UserId;

/// Backing storage for the bearer credential.
pub trait SessionStore: Send + Sync {
    /// The stored credential, if any.
    fn load(&self) -> Option<String>;

    fn save(&self, credential: &str) -> Result<(), SessionError>;

    fn clear(&self) -> Result<(), SessionError>;

    /// Monotonic counter bumped on every `save` / `clear`.
    fn revision(&self) -> u64;
}

/// Credential kept in process memory only.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    credential: Mutex<Option<String>>,
    revision: AtomicU64,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            credential: Mutex::new(Some(credential.into())),
            revision: AtomicU64::new(0),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.credential.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<String> {
        self.slot().clone()
    }

    fn save(&self, credential: &str) -> Result<(), SessionError> {
        *self.slot() = Some(credential.to_string());
        self.revision.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot() = None;
        self.revision.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

/// Credential persisted as a single file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    revision: AtomicU64,
}

impl FileSessionStore {
    /// Open the store in the platform data directory:
    /// - Linux:   `~/.local/share/murmur/session.token`
    /// - macOS:   `~/Library/Application Support/com.murmur.murmur/session.token`
    /// - Windows: `{FOLDERID_RoamingAppData}\murmur\murmur\data\session.token`
    pub fn new() -> Result<Self, SessionError> {
        let project_dirs =
            ProjectDirs::from("com", "murmur", "murmur").ok_or(SessionError::NoDataDir)?;
        Ok(Self::open_at(project_dirs.data_dir().join(SESSION_FILE_NAME)))
    }

    pub fn open_at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            revision: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<String> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn save(&self, credential: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, credential)?;
        self.revision.fetch_add(1, Ordering::SeqCst);
        debug!(path = %self.path.display(), "Credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.revision.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct CachedIdentity {
    revision: u64,
    identity: Option<Identity>,
}

/// Decodes and caches the current user's identity.
pub struct IdentitySession {
    store: Arc<dyn SessionStore>,
    cache: Mutex<Option<CachedIdentity>>,
}

impl IdentitySession {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(None),
        }
    }

    /// Decode an arbitrary credential without touching the store.
    pub fn decode(&self, credential: &str) -> Option<Identity> {
        Identity::decode(credential)
    }

    /// The identity behind the stored credential, or `None` when logged out,
    /// when the credential is malformed, or when it has expired.
    pub fn current_identity(&self) -> Option<Identity> {
        let revision = self.store.revision();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

        let identity = match cache.as_ref() {
            Some(cached) if cached.revision == revision => cached.identity.clone(),
            _ => {
                let identity = self.store.load().and_then(|c| Identity::decode(&c));
                debug!(
                    revision,
                    authenticated = identity.is_some(),
                    "Identity cache refreshed"
                );
                *cache = Some(CachedIdentity {
                    revision,
                    identity: identity.clone(),
                });
                identity
            }
        };

        identity.filter(|id| !id.is_expired(Utc::now()))
    }

    /// Credential for the `Authorization` header, normalised the same way
    /// as for decoding.
    pub fn credential(&self) -> Option<String> {
        self.store
            .load()
            .map(|c| normalize_credential(&c).to_string())
            .filter(|c| !c.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_identity().is_some()
    }

    /// Whether `user_id` is the current user.
    pub fn is_own_profile(&self, user_id: &UserId) -> bool {
        self.current_identity()
            .is_some_and(|identity| &identity.subject_id == user_id)
    }

    /// Store a new credential and return the identity it carries.
    pub fn login(&self, credential: &str) -> Result<Option<Identity>, SessionError> {
        self.store.save(credential)?;
        self.invalidate();
        let identity = self.current_identity();
        if let Some(ref id) = identity {
            info!(subject = %id.subject_id, "Logged in");
        }
        Ok(identity)
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        self.store.clear()?;
        self.invalidate();
        info!("Logged out");
        Ok(())
    }

    /// Drop the cached identity so the next read decodes the store again.
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
