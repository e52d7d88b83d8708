//! Item records shared between the feed list and the mutation layer.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use murmur_shared::{Item, ItemId, LikeState};

/// Handle to one mutable item record.
///
/// Clones point at the same record, so a like applied through the
/// [`MutationCoordinator`](crate::mutation::MutationCoordinator) is visible in
/// every list that holds the item. `id` and `created_at` never change and are
/// kept outside the lock.
/// Address of a record's allocation. Only meaningful while a handle to the
/// record is kept alive next to the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RecordKey(usize);

#[derive(Debug, Clone)]
pub struct SharedItem {
    id: ItemId,
    created_at: DateTime<Utc>,
    inner: Arc<Mutex<Item>>,
}

impl SharedItem {
    pub fn new(item: Item) -> Self {
        Self {
            id: item.id.clone(),
            created_at: item.created_at,
            inner: Arc::new(Mutex::new(item)),
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Copy of the current record, for rendering.
    pub fn snapshot(&self) -> Item {
        self.lock().clone()
    }

    pub fn like_state(&self) -> LikeState {
        self.lock().like_state()
    }

    pub fn reply_count(&self) -> u32 {
        self.lock().reply_count
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Item) -> R) -> R {
        f(&mut self.lock())
    }

    /// Whether both handles refer to the same record.
    pub fn same_record(&self, other: &SharedItem) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identity of the record itself. Two records loaded for the same id
    /// (say, before and after a feed reset) have different keys.
    pub(crate) fn record_key(&self) -> RecordKey {
        RecordKey(Arc::as_ptr(&self.inner) as usize)
    }

    fn lock(&self) -> MutexGuard<'_, Item> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
