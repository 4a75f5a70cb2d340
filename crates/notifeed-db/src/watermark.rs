use std::cell::Cell;

use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, ensure_finite};
use crate::keys::UserKeys;
use crate::store::OrderedStore;

/// A scalar key with a read-through cache. The cache only ever holds what the store
/// returned or what was successfully written to it.
struct CachedScalar {
    key: String,
    cached: Cell<Option<Option<f64>>>,
}

impl CachedScalar {
    fn new(key: String) -> Self {
        Self {
            key,
            cached: Cell::new(None),
        }
    }

    fn fetch(&self, store: &dyn OrderedStore) -> Result<Option<f64>> {
        if let Some(value) = self.cached.get() {
            return Ok(value);
        }
        let value = store.get_scalar(&self.key)?;
        self.cached.set(Some(value));
        Ok(value)
    }

    fn write(&self, store: &dyn OrderedStore, value: f64) -> Result<()> {
        let value = ensure_finite(value)?;
        store.set_scalar(&self.key, value)?;
        self.cached.set(Some(Some(value)));
        Ok(())
    }
}

/// Confirmed and pending last-read timestamps for one user.
///
/// Values are cached for the lifetime of this object, so it belongs to a single request or
/// session. It is `!Sync`.
pub struct ReadWatermark {
    user_id: Uuid,
    last_read: CachedScalar,
    pending_last_read: CachedScalar,
}

impl ReadWatermark {
    pub fn new(user_id: Uuid) -> Self {
        let keys = UserKeys::for_user(user_id);
        Self {
            user_id,
            last_read: CachedScalar::new(keys.last_read),
            pending_last_read: CachedScalar::new(keys.pending_last_read),
        }
    }

    /// Confirmed watermark; 0.0 (the epoch) when never set.
    pub fn last_read(&self, store: &dyn OrderedStore) -> Result<f64> {
        Ok(self.last_read.fetch(store)?.unwrap_or(0.0))
    }

    pub fn set_last_read(&self, store: &dyn OrderedStore, time: f64) -> Result<()> {
        self.last_read.write(store, time)?;
        debug!(user_id = %self.user_id, time, "last_read set");
        Ok(())
    }

    /// Tentative watermark set when a feed view is rendered; 0.0 when never set.
    pub fn pending_last_read(&self, store: &dyn OrderedStore) -> Result<f64> {
        Ok(self.pending_last_read.fetch(store)?.unwrap_or(0.0))
    }

    pub fn set_pending_last_read(&self, store: &dyn OrderedStore, time: f64) -> Result<()> {
        self.pending_last_read.write(store, time)?;
        debug!(user_id = %self.user_id, time, "pending_last_read set");
        Ok(())
    }

    /// Promotes the pending watermark to confirmed. Two round trips, no rollback: if the
    /// write fails the confirmed value stays where it was. Without a pending value this
    /// is a no-op. Returns the newly confirmed value, if any.
    pub fn confirm_last_read(&self, store: &dyn OrderedStore) -> Result<Option<f64>> {
        let Some(pending) = self.pending_last_read.fetch(store)? else {
            debug!(user_id = %self.user_id, "confirm_last_read: nothing pending");
            return Ok(None);
        };
        self.set_last_read(store, pending)?;
        Ok(Some(pending))
    }
}
