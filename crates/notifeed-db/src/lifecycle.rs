use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::keys::UserKeys;
use crate::store::OrderedStore;

/// Removes every key a user's feed owns. Run when the user is permanently deleted.
/// Safe to call again; missing keys are skipped.
pub fn purge_user(store: &dyn OrderedStore, user_id: Uuid) -> Result<()> {
    let keys = UserKeys::for_user(user_id);
    let mut removed = 0;
    for key in keys.all() {
        if store.delete(key)? {
            removed += 1;
        }
    }
    info!(%user_id, removed, "purged notification keys");
    Ok(())
}
