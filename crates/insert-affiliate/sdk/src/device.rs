//! Per-install device identity.
//!
//! The device id is created the first time anything needs it and is then
//! persisted for the life of the install. It is never regenerated.

use insert_affiliate_storage::PersistedState;
use insert_affiliate_types::DeviceId;
use tracing::debug;

/// Return the persisted device id, creating one if the state has none.
///
/// The flag is true when a new id was created and the state must be saved.
pub(crate) fn ensure_device_id(state: &mut PersistedState) -> (DeviceId, bool) {
    if let Some(existing) = &state.device_id {
        return (existing.clone(), false);
    }
    let id = DeviceId::generate();
    debug!(device_id = %id, "created device id");
    state.device_id = Some(id.clone());
    (id, true)
}
