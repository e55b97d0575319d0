use std::sync::Mutex;

use crate::store::Store;

/// Shared across handlers; the mutex serializes store writes.
pub(crate) struct ServerState {
    pub(crate) store: Mutex<Store>,
}
