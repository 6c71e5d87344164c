//! Fixed-size client table, protected by a reader-writer lock because
//! render workers traverse it continuously while connect/disconnect events
//! are rare (spec §3, `ClientRegistry`). No direct access from outside this
//! module — everything goes through `try_insert` / `remove` / `snapshot`
//! (spec §9: "a process-level registry is acceptable but must be
//! encapsulated behind the reader-writer lock").

use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::Client;
use crate::error::ConnectionError;

pub struct ClientRegistry {
    slots: RwLock<Vec<Option<Arc<Client>>>>,
    max_clients: usize,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            slots: RwLock::new((0..max_clients).map(|_| None).collect()),
            max_clients,
        }
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Find an empty slot and occupy it under the write lock. Returns the
    /// slot index, or an error if every slot is taken (spec §4.8: the
    /// listener rejects the handshake in that case).
    pub fn try_insert(&self, client: Arc<Client>) -> Result<usize, ConnectionError> {
        let mut slots = self.slots.write();
        if let Some(idx) = slots.iter().position(|s| s.is_none()) {
            slots[idx] = Some(client);
            Ok(idx)
        } else {
            Err(ConnectionError::RegistryFull(self.max_clients))
        }
    }

    /// Mark a slot empty. The caller is responsible for joining the
    /// client's tasks and tearing down its buffers *outside* this lock
    /// (spec §4.8, §5 step 3-4).
    pub fn remove(&self, slot: usize) -> Option<Arc<Client>> {
        let mut slots = self.slots.write();
        slots.get_mut(slot).and_then(|s| s.take())
    }

    /// A read-locked traversal that immediately clones the `Arc`s out and
    /// releases the lock before returning, so callers never hold the
    /// registry lock across compositing or I/O (spec §4.6 step 5, §5 lock
    /// ordering rule 1).
    pub fn snapshot(&self) -> Vec<Arc<Client>> {
        self.slots.read().iter().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.read().iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
