//! Session context: the single slot holding the confirmed room id.
//!
//! Readers hold a cloned handle and call [`SessionContext::current`]. Only the
//! coordinator writes, which is enforced by keeping the writers crate-private.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::room::RoomId;

/// Shared handle to the current room id. Clones observe the same slot.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    slot: Rc<RefCell<Option<RoomId>>>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmed room id, if any.
    #[must_use]
    pub fn current(&self) -> Option<RoomId> {
        self.slot.borrow().clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.borrow().is_none()
    }

    pub(crate) fn assign(&self, room_id: RoomId) {
        debug!(room_id = %room_id, "session: assign room");
        *self.slot.borrow_mut() = Some(room_id);
    }

    /// Clear the slot. Returns whether a room id was actually removed.
    pub(crate) fn clear(&self) -> bool {
        let previous = self.slot.borrow_mut().take();
        if let Some(room_id) = &previous {
            debug!(room_id = %room_id, "session: cleared room");
        }
        previous.is_some()
    }
}
