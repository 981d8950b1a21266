//! Intents the user can submit and the outcomes that resolve them.

#[cfg(test)]
#[path = "intent_test.rs"]
mod tests;

use std::fmt;

use crate::protocol::{InboundKind, Outbound};
use crate::room::{DisplayName, RoomId};

/// A client-initiated request awaiting one server reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionIntent {
    CreateRoom { name: DisplayName },
    JoinRoom { room_id: RoomId, name: DisplayName },
    CheckRoomExistence { room_id: RoomId },
}

impl SessionIntent {
    #[must_use]
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::CreateRoom { .. } => IntentKind::CreateRoom,
            Self::JoinRoom { .. } => IntentKind::JoinRoom,
            Self::CheckRoomExistence { .. } => IntentKind::CheckRoomExistence,
        }
    }

    /// Room the intent targets; `None` for create, where the server assigns it.
    #[must_use]
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::CreateRoom { .. } => None,
            Self::JoinRoom { room_id, .. } | Self::CheckRoomExistence { room_id } => Some(room_id),
        }
    }

    /// Inbound event that answers this intent.
    #[must_use]
    pub fn reply_kind(&self) -> InboundKind {
        match self {
            Self::CreateRoom { .. } => InboundKind::Created,
            Self::JoinRoom { .. } => InboundKind::Joined,
            Self::CheckRoomExistence { .. } => InboundKind::RoomExists,
        }
    }

    /// Outbound message that starts this intent.
    #[must_use]
    pub fn request(&self) -> Outbound {
        match self {
            Self::CreateRoom { name } => Outbound::CreateRoom { name: name.clone() },
            Self::JoinRoom { room_id, name } => Outbound::JoinRoom { room_id: room_id.clone(), name: name.clone() },
            Self::CheckRoomExistence { room_id } => Outbound::CheckRoom { room_id: room_id.clone() },
        }
    }
}

/// Payload-free intent tag, for logs and state reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntentKind {
    CreateRoom,
    JoinRoom,
    CheckRoomExistence,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateRoom => "create_room",
            Self::JoinRoom => "join_room",
            Self::CheckRoomExistence => "check_room",
        })
    }
}

/// Terminal resolution of an intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The server created a room and assigned this id.
    CreatedAndAssigned(RoomId),
    /// The server confirmed membership of this room.
    JoinedConfirmed(RoomId),
    /// The room was not found. Carries the id shown to the user.
    JoinFailed(RoomId),
    /// Reply to an existence check.
    ExistenceConfirmed(bool),
    /// No reply arrived before the configured deadline.
    TimedOut(IntentKind),
}
