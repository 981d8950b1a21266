//! Typed event contract between the coordinator and the room server.
//!
//! DESIGN
//! ======
//! Every message is a fire-and-forget named event with positional args.
//! There is no correlation token: a reply is matched to its request purely
//! by event name, so the coordinator subscribes to the reply name before it
//! sends the request.
//!
//! | Outbound      | Args              | Reply         |
//! |---------------|-------------------|---------------|
//! | `create_room` | name              | `created`     |
//! | `join_room`   | room id, name     | `joined`      |
//! | `check_room`  | room id           | `room_exists` |
//! | `leave_room`  | none              | none          |

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;

use std::fmt;

use frames::Frame;
use serde_json::Value;

use crate::room::{DisplayName, RoomId};

pub const EVENT_CREATE_ROOM: &str = "create_room";
pub const EVENT_JOIN_ROOM: &str = "join_room";
pub const EVENT_CHECK_ROOM: &str = "check_room";
pub const EVENT_LEAVE_ROOM: &str = "leave_room";

pub const EVENT_CREATED: &str = "created";
pub const EVENT_JOINED: &str = "joined";
pub const EVENT_ROOM_EXISTS: &str = "room_exists";

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned when an inbound frame does not match the event contract.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown inbound event `{0}`")]
    UnknownEvent(String),
    #[error("`{event}` is missing a room id argument")]
    MissingRoomId { event: &'static str },
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Client → server messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    CreateRoom { name: DisplayName },
    JoinRoom { room_id: RoomId, name: DisplayName },
    CheckRoom { room_id: RoomId },
    LeaveRoom,
}

impl Outbound {
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => EVENT_CREATE_ROOM,
            Self::JoinRoom { .. } => EVENT_JOIN_ROOM,
            Self::CheckRoom { .. } => EVENT_CHECK_ROOM,
            Self::LeaveRoom => EVENT_LEAVE_ROOM,
        }
    }

    /// Positional wire arguments in contract order.
    #[must_use]
    pub fn args(&self) -> Vec<Value> {
        match self {
            Self::CreateRoom { name } => vec![Value::String(name.as_str().to_owned())],
            Self::JoinRoom { room_id, name } => vec![
                Value::String(room_id.as_str().to_owned()),
                Value::String(name.as_str().to_owned()),
            ],
            Self::CheckRoom { room_id } => vec![Value::String(room_id.as_str().to_owned())],
            Self::LeaveRoom => Vec::new(),
        }
    }

    #[must_use]
    pub fn to_frame(&self) -> Frame {
        Frame::new(self.event_name(), self.args())
    }
}

// =============================================================================
// INBOUND
// =============================================================================

/// Subscription key for inbound events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InboundKind {
    Created,
    Joined,
    RoomExists,
}

impl InboundKind {
    #[must_use]
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Created => EVENT_CREATED,
            Self::Joined => EVENT_JOINED,
            Self::RoomExists => EVENT_ROOM_EXISTS,
        }
    }
}

impl fmt::Display for InboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// Server → client messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Reply to `create_room`. Always a success.
    Created { room_id: RoomId },
    /// Reply to `join_room`. `failed` marks a room that was not found; a
    /// failure may arrive without an echoed id.
    Joined { room_id: Option<RoomId>, failed: bool },
    /// Reply to `check_room`.
    RoomExists { exists: bool },
}

impl Inbound {
    #[must_use]
    pub fn kind(&self) -> InboundKind {
        match self {
            Self::Created { .. } => InboundKind::Created,
            Self::Joined { .. } => InboundKind::Joined,
            Self::RoomExists { .. } => InboundKind::RoomExists,
        }
    }

    /// Parse an inbound frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownEvent`] for events outside the contract
    /// and [`ProtocolError::MissingRoomId`] when a success reply has no room id.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        match frame.event.as_str() {
            EVENT_CREATED => Ok(Self::Created { room_id: room_id_arg(frame, EVENT_CREATED)? }),
            EVENT_JOINED => {
                let failed = frame.arg(1).is_some_and(is_truthy);
                let room_id = if failed { optional_room_id(frame) } else { Some(room_id_arg(frame, EVENT_JOINED)?) };
                Ok(Self::Joined { room_id, failed })
            }
            EVENT_ROOM_EXISTS => Ok(Self::RoomExists { exists: frame.arg(0).is_some_and(is_truthy) }),
            other => Err(ProtocolError::UnknownEvent(other.to_owned())),
        }
    }

    /// Build the wire frame the server would send for this event.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let args = match self {
            Self::Created { room_id } => vec![Value::String(room_id.as_str().to_owned())],
            Self::Joined { room_id, failed } => {
                let echoed = room_id.as_ref().map_or(Value::Null, |id| Value::String(id.as_str().to_owned()));
                vec![echoed, Value::Bool(*failed)]
            }
            Self::RoomExists { exists } => vec![Value::Bool(*exists)],
        };
        Frame::new(self.kind().event_name(), args)
    }
}

fn room_id_arg(frame: &Frame, event: &'static str) -> Result<RoomId, ProtocolError> {
    optional_room_id(frame).ok_or(ProtocolError::MissingRoomId { event })
}

fn optional_room_id(frame: &Frame) -> Option<RoomId> {
    frame.arg(0).and_then(Value::as_str).and_then(RoomId::parse)
}

/// Loose truthiness for flag args: null, false, zero, and "" are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
