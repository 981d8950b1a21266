//! Room value types: identifiers, bounded display names, and routes.
//!
//! DESIGN
//! ======
//! Room ids are opaque; the only local check is non-emptiness. Display names
//! are bounded when they are built, so everything downstream (the session,
//! the wire) only ever sees an already-bounded value.

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum display name length, in UTF-16 code units.
pub const DISPLAY_NAME_MAX_UNITS: usize = 15;

// =============================================================================
// ROOM ID
// =============================================================================

/// Opaque room identifier, either typed by the user or assigned by the server.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Parse a room id. Returns `None` for the empty string.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// DISPLAY NAME
// =============================================================================

/// User display name, bounded to [`DISPLAY_NAME_MAX_UNITS`] UTF-16 code units.
///
/// The empty name is valid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    /// Build a name from raw input, keeping the longest prefix that fits.
    ///
    /// A character whose UTF-16 encoding would straddle the limit is dropped
    /// whole rather than split.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let mut units = 0;
        let mut end = 0;
        for (offset, ch) in raw.char_indices() {
            units += ch.len_utf16();
            if units > DISPLAY_NAME_MAX_UNITS {
                break;
            }
            end = offset + ch.len_utf8();
        }
        Self(raw[..end].to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in UTF-16 code units.
    #[must_use]
    pub fn utf16_len(&self) -> usize {
        self.0.encode_utf16().count()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ROUTE
// =============================================================================

/// Logical screen the navigator can move the user to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// The entry screen.
    Home,
    /// The room screen for a confirmed room.
    Room(RoomId),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("/"),
            Self::Room(room_id) => write!(f, "/{room_id}"),
        }
    }
}
