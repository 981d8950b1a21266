//! SketchSync room session coordination.
//!
//! SYSTEM CONTEXT
//! ==============
//! The room server is the single source of truth for room existence and room
//! id assignment. This crate is the client side of that conversation: it turns
//! create / join / check intents into named events on a [`MessageChannel`],
//! resolves the asynchronous replies, and hands the outcome to the host
//! application through [`SessionContext`], a [`Navigator`], and a
//! [`FailurePresenter`].
//!
//! Drawing synchronization, authentication, and reconnection live elsewhere.

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod effects;
pub mod intent;
pub mod protocol;
pub mod room;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{ChannelError, Handler, LocalChannel, MessageChannel, Subscription};
pub use config::{CoordinatorConfig, OverlapPolicy};
pub use coordinator::{CoordinatorError, CoordinatorState, Effects, IgnoreReason, RoomCoordinator, Submission};
pub use effects::{FailurePresenter, JoinFailureStrategy, Navigator, Screen};
pub use intent::{IntentKind, SessionIntent, SessionOutcome};
pub use protocol::{Inbound, InboundKind, Outbound, ProtocolError};
pub use room::{DisplayName, RoomId, Route};
pub use session::SessionContext;
