//! Outward side effects the coordinator triggers but does not own.
//!
//! SYSTEM CONTEXT
//! ==============
//! A coordinator resolves intents into three kinds of effect: writing the
//! session slot, moving the user to another screen, and presenting a failure
//! notice. The last two are traits implemented by the host application.
//!
//! The order of effects on a failed join depends on the screen that sent the
//! request, so it is modelled as [`JoinFailureStrategy`] rather than inline
//! branching.

#[cfg(test)]
#[path = "effects_test.rs"]
mod tests;

use crate::intent::IntentKind;
use crate::room::{RoomId, Route};

/// Moves the user to a logical screen.
pub trait Navigator {
    fn navigate(&self, route: Route);
}

/// Displays dismissible failure notices.
pub trait FailurePresenter {
    /// The room could not be resolved.
    fn room_not_found(&self, room_id: &RoomId);

    /// No reply arrived before the configured deadline.
    fn reply_timed_out(&self, intent: IntentKind, room_id: Option<&RoomId>) {
        let _ = (intent, room_id);
    }
}

/// Effects applied when the server rejects a join.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinFailureStrategy {
    /// Stay on the current screen; present the id the user typed.
    PresentInPlace,
    /// Navigate home first, then present the id the server echoed, or the
    /// typed id when the reply carried none.
    ReturnHomeThenPresent,
}

impl JoinFailureStrategy {
    /// Id presented to the user for this strategy.
    #[must_use]
    pub fn presented_id<'a>(self, typed: &'a RoomId, echoed: Option<&'a RoomId>) -> &'a RoomId {
        match self {
            Self::PresentInPlace => typed,
            Self::ReturnHomeThenPresent => echoed.unwrap_or(typed),
        }
    }

    /// True when the strategy moves the user off the current screen.
    #[must_use]
    pub fn navigates(self) -> bool {
        matches!(self, Self::ReturnHomeThenPresent)
    }

    pub fn apply(
        self,
        navigator: &dyn Navigator,
        presenter: &dyn FailurePresenter,
        typed: &RoomId,
        echoed: Option<&RoomId>,
    ) {
        if self.navigates() {
            navigator.navigate(Route::Home);
        }
        presenter.room_not_found(self.presented_id(typed, echoed));
    }
}

/// Screen a coordinator is scoped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Home screen: create a room or join one by typed id.
    Entry,
    /// Room route visited before joining: checks existence, then joins.
    Join,
}

impl Screen {
    #[must_use]
    pub fn join_failure_strategy(self) -> JoinFailureStrategy {
        match self {
            Self::Entry => JoinFailureStrategy::PresentInPlace,
            Self::Join => JoinFailureStrategy::ReturnHomeThenPresent,
        }
    }
}
