//! Recording fakes shared by unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::effects::{FailurePresenter, Navigator};
use crate::intent::IntentKind;
use crate::room::{RoomId, Route};

/// One observed side effect, in the order it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Navigate(Route),
    NotFound(RoomId),
    TimedOut(IntentKind, Option<RoomId>),
}

/// Navigator and presenter that append every call to a shared log.
#[derive(Clone, Default)]
pub struct EffectLog {
    effects: Rc<RefCell<Vec<Effect>>>,
}

impl EffectLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.borrow().clone()
    }

    #[must_use]
    pub fn navigations(&self) -> Vec<Route> {
        self.effects
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Effect::Navigate(route) => Some(route.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.borrow().is_empty()
    }
}

impl Navigator for EffectLog {
    fn navigate(&self, route: Route) {
        self.effects.borrow_mut().push(Effect::Navigate(route));
    }
}

impl FailurePresenter for EffectLog {
    fn room_not_found(&self, room_id: &RoomId) {
        self.effects.borrow_mut().push(Effect::NotFound(room_id.clone()));
    }

    fn reply_timed_out(&self, intent: IntentKind, room_id: Option<&RoomId>) {
        self.effects
            .borrow_mut()
            .push(Effect::TimedOut(intent, room_id.cloned()));
    }
}
