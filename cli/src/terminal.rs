//! Terminal stand-ins for the navigator and the failure presenter.
//!
//! Navigation is printed to stdout and remembered so the driver knows the
//! screen has been left. Failure notices go to stderr.

use std::cell::RefCell;

use sketchsync::{FailurePresenter, IntentKind, Navigator, RoomId, Route};

#[derive(Default)]
pub struct Terminal {
    routes: RefCell<Vec<Route>>,
    notices: RefCell<Vec<String>>,
}

impl Terminal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once any navigation has happened.
    #[must_use]
    pub fn navigated(&self) -> bool {
        !self.routes.borrow().is_empty()
    }

    #[must_use]
    pub fn last_route(&self) -> Option<Route> {
        self.routes.borrow().last().cloned()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        self.notices.borrow().clone()
    }
}

impl Navigator for Terminal {
    fn navigate(&self, route: Route) {
        println!("navigate {route}");
        self.routes.borrow_mut().push(route);
    }
}

impl FailurePresenter for Terminal {
    fn room_not_found(&self, room_id: &RoomId) {
        let notice = format!("room not found: {room_id}");
        eprintln!("{notice}");
        self.notices.borrow_mut().push(notice);
    }

    fn reply_timed_out(&self, intent: IntentKind, room_id: Option<&RoomId>) {
        let notice = match room_id {
            Some(room_id) => format!("no reply to {intent} for room {room_id}"),
            None => format!("no reply to {intent}"),
        };
        eprintln!("{notice}");
        self.notices.borrow_mut().push(notice);
    }
}
