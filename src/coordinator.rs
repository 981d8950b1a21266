//! Room session coordinator: turns create / join / check intents into
//! outbound messages and resolves them from the server's replies.
//!
//! ARCHITECTURE
//! ============
//! One coordinator is scoped to one screen. It is a strict state machine:
//!
//! ```text
//! Idle ──submit──▶ AwaitingReply(intent) ──reply / deadline──▶ Idle
//!   │                                                         │
//!   └────────────────────── dispose ─────────▶ Disposed ◀─────┘
//! ```
//!
//! Entering `AwaitingReply` subscribes to the reply event *before* sending the
//! request. The reply handler owns nothing but a weak back-reference and the
//! generation number of the intent it was registered for; a reply for an older
//! generation, or one that arrives after disposal, is dropped.
//!
//! Resolution happens in two steps. Under the state borrow the pending intent
//! is taken out and the outcome recorded; after the borrow is released the
//! subscription is dropped and the side effects run. Effects may re-enter the
//! coordinator (a navigation that unmounts the screen disposes it), so no
//! borrow is ever held across a collaborator call.
//!
//! ERROR HANDLING
//! ==============
//! Server outcomes are never errors: they are delivered through the session
//! context, the navigator, and the failure presenter. Only local submission
//! failures are returned (busy under [`OverlapPolicy::Reject`], closed channel).

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::mem;
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::channel::{ChannelError, MessageChannel, Subscription};
use crate::config::{CoordinatorConfig, OverlapPolicy};
use crate::effects::{FailurePresenter, Navigator, Screen};
use crate::intent::{IntentKind, SessionIntent, SessionOutcome};
use crate::protocol::{Inbound, Outbound};
use crate::room::{DisplayName, RoomId, Route};
use crate::session::SessionContext;

// =============================================================================
// PUBLIC TYPES
// =============================================================================

/// Local submission failure. Server-side outcomes never use this type.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("a {outstanding} intent is still awaiting its reply")]
    IntentOutstanding { outstanding: IntentKind },
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Acknowledgement of a submitted intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// The request went out and the reply listener is registered.
    Sent,
    /// Waiting behind the outstanding intent.
    Queued,
    /// Nothing was sent and nothing was subscribed.
    Ignored(IgnoreReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyRoomId,
    /// The room on this screen was reported gone; no further joins are sent.
    RoomVanished,
    /// A resolved intent already moved the user off this screen.
    NavigatedAway,
    Disposed,
}

/// Observable coordinator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    AwaitingReply(IntentKind),
    Disposed,
}

/// Collaborators that receive the coordinator's outcomes.
#[derive(Clone)]
pub struct Effects {
    pub session: SessionContext,
    pub navigator: Rc<dyn Navigator>,
    pub presenter: Rc<dyn FailurePresenter>,
}

// =============================================================================
// STATE MACHINE
// =============================================================================

struct Pending {
    generation: u64,
    intent: SessionIntent,
    deadline: Option<Instant>,
    /// Held only for its drop, which unsubscribes the reply handler.
    _subscription: Subscription,
}

enum Phase {
    Idle,
    AwaitingReply(Pending),
    Disposed,
}

struct Machine {
    phase: Phase,
    queue: VecDeque<SessionIntent>,
    next_generation: u64,
    /// Set once the screen is done; later submissions are ignored with this reason.
    halted: Option<IgnoreReason>,
    last_outcome: Option<SessionOutcome>,
}

/// Side effect decided under the state borrow, applied after it is released.
enum Action {
    EnterRoom(RoomId),
    JoinRejected { typed: RoomId, echoed: Option<RoomId> },
    ReturnHome,
    Stay,
    TimedOut { kind: IntentKind, room_id: Option<RoomId> },
}

impl Action {
    fn navigates(&self, screen: Screen) -> bool {
        match self {
            Self::EnterRoom(_) | Self::ReturnHome => true,
            Self::JoinRejected { .. } => screen.join_failure_strategy().navigates(),
            Self::Stay | Self::TimedOut { .. } => false,
        }
    }
}

struct Inner {
    screen: Screen,
    channel: Rc<dyn MessageChannel>,
    effects: Effects,
    config: CoordinatorConfig,
    machine: RefCell<Machine>,
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Screen-scoped coordinator. Dropping it releases every subscription it holds.
pub struct RoomCoordinator {
    inner: Rc<Inner>,
}

impl RoomCoordinator {
    pub fn new(screen: Screen, channel: Rc<dyn MessageChannel>, effects: Effects, config: CoordinatorConfig) -> Self {
        debug!(?screen, "coordinator: created");
        Self {
            inner: Rc::new(Inner {
                screen,
                channel,
                effects,
                config,
                machine: RefCell::new(Machine {
                    phase: Phase::Idle,
                    queue: VecDeque::new(),
                    next_generation: 0,
                    halted: None,
                    last_outcome: None,
                }),
            }),
        }
    }

    /// Run the screen's on-enter behavior.
    ///
    /// The entry screen leaves any previous session; the join screen checks
    /// that the room in `route_param` still exists.
    ///
    /// # Errors
    ///
    /// Propagates submission failures from the underlying operation.
    pub fn enter(&self, route_param: Option<&str>) -> Result<Submission, CoordinatorError> {
        match self.inner.screen {
            Screen::Entry => self.leave_current_session().map(|()| Submission::Sent),
            Screen::Join => self.request_room_existence_check(route_param.unwrap_or_default()),
        }
    }

    /// Ask the server for a new room. On `created`, the assigned id is written
    /// to the session and the user is navigated into the room.
    ///
    /// # Errors
    ///
    /// See [`CoordinatorError`].
    pub fn request_create_room(&self, name: DisplayName) -> Result<Submission, CoordinatorError> {
        self.inner.submit(SessionIntent::CreateRoom { name })
    }

    /// Ask to join `room_id`. An empty id is ignored without any network action.
    ///
    /// # Errors
    ///
    /// See [`CoordinatorError`].
    pub fn request_join_room(&self, room_id: &str, name: DisplayName) -> Result<Submission, CoordinatorError> {
        let Some(room_id) = RoomId::parse(room_id) else {
            debug!("coordinator: join with empty room id ignored");
            return Ok(Submission::Ignored(IgnoreReason::EmptyRoomId));
        };
        self.inner.submit(SessionIntent::JoinRoom { room_id, name })
    }

    /// Ask whether `room_id` exists. An empty id is ignored without any network action.
    ///
    /// # Errors
    ///
    /// See [`CoordinatorError`].
    pub fn request_room_existence_check(&self, room_id: &str) -> Result<Submission, CoordinatorError> {
        let Some(room_id) = RoomId::parse(room_id) else {
            debug!("coordinator: existence check with empty room id ignored");
            return Ok(Submission::Ignored(IgnoreReason::EmptyRoomId));
        };
        self.inner.submit(SessionIntent::CheckRoomExistence { room_id })
    }

    /// Send `leave_room` and clear the session slot.
    ///
    /// Every call sends; clearing is idempotent. The slot is cleared even when
    /// the send fails. An outstanding intent and anything queued behind it are
    /// cancelled first, so a late reply cannot write the slot again.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Channel`] if the channel is closed.
    pub fn leave_current_session(&self) -> Result<(), CoordinatorError> {
        let (cancelled, queue) = {
            let mut machine = self.inner.machine.borrow_mut();
            let awaiting = match &machine.phase {
                Phase::Disposed => {
                    debug!("coordinator: leave after dispose ignored");
                    return Ok(());
                }
                Phase::Idle => false,
                Phase::AwaitingReply(_) => true,
            };
            let cancelled = awaiting.then(|| mem::replace(&mut machine.phase, Phase::Idle));
            (cancelled, mem::take(&mut machine.queue))
        };
        if let Some(Phase::AwaitingReply(pending)) = &cancelled {
            info!(cancelled = %pending.intent.kind(), queued = queue.len(), "coordinator: leaving cancels outstanding intent");
        }
        drop(cancelled);
        drop(queue);

        let sent = self.inner.channel.send(Outbound::LeaveRoom);
        let cleared = self.inner.effects.session.clear();
        info!(screen = ?self.inner.screen, cleared, "coordinator: left session");
        sent.map_err(CoordinatorError::from)
    }

    /// Resolve the outstanding intent as timed out if its deadline has passed.
    /// Returns whether a timeout fired.
    pub fn check_deadline(&self, now: Instant) -> bool {
        self.inner.expire(now)
    }

    /// Deadline of the outstanding intent, if a reply timeout is configured.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        match &self.inner.machine.borrow().phase {
            Phase::AwaitingReply(pending) => pending.deadline,
            Phase::Idle | Phase::Disposed => None,
        }
    }

    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        match &self.inner.machine.borrow().phase {
            Phase::Idle => CoordinatorState::Idle,
            Phase::AwaitingReply(pending) => CoordinatorState::AwaitingReply(pending.intent.kind()),
            Phase::Disposed => CoordinatorState::Disposed,
        }
    }

    /// True when idle with nothing queued.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        let machine = self.inner.machine.borrow();
        !matches!(machine.phase, Phase::AwaitingReply(_)) && machine.queue.is_empty()
    }

    #[must_use]
    pub fn last_outcome(&self) -> Option<SessionOutcome> {
        self.inner.machine.borrow().last_outcome.clone()
    }

    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.machine.borrow().queue.len()
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.inner.screen
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.inner.effects.session
    }

    /// Release every subscription and drop queued intents. Idempotent.
    pub fn dispose(&self) {
        let (previous, queue) = {
            let mut machine = self.inner.machine.borrow_mut();
            let previous = mem::replace(&mut machine.phase, Phase::Disposed);
            (previous, mem::take(&mut machine.queue))
        };
        match &previous {
            Phase::AwaitingReply(pending) => {
                info!(intent = %pending.intent.kind(), queued = queue.len(), "coordinator: disposed while awaiting reply");
            }
            Phase::Idle => debug!(screen = ?self.inner.screen, "coordinator: disposed"),
            Phase::Disposed => {}
        }
        drop(previous);
        drop(queue);
    }
}

impl Drop for RoomCoordinator {
    fn drop(&mut self) {
        self.dispose();
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================

impl Inner {
    fn submit(self: &Rc<Self>, intent: SessionIntent) -> Result<Submission, CoordinatorError> {
        let displaced = {
            let mut machine = self.machine.borrow_mut();
            let outstanding = match &machine.phase {
                Phase::Disposed => return Ok(Submission::Ignored(IgnoreReason::Disposed)),
                Phase::Idle => None,
                Phase::AwaitingReply(pending) => Some(pending.intent.kind()),
            };
            if let Some(reason) = machine.halted {
                debug!(intent = %intent.kind(), ?reason, "coordinator: screen halted, intent ignored");
                return Ok(Submission::Ignored(reason));
            }

            match (outstanding, self.config.overlap) {
                (None, _) => None,
                (Some(outstanding), OverlapPolicy::Reject) => {
                    return Err(CoordinatorError::IntentOutstanding { outstanding });
                }
                (Some(outstanding), OverlapPolicy::Queue) => {
                    info!(intent = %intent.kind(), %outstanding, "coordinator: intent queued");
                    machine.queue.push_back(intent);
                    return Ok(Submission::Queued);
                }
                (Some(_), OverlapPolicy::CancelPrevious) => Some(mem::replace(&mut machine.phase, Phase::Idle)),
            }
        };

        if let Some(Phase::AwaitingReply(pending)) = displaced {
            info!(cancelled = %pending.intent.kind(), intent = %intent.kind(), "coordinator: previous intent cancelled");
            drop(pending);
        }

        self.begin(intent)
    }

    /// Subscribe for the reply, enter `AwaitingReply`, then send the request.
    fn begin(self: &Rc<Self>, intent: SessionIntent) -> Result<Submission, CoordinatorError> {
        let generation = {
            let mut machine = self.machine.borrow_mut();
            let generation = machine.next_generation;
            machine.next_generation += 1;
            generation
        };

        let weak = Rc::downgrade(self);
        let subscription = self.channel.subscribe(
            intent.reply_kind(),
            Box::new(move |message: &Inbound| {
                if let Some(inner) = weak.upgrade() {
                    inner.resolve(generation, message);
                }
            }),
        );

        let kind = intent.kind();
        let request = intent.request();
        let deadline = self.config.reply_timeout.map(|timeout| Instant::now() + timeout);
        self.machine.borrow_mut().phase =
            Phase::AwaitingReply(Pending { generation, intent, deadline, _subscription: subscription });
        info!(intent = %kind, generation, "coordinator: awaiting reply");

        if let Err(e) = self.channel.send(request) {
            warn!(intent = %kind, error = %e, "coordinator: send failed, abandoning intent");
            let (abandoned, dropped) = {
                let mut machine = self.machine.borrow_mut();
                let abandoned = match &machine.phase {
                    Phase::AwaitingReply(pending) if pending.generation == generation => {
                        Some(mem::replace(&mut machine.phase, Phase::Idle))
                    }
                    _ => None,
                };
                (abandoned, mem::take(&mut machine.queue))
            };
            if !dropped.is_empty() {
                warn!(count = dropped.len(), "coordinator: discarded queued intents");
            }
            drop(abandoned);
            return Err(e.into());
        }

        Ok(Submission::Sent)
    }

    fn resolve(self: &Rc<Self>, generation: u64, message: &Inbound) {
        let (pending, action) = {
            let mut machine = self.machine.borrow_mut();
            let decision = match &machine.phase {
                Phase::AwaitingReply(pending) if pending.generation == generation => {
                    self.decide(&pending.intent, message)
                }
                _ => None,
            };
            let Some((outcome, action)) = decision else {
                debug!(event = %message.kind(), generation, "coordinator: dropping stale reply");
                return;
            };
            let Phase::AwaitingReply(pending) = mem::replace(&mut machine.phase, Phase::Idle) else {
                return;
            };
            info!(intent = %pending.intent.kind(), ?outcome, "coordinator: intent resolved");

            let halt = if outcome == SessionOutcome::ExistenceConfirmed(false) && self.screen == Screen::Join {
                Some(IgnoreReason::RoomVanished)
            } else if action.navigates(self.screen) {
                Some(IgnoreReason::NavigatedAway)
            } else {
                None
            };
            if let Some(reason) = halt {
                machine.halted = Some(reason);
                let dropped = mem::take(&mut machine.queue);
                if !dropped.is_empty() {
                    info!(count = dropped.len(), ?reason, "coordinator: queued intents dropped");
                }
            }
            machine.last_outcome = Some(outcome);
            (pending, action)
        };

        drop(pending);
        self.apply(action);
        self.start_next();
    }

    /// Outcome and follow-up for a reply, or `None` if it does not answer `intent`.
    fn decide(&self, intent: &SessionIntent, message: &Inbound) -> Option<(SessionOutcome, Action)> {
        match (intent, message) {
            (SessionIntent::CreateRoom { .. }, Inbound::Created { room_id }) => {
                Some((SessionOutcome::CreatedAndAssigned(room_id.clone()), Action::EnterRoom(room_id.clone())))
            }
            (SessionIntent::JoinRoom { .. }, Inbound::Joined { room_id: Some(room_id), failed: false }) => {
                Some((SessionOutcome::JoinedConfirmed(room_id.clone()), Action::EnterRoom(room_id.clone())))
            }
            (SessionIntent::JoinRoom { room_id: typed, .. }, Inbound::Joined { room_id: echoed, failed: true }) => {
                let shown = self.screen.join_failure_strategy().presented_id(typed, echoed.as_ref());
                Some((
                    SessionOutcome::JoinFailed(shown.clone()),
                    Action::JoinRejected { typed: typed.clone(), echoed: echoed.clone() },
                ))
            }
            (SessionIntent::CheckRoomExistence { .. }, Inbound::RoomExists { exists }) => {
                let action = if *exists { Action::Stay } else { Action::ReturnHome };
                Some((SessionOutcome::ExistenceConfirmed(*exists), action))
            }
            _ => None,
        }
    }

    fn apply(&self, action: Action) {
        let Effects { session, navigator, presenter } = &self.effects;
        match action {
            Action::EnterRoom(room_id) => {
                session.assign(room_id.clone());
                navigator.navigate(Route::Room(room_id));
            }
            Action::JoinRejected { typed, echoed } => {
                let strategy = self.screen.join_failure_strategy();
                warn!(typed = %typed, ?echoed, ?strategy, "coordinator: room not found");
                strategy.apply(&**navigator, &**presenter, &typed, echoed.as_ref());
            }
            Action::ReturnHome => {
                info!(screen = ?self.screen, "coordinator: room does not exist, returning home");
                navigator.navigate(Route::Home);
            }
            Action::Stay => {}
            Action::TimedOut { kind, room_id } => presenter.reply_timed_out(kind, room_id.as_ref()),
        }
    }

    fn expire(self: &Rc<Self>, now: Instant) -> bool {
        let (pending, action) = {
            let mut machine = self.machine.borrow_mut();
            let overdue = matches!(
                &machine.phase,
                Phase::AwaitingReply(pending) if pending.deadline.is_some_and(|deadline| now >= deadline)
            );
            if !overdue {
                return false;
            }
            let Phase::AwaitingReply(pending) = mem::replace(&mut machine.phase, Phase::Idle) else {
                return false;
            };
            let kind = pending.intent.kind();
            warn!(intent = %kind, generation = pending.generation, "coordinator: reply timed out");
            machine.last_outcome = Some(SessionOutcome::TimedOut(kind));
            let action = Action::TimedOut { kind, room_id: pending.intent.room_id().cloned() };
            (pending, action)
        };

        drop(pending);
        self.apply(action);
        self.start_next();
        true
    }

    fn start_next(self: &Rc<Self>) {
        let next = {
            let mut machine = self.machine.borrow_mut();
            if !matches!(machine.phase, Phase::Idle) {
                return;
            }
            machine.queue.pop_front()
        };
        let Some(intent) = next else {
            return;
        };
        debug!(intent = %intent.kind(), "coordinator: starting queued intent");
        if let Err(e) = self.begin(intent) {
            warn!(error = %e, "coordinator: queued intent failed to start");
        }
    }
}
