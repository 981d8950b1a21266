use super::*;
use crate::room::{DisplayName, RoomId};

use std::cell::Cell;

fn room(raw: &str) -> RoomId {
    RoomId::parse(raw).expect("non-empty room id")
}

fn counter_handler(count: &Rc<Cell<usize>>) -> Handler {
    let count = Rc::clone(count);
    Box::new(move |_| count.set(count.get() + 1))
}

// =============================================================
// Subscription
// =============================================================

#[test]
fn subscription_release_runs_once() {
    let runs = Rc::new(Cell::new(0));
    let counted = Rc::clone(&runs);
    let sub = Subscription::new(InboundKind::Created, move || counted.set(counted.get() + 1));
    assert!(sub.is_active());
    sub.cancel();
    assert_eq!(runs.get(), 1);
}

#[test]
fn subscription_drop_releases() {
    let runs = Rc::new(Cell::new(0));
    {
        let counted = Rc::clone(&runs);
        let _sub = Subscription::new(InboundKind::Joined, move || counted.set(counted.get() + 1));
    }
    assert_eq!(runs.get(), 1);
}

#[test]
fn detached_subscription_is_inactive() {
    let sub = Subscription::detached(InboundKind::RoomExists);
    assert!(!sub.is_active());
    assert_eq!(sub.kind(), InboundKind::RoomExists);
}

// =============================================================
// LocalChannel: outbound
// =============================================================

#[test]
fn send_queues_in_order() {
    let channel = LocalChannel::new();
    channel.send(Outbound::LeaveRoom).expect("send");
    channel
        .send(Outbound::CheckRoom { room_id: room("abc") })
        .expect("send");
    assert!(channel.has_outbound());

    let drained = channel.drain_outbox();
    assert_eq!(drained, vec![Outbound::LeaveRoom, Outbound::CheckRoom { room_id: room("abc") }]);
    assert!(!channel.has_outbound());
}

#[test]
fn send_after_close_fails() {
    let channel = LocalChannel::new();
    channel.close();
    assert!(channel.is_closed());
    let err = channel
        .send(Outbound::CreateRoom { name: DisplayName::new("Alex") })
        .expect_err("closed");
    assert!(matches!(err, ChannelError::Closed));
    assert!(channel.drain_outbox().is_empty());
}

#[test]
fn clones_share_outbox() {
    let channel = LocalChannel::new();
    let other = channel.clone();
    other.send(Outbound::LeaveRoom).expect("send");
    assert_eq!(channel.drain_outbox(), vec![Outbound::LeaveRoom]);
}

// =============================================================
// LocalChannel: inbound
// =============================================================

#[test]
fn deliver_reaches_matching_kind_only() {
    let channel = LocalChannel::new();
    let created = Rc::new(Cell::new(0));
    let joined = Rc::new(Cell::new(0));
    let _a = channel.subscribe(InboundKind::Created, counter_handler(&created));
    let _b = channel.subscribe(InboundKind::Joined, counter_handler(&joined));

    let ran = channel.deliver(&Inbound::Created { room_id: room("r") });
    assert_eq!(ran, 1);
    assert_eq!(created.get(), 1);
    assert_eq!(joined.get(), 0);
}

#[test]
fn deliver_without_subscribers_is_dropped() {
    let channel = LocalChannel::new();
    assert_eq!(channel.deliver(&Inbound::RoomExists { exists: true }), 0);
}

#[test]
fn dropped_subscription_no_longer_fires() {
    let channel = LocalChannel::new();
    let count = Rc::new(Cell::new(0));
    let sub = channel.subscribe(InboundKind::Created, counter_handler(&count));
    assert_eq!(channel.subscriber_count(InboundKind::Created), 1);
    drop(sub);
    assert_eq!(channel.subscriber_count(InboundKind::Created), 0);

    channel.deliver(&Inbound::Created { room_id: room("r") });
    assert_eq!(count.get(), 0);
}

#[test]
fn handlers_run_in_registration_order() {
    let channel = LocalChannel::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::clone(&order);
    let second = Rc::clone(&order);
    let _a = channel.subscribe(InboundKind::Joined, Box::new(move |_| first.borrow_mut().push(1)));
    let _b = channel.subscribe(InboundKind::Joined, Box::new(move |_| second.borrow_mut().push(2)));

    channel.deliver(&Inbound::Joined { room_id: Some(room("r")), failed: false });
    assert_eq!(*order.borrow(), vec![1, 2]);
}

#[test]
fn handler_may_drop_its_own_subscription() {
    let channel = LocalChannel::new();
    let count = Rc::new(Cell::new(0));
    let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

    let inner_slot = Rc::clone(&slot);
    let inner_count = Rc::clone(&count);
    let sub = channel.subscribe(
        InboundKind::Created,
        Box::new(move |_| {
            inner_count.set(inner_count.get() + 1);
            inner_slot.borrow_mut().take();
        }),
    );
    *slot.borrow_mut() = Some(sub);

    channel.deliver(&Inbound::Created { room_id: room("r") });
    channel.deliver(&Inbound::Created { room_id: room("r") });
    assert_eq!(count.get(), 1);
    assert_eq!(channel.subscriber_count(InboundKind::Created), 0);
}

#[test]
fn handler_removed_mid_dispatch_does_not_fire() {
    let channel = LocalChannel::new();
    let second_count = Rc::new(Cell::new(0));
    let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

    let killer_slot = Rc::clone(&victim);
    let _killer = channel.subscribe(
        InboundKind::RoomExists,
        Box::new(move |_| {
            killer_slot.borrow_mut().take();
        }),
    );
    let sub = channel.subscribe(InboundKind::RoomExists, counter_handler(&second_count));
    *victim.borrow_mut() = Some(sub);

    let ran = channel.deliver(&Inbound::RoomExists { exists: false });
    assert_eq!(ran, 1);
    assert_eq!(second_count.get(), 0);
}

#[test]
fn unsubscribe_after_channel_dropped_is_noop() {
    let channel = LocalChannel::new();
    let sub = channel.subscribe(InboundKind::Created, Box::new(|_| {}));
    drop(channel);
    sub.cancel();
}
