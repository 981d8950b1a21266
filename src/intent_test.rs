use super::*;

fn room(raw: &str) -> RoomId {
    RoomId::parse(raw).expect("non-empty room id")
}

#[test]
fn create_intent_replies_with_created() {
    let intent = SessionIntent::CreateRoom { name: DisplayName::new("Alex") };
    assert_eq!(intent.kind(), IntentKind::CreateRoom);
    assert_eq!(intent.reply_kind(), InboundKind::Created);
    assert!(intent.room_id().is_none());
    assert_eq!(intent.request(), Outbound::CreateRoom { name: DisplayName::new("Alex") });
}

#[test]
fn join_intent_replies_with_joined() {
    let intent = SessionIntent::JoinRoom { room_id: room("abc-123"), name: DisplayName::new("Sam") };
    assert_eq!(intent.kind(), IntentKind::JoinRoom);
    assert_eq!(intent.reply_kind(), InboundKind::Joined);
    assert_eq!(intent.room_id(), Some(&room("abc-123")));
    assert_eq!(
        intent.request(),
        Outbound::JoinRoom { room_id: room("abc-123"), name: DisplayName::new("Sam") }
    );
}

#[test]
fn check_intent_replies_with_room_exists() {
    let intent = SessionIntent::CheckRoomExistence { room_id: room("abc-123") };
    assert_eq!(intent.kind(), IntentKind::CheckRoomExistence);
    assert_eq!(intent.reply_kind(), InboundKind::RoomExists);
    assert_eq!(intent.request(), Outbound::CheckRoom { room_id: room("abc-123") });
}

#[test]
fn intent_kind_display_matches_request_event() {
    for intent in [
        SessionIntent::CreateRoom { name: DisplayName::default() },
        SessionIntent::JoinRoom { room_id: room("r"), name: DisplayName::default() },
        SessionIntent::CheckRoomExistence { room_id: room("r") },
    ] {
        assert_eq!(intent.kind().to_string(), intent.request().event_name());
    }
}
