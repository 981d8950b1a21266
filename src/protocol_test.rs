use super::*;
use serde_json::json;

fn room(raw: &str) -> RoomId {
    RoomId::parse(raw).expect("non-empty room id")
}

fn frame(event: &str, args: Vec<Value>) -> Frame {
    Frame::new(event, args)
}

// =============================================================
// Outbound
// =============================================================

#[test]
fn create_room_frame_carries_name() {
    let out = Outbound::CreateRoom { name: DisplayName::new("Alex") };
    let f = out.to_frame();
    assert_eq!(f.event, "create_room");
    assert_eq!(f.args, vec![json!("Alex")]);
}

#[test]
fn join_room_frame_carries_room_then_name() {
    let out = Outbound::JoinRoom { room_id: room("abc-123"), name: DisplayName::new("Sam") };
    let f = out.to_frame();
    assert_eq!(f.event, "join_room");
    assert_eq!(f.args, vec![json!("abc-123"), json!("Sam")]);
}

#[test]
fn check_room_frame_carries_room() {
    let f = Outbound::CheckRoom { room_id: room("abc-123") }.to_frame();
    assert_eq!(f.event, "check_room");
    assert_eq!(f.args, vec![json!("abc-123")]);
}

#[test]
fn leave_room_frame_has_no_args() {
    let f = Outbound::LeaveRoom.to_frame();
    assert_eq!(f.event, "leave_room");
    assert!(f.args.is_empty());
}

#[test]
fn transmitted_name_is_bounded() {
    let out = Outbound::CreateRoom { name: DisplayName::new("a-very-long-display-name") };
    assert_eq!(out.args(), vec![json!("a-very-long-dis")]);
}

// =============================================================
// Inbound
// =============================================================

#[test]
fn parses_created() {
    let msg = Inbound::from_frame(&frame("created", vec![json!("room-42")])).expect("parse");
    assert_eq!(msg, Inbound::Created { room_id: room("room-42") });
    assert_eq!(msg.kind(), InboundKind::Created);
}

#[test]
fn parses_joined_without_flag_as_success() {
    let msg = Inbound::from_frame(&frame("joined", vec![json!("abc")])).expect("parse");
    assert_eq!(msg, Inbound::Joined { room_id: Some(room("abc")), failed: false });
}

#[test]
fn parses_joined_failure_flag() {
    let msg = Inbound::from_frame(&frame("joined", vec![json!("abc"), json!(true)])).expect("parse");
    assert_eq!(msg, Inbound::Joined { room_id: Some(room("abc")), failed: true });
}

#[test]
fn joined_flag_uses_truthiness() {
    let falsy = [json!(null), json!(false), json!(0), json!("")];
    for flag in falsy {
        let msg = Inbound::from_frame(&frame("joined", vec![json!("abc"), flag.clone()])).expect("parse");
        assert_eq!(msg, Inbound::Joined { room_id: Some(room("abc")), failed: false }, "flag {flag}");
    }
    let truthy = [json!(1), json!("yes"), json!({})];
    for flag in truthy {
        let msg = Inbound::from_frame(&frame("joined", vec![json!("abc"), flag.clone()])).expect("parse");
        assert_eq!(msg, Inbound::Joined { room_id: Some(room("abc")), failed: true }, "flag {flag}");
    }
}

#[test]
fn parses_room_exists() {
    let yes = Inbound::from_frame(&frame("room_exists", vec![json!(true)])).expect("parse");
    let no = Inbound::from_frame(&frame("room_exists", vec![json!(false)])).expect("parse");
    assert_eq!(yes, Inbound::RoomExists { exists: true });
    assert_eq!(no, Inbound::RoomExists { exists: false });
}

#[test]
fn room_exists_without_arg_is_false() {
    let msg = Inbound::from_frame(&frame("room_exists", Vec::new())).expect("parse");
    assert_eq!(msg, Inbound::RoomExists { exists: false });
}

#[test]
fn rejects_unknown_event() {
    let err = Inbound::from_frame(&frame("drawing", Vec::new())).expect_err("unknown");
    assert!(matches!(err, ProtocolError::UnknownEvent(ref e) if e == "drawing"));
}

#[test]
fn rejects_created_without_room_id() {
    let err = Inbound::from_frame(&frame("created", Vec::new())).expect_err("missing");
    assert!(matches!(err, ProtocolError::MissingRoomId { event: "created" }));
}

#[test]
fn rejects_joined_success_with_empty_room_id() {
    let err = Inbound::from_frame(&frame("joined", vec![json!(""), json!(false)])).expect_err("empty");
    assert!(matches!(err, ProtocolError::MissingRoomId { event: "joined" }));
}

#[test]
fn joined_failure_without_echo_still_parses() {
    let empty = Inbound::from_frame(&frame("joined", vec![json!(""), json!(true)])).expect("parse");
    let null = Inbound::from_frame(&frame("joined", vec![json!(null), json!(true)])).expect("parse");
    assert_eq!(empty, Inbound::Joined { room_id: None, failed: true });
    assert_eq!(null, Inbound::Joined { room_id: None, failed: true });
}

#[test]
fn inbound_frames_parse_back() {
    let msgs = [
        Inbound::Created { room_id: room("r1") },
        Inbound::Joined { room_id: Some(room("r2")), failed: true },
        Inbound::Joined { room_id: None, failed: true },
        Inbound::RoomExists { exists: false },
    ];
    for msg in msgs {
        assert_eq!(Inbound::from_frame(&msg.to_frame()).expect("parse"), msg);
    }
}

#[test]
fn inbound_kind_names_match_events() {
    assert_eq!(InboundKind::Created.to_string(), "created");
    assert_eq!(InboundKind::Joined.to_string(), "joined");
    assert_eq!(InboundKind::RoomExists.to_string(), "room_exists");
}
