//! Wire-compatibility tests for the hidbridge line protocol.
//!
//! These tests pin the exact JSON shapes that travel over the link, using
//! the crate's public API only. If a field name or discriminant changes,
//! deployed agents stop understanding the host, so these act as breaking-
//! change guards (in the same spirit as the protocol tests in the codec
//! module, but from the consumer's point of view).

use hidbridge_core::{decode_line, encode_line, translate_line};
use hidbridge_core::{AckStatus, HelloMessage, Message, MoveEvent, PresetRef};

/// A handshake line exactly as the agent produces it must decode on the host.
#[test]
fn test_canonical_hello_line_decodes() {
    let line = r#"{"type": "HELLO", "version": "1.0.0", "secret": "s", "preset": {"name": "p1", "sha256": "abc"}}"#;

    let decoded = decode_line(line).expect("canonical HELLO must decode");

    assert_eq!(
        decoded,
        Message::Hello(HelloMessage {
            version: "1.0.0".to_string(),
            secret: "s".to_string(),
            preset: PresetRef {
                name: "p1".to_string(),
                sha256: "abc".to_string(),
            },
        })
    );
}

/// The acceptance line the host sends must decode to `ACK{READY}` on the agent.
#[test]
fn test_canonical_ack_line_decodes() {
    let decoded = decode_line(r#"{"type": "ACK", "status": "READY"}"#).unwrap();
    assert_eq!(decoded, Message::Ack { status: AckStatus::Ready });
}

/// A movement line with whitespace between fields (pretty-printed by an older
/// peer) still decodes; JSON formatting is not part of the contract.
#[test]
fn test_canonical_mouse_line_decodes() {
    let decoded = decode_line(r#"{"type": "MOUSE", "dx": -3, "dy": 4, "buttons": 1}"#).unwrap();
    assert_eq!(decoded, Message::Mouse(MoveEvent { dx: -3, dy: 4, buttons: 1 }));
}

/// Process output flows: raw lines → translator → MOUSE messages → wire →
/// back to events, preserving order. This is the host's streaming pipeline
/// end to end, minus the sockets.
#[test]
fn test_translated_stream_survives_the_wire_in_order() {
    let process_output = "1,2,0\n5,-3,1\nabc\n7,0,2\n";

    let wire: Vec<String> = process_output
        .lines()
        .filter_map(translate_line)
        .map(|ev| encode_line(&Message::Mouse(ev)).unwrap())
        .collect();

    // The malformed line was dropped before it reached the wire.
    assert_eq!(wire.len(), 3);

    let received: Vec<MoveEvent> = wire
        .iter()
        .map(|line| match decode_line(line).unwrap() {
            Message::Mouse(ev) => ev,
            other => panic!("expected MOUSE, got {}", other.kind()),
        })
        .collect();

    assert_eq!(
        received,
        vec![
            MoveEvent { dx: 1, dy: 2, buttons: 0 },
            MoveEvent { dx: 5, dy: -3, buttons: 1 },
            MoveEvent { dx: 7, dy: 0, buttons: 2 },
        ]
    );
}

/// Legacy messages outside the closed set (the old SYNC file push) must be
/// rejected, not silently tolerated.
#[test]
fn test_retired_message_types_are_rejected() {
    assert!(decode_line(r#"{"type": "SYNC", "files": {}}"#).is_err());
    assert!(decode_line(r#"{"type": "PING"}"#).is_err());
}
