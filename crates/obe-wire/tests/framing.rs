use std::io::Cursor;

use obe_core::ObeError;
use obe_wire::{decode_frame, encode_frame, FramedTransport, Transport, HEADER_LEN};
use proptest::prelude::*;
use serde_json::{json, Value};

fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (-1_000_000i32..1_000_000).prop_map(|n| Value::from(f64::from(n) / 8.0)),
        "[a-z \"\\\\]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn frames_round_trip(value in json_strategy()) {
        let bytes = encode_frame(&value).unwrap();
        let header = std::str::from_utf8(&bytes[..HEADER_LEN]).unwrap();
        prop_assert_eq!(header.parse::<usize>().unwrap(), bytes.len() - HEADER_LEN);
        let (decoded, used) = decode_frame(&bytes).unwrap();
        prop_assert_eq!(used, bytes.len());
        prop_assert_eq!(decoded, value);
    }
}

#[test]
fn stream_transport_reads_back_to_back_frames() {
    let mut bytes = encode_frame(&json!({"command": "getcon"})).unwrap();
    bytes.extend(encode_frame(&json!({"command": "done"})).unwrap());
    let mut transport = FramedTransport::new(Cursor::new(bytes));
    assert_eq!(transport.receive().unwrap(), json!({"command": "getcon"}));
    assert_eq!(transport.receive().unwrap(), json!({"command": "done"}));

    let err = transport.receive().unwrap_err();
    assert!(matches!(err, ObeError::Transport(_)));
    assert_eq!(err.info().code, "wire.closed");
}

#[test]
fn send_writes_header_then_payload() {
    let mut transport = FramedTransport::new(Cursor::new(Vec::new()));
    transport.send(&json!([1.0])).unwrap();
    assert_eq!(transport.into_inner().into_inner(), b"0000000005[1.0]".to_vec());
}

#[test]
fn malformed_frames_are_transport_errors() {
    let err = decode_frame(b"00000x0004\"OK\"").unwrap_err();
    assert_eq!(err.info().code, "wire.bad_header");

    let err = decode_frame(b"0000000009\"OK\"").unwrap_err();
    assert_eq!(err.info().code, "wire.truncated");

    let err = decode_frame(b"0000000002{]").unwrap_err();
    assert_eq!(err.info().code, "wire.bad_payload");

    let mut transport = FramedTransport::new(Cursor::new(b"0000000010{\"comm".to_vec()));
    assert_eq!(transport.receive().unwrap_err().info().code, "wire.closed");
}

#[test]
fn oversized_header_without_payload_ends_in_transport_error() {
    let mut transport = FramedTransport::new(Cursor::new(b"9999999999{}".to_vec()));
    let err = transport.receive().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.info().code, "wire.closed");
    assert_eq!(err.info().context["have"], "2");
    assert_eq!(err.info().context["need"], "9999999999");
}
