//! Serialization of the identity types shared with front-ends

use types::{Address, CallContext, PairKey, ProtocolVersion};

#[test]
fn test_protocol_version_serializes_by_name() {
    let json = serde_json::to_string(&ProtocolVersion::V2).unwrap();
    assert_eq!(json, "\"V2\"");
    let back: ProtocolVersion = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ProtocolVersion::V2);
}

#[test]
fn test_pair_key_round_trips_through_json() {
    let key = PairKey::new(Address::from_low_u64_be(9), Address::from_low_u64_be(3)).unwrap();
    let json = serde_json::to_string(&key).unwrap();
    let back: PairKey = serde_json::from_str(&json).unwrap();
    assert_eq!(back, key);
    assert_eq!(back.token0, Address::from_low_u64_be(3));
}

#[test]
fn test_call_context_with_sender_keeps_timestamp() {
    let ctx = CallContext::new(Address::from_low_u64_be(1), 1_700_000_000);
    let routed = ctx.with_sender(Address::from_low_u64_be(2));
    assert_eq!(routed.timestamp, ctx.timestamp);
    assert_eq!(routed.sender, Address::from_low_u64_be(2));
}
