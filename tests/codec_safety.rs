//! Codec Safety Tests
//!
//! Properties:
//! - Round trip: decoding an encoding reproduces the value
//! - Truncation: every strict prefix of an encoding fails to decode
//! - Corruption: a flipped byte never decodes to the original value
//! - Old versions stay readable

mod common;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use aeroevents::codec::{Codec, CodecVersion};
use aeroevents::events::{Event, EventBuilder, RawEventParams};
use aeroevents::ids::SequentialIdGenerator;
use aeroevents::log::TrustLevel;
use aeroevents::records::{Object, Record};

use common::{memory_store, params, place_order, qn};

const VERSIONS: [CodecVersion; 3] = [CodecVersion::V0, CodecVersion::V1, CodecVersion::V2];

// =============================================================================
// Test Utilities
// =============================================================================

fn codec(version: CodecVersion) -> Codec {
    let store = memory_store(TrustLevel::Strict);
    Codec::new(Arc::clone(store.appdef()), Arc::clone(store.names())).with_version(version)
}

/// A committed order: ids regenerated, unlogged argument set.
fn committed_order() -> Event {
    let store = memory_store(TrustLevel::Strict);
    let mut event = place_order(&store, params(1, 17, 3, 5));
    assert!(event.is_valid(), "{:?}", event.error());
    store
        .put_plog(&mut event, &mut SequentialIdGenerator::new())
        .unwrap();
    event
}

fn invalid_event() -> Event {
    let store = memory_store(TrustLevel::Strict);
    let raw = RawEventParams::new(qn("NoSuchCommand"), params(1, 18, 3, 6), b"{}".to_vec());
    EventBuilder::new(store.appdef(), raw).build()
}

fn samples(codec: &Codec) -> Vec<(String, Vec<u8>)> {
    let order = committed_order();
    let mut samples = vec![
        ("order event".to_string(), codec.encode_event(&order).unwrap()),
        ("invalid event".to_string(), codec.encode_event(&invalid_event()).unwrap()),
    ];
    for create in order.cud().creates() {
        samples.push((
            format!("record {}", create.qname()),
            codec.encode_record(create).unwrap(),
        ));
    }
    samples.push((
        "argument object".to_string(),
        codec.encode_object(order.argument_object()).unwrap(),
    ));
    samples
}

#[derive(Debug, PartialEq)]
enum Decoded {
    Event(Event),
    Record(Record),
    Object(Object),
}

fn decode_any(codec: &Codec, name: &str, data: &[u8]) -> Result<Decoded, String> {
    if name.ends_with("event") {
        codec.decode_event(data).map(Decoded::Event).map_err(|e| e.to_string())
    } else if name.starts_with("record") {
        codec.decode_record(data).map(Decoded::Record).map_err(|e| e.to_string())
    } else {
        codec.decode_object(data).map(Decoded::Object).map_err(|e| e.to_string())
    }
}

// =============================================================================
// Round Trip
// =============================================================================

#[test]
fn test_committed_event_round_trips_in_every_version() {
    let event = committed_order();
    for version in VERSIONS {
        let codec = codec(version);
        let bytes = codec.encode_event(&event).unwrap();
        assert_eq!(bytes[0], version.as_byte());

        let decoded = codec.decode_event(&bytes).unwrap();
        assert_eq!(decoded.qname(), event.qname(), "{}", version);
        assert_eq!(decoded.params(), event.params(), "{}", version);
        assert_eq!(decoded.argument_object(), event.argument_object(), "{}", version);
        assert_eq!(decoded.cud(), event.cud(), "{}", version);
    }
}

#[test]
fn test_unlogged_argument_is_never_stored_in_clear() {
    let event = committed_order();
    let codec = codec(CodecVersion::LATEST);
    let bytes = codec.encode_event(&event).unwrap();
    assert!(!bytes.windows(7).any(|w| w == b"hunter2"));

    let decoded = codec.decode_event(&bytes).unwrap();
    assert_eq!(decoded.unlogged_argument_object().as_string("password"), "*");
}

#[test]
fn test_invalid_event_keeps_error_and_raw_bytes() {
    let codec = codec(CodecVersion::LATEST);
    let event = invalid_event();
    let decoded = codec.decode_event(&codec.encode_event(&event).unwrap()).unwrap();
    assert!(!decoded.is_valid());
    assert_eq!(decoded.original_qname(), &qn("NoSuchCommand"));
    assert_eq!(decoded.error().unwrap().raw_bytes(), b"{}");
    assert_eq!(decoded.error(), event.error());
}

#[test]
fn test_event_written_by_old_version_reads_with_latest_reader() {
    let event = committed_order();
    let old = codec(CodecVersion::V0).encode_event(&event).unwrap();
    let decoded = codec(CodecVersion::LATEST).decode_event(&old).unwrap();
    assert_eq!(decoded.cud(), event.cud());
}

// =============================================================================
// Truncation
// =============================================================================

#[test]
fn test_every_prefix_fails_to_decode() {
    for version in VERSIONS {
        let codec = codec(version);
        for (name, bytes) in samples(&codec) {
            for len in 0..bytes.len() {
                assert!(
                    decode_any(&codec, &name, &bytes[..len]).is_err(),
                    "{} {}: prefix of {} of {} bytes decoded",
                    version,
                    name,
                    len,
                    bytes.len()
                );
            }
        }
    }
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn test_flipped_byte_never_decodes_to_original() {
    let codec = codec(CodecVersion::LATEST);

    for (name, bytes) in samples(&codec) {
        let original = decode_any(&codec, &name, &bytes).unwrap();
        for pos in 0..bytes.len() {
            let mut corrupted = bytes.clone();
            corrupted[pos] ^= 0x5a;

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                decode_any(&codec, &name, &corrupted)
            }));
            // an error or a panic is acceptable, a silent match is not
            if let Ok(Ok(decoded)) = result {
                assert_ne!(
                    decoded, original,
                    "{}: flip at {} decoded to the original value",
                    name, pos
                );
            }
        }
    }
}
