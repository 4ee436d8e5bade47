//! Versioned binary codec
//!
//! Converts rows, records, object trees and events to and from bytes.
//!
//! # Design Principles
//!
//! - Released byte layouts are never reinterpreted
//! - Unknown versions and names are typed errors, never guesses
//! - Decoding accepts only canonical input: bytes that decode always
//!   re-encode to themselves
//!
//! # Formats
//!
//! All integers are little-endian. Every top-level encoding starts with
//! the codec version byte. See `row.rs` and `event.rs` for the layouts.

mod buffer;
mod errors;
mod event;
mod row;
mod version;

pub use buffer::{ByteReader, ByteWriter};
pub use errors::{CodecError, CodecErrorCode, CodecResult, Severity};
pub use row::{Codec, DEFAULT_MASK_TOKEN, DEFAULT_MAX_RAW_EVENT_BYTES};
pub use version::CodecVersion;
