//! Dynamic rows
//!
//! Every persisted entity is a row: a set of schema-typed user fields plus
//! the system fields its type kind carries.
//!
//! # Design Principles
//!
//! - Writes never fail immediately; errors are joined at build time
//! - Zero-length strings and byte sequences are explicit nulls
//! - Rows are read-only once built

mod dynamic;
mod errors;
mod json;
mod value;

pub use dynamic::Row;
pub use errors::{FieldError, FieldErrors};
pub use value::FieldValue;
