//! Tagged field values

use std::sync::Arc;

use crate::appdef::{DataKind, QName};
use crate::events::Event;
use crate::ids::RecordId;
use crate::records::Record;

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    QName(QName),
    RecordId(RecordId),
    Record(Box<Record>),
    Event(Arc<Event>),
}

impl FieldValue {
    pub fn kind(&self) -> DataKind {
        match self {
            FieldValue::Int32(_) => DataKind::Int32,
            FieldValue::Int64(_) => DataKind::Int64,
            FieldValue::Float32(_) => DataKind::Float32,
            FieldValue::Float64(_) => DataKind::Float64,
            FieldValue::Bool(_) => DataKind::Bool,
            FieldValue::String(_) => DataKind::String,
            FieldValue::Bytes(_) => DataKind::Bytes,
            FieldValue::QName(_) => DataKind::QName,
            FieldValue::RecordId(_) => DataKind::RecordId,
            FieldValue::Record(_) => DataKind::Record,
            FieldValue::Event(_) => DataKind::Event,
        }
    }

    /// Zero value of a kind. Embedded records and events have none.
    pub fn zero(kind: DataKind) -> Option<FieldValue> {
        match kind {
            DataKind::Int32 => Some(FieldValue::Int32(0)),
            DataKind::Int64 => Some(FieldValue::Int64(0)),
            DataKind::Float32 => Some(FieldValue::Float32(0.0)),
            DataKind::Float64 => Some(FieldValue::Float64(0.0)),
            DataKind::Bool => Some(FieldValue::Bool(false)),
            DataKind::String => Some(FieldValue::String(String::new())),
            DataKind::Bytes => Some(FieldValue::Bytes(Vec::new())),
            DataKind::QName => Some(FieldValue::QName(QName::null())),
            DataKind::RecordId => Some(FieldValue::RecordId(RecordId::NULL)),
            DataKind::Record | DataKind::Event => None,
        }
    }

    /// Length of variable-length values.
    pub fn len(&self) -> Option<usize> {
        match self {
            FieldValue::String(s) => Some(s.len()),
            FieldValue::Bytes(b) => Some(b.len()),
            _ => None,
        }
    }

    /// True for zero-length strings and byte sequences.
    pub fn is_empty_var(&self) -> bool {
        self.len() == Some(0)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int32(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int64(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<RecordId> for FieldValue {
    fn from(v: RecordId) -> Self {
        FieldValue::RecordId(v)
    }
}
