//! Filling rows from JSON objects
//!
//! Values are converted by the field's data kind. Bytes are base64 text,
//! qualified names are `pkg.Entity` strings and `null` sets a field to null.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};

use crate::appdef::{DataKind, QName, SYS_CONTAINER, SYS_ID, SYS_IS_ACTIVE, SYS_PARENT_ID};
use crate::ids::RecordId;

use super::dynamic::Row;
use super::errors::FieldError;
use super::value::FieldValue;

impl Row {
    /// Writes every member of a JSON object as a field.
    pub fn put_json(&mut self, object: &Map<String, Value>) {
        for (name, value) in object {
            self.put_json_value(name, value);
        }
    }

    /// Writes one JSON value as a field.
    pub fn put_json_value(&mut self, name: &str, value: &Value) {
        let kind = match self.json_kind(name) {
            Some(kind) => kind,
            None => {
                let type_name = self.qname().clone();
                self.push_error(FieldError::UnknownField {
                    type_name,
                    field: name.to_string(),
                });
                return;
            }
        };
        if value.is_null() {
            self.put_null(name);
            return;
        }
        match json_to_value(kind, value) {
            Ok(v) => self.put(name, v),
            Err(reason) => self.push_error(FieldError::InvalidValue {
                field: name.to_string(),
                reason,
            }),
        }
    }

    fn json_kind(&self, name: &str) -> Option<DataKind> {
        match name {
            SYS_ID | SYS_PARENT_ID => Some(DataKind::RecordId),
            SYS_CONTAINER => Some(DataKind::String),
            SYS_IS_ACTIVE => Some(DataKind::Bool),
            _ => self.type_def().and_then(|def| def.field(name)).map(|f| f.kind),
        }
    }
}

fn json_to_value(kind: DataKind, value: &Value) -> Result<FieldValue, String> {
    let mismatch = || format!("cannot convert {} to {}", value, kind.kind_name());
    match kind {
        DataKind::Int32 => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(FieldValue::Int32)
            .ok_or_else(mismatch),
        DataKind::Int64 => value.as_i64().map(FieldValue::Int64).ok_or_else(mismatch),
        DataKind::Float32 => value
            .as_f64()
            .map(|v| FieldValue::Float32(v as f32))
            .ok_or_else(mismatch),
        DataKind::Float64 => value.as_f64().map(FieldValue::Float64).ok_or_else(mismatch),
        DataKind::Bool => value.as_bool().map(FieldValue::Bool).ok_or_else(mismatch),
        DataKind::String => value
            .as_str()
            .map(|s| FieldValue::String(s.to_string()))
            .ok_or_else(mismatch),
        DataKind::Bytes => {
            let text = value.as_str().ok_or_else(mismatch)?;
            STANDARD
                .decode(text)
                .map(FieldValue::Bytes)
                .map_err(|e| format!("invalid base64: {}", e))
        }
        DataKind::QName => {
            let text = value.as_str().ok_or_else(mismatch)?;
            text.parse::<QName>().map(FieldValue::QName)
        }
        DataKind::RecordId => value
            .as_u64()
            .map(|v| FieldValue::RecordId(RecordId::new(v)))
            .ok_or_else(mismatch),
        DataKind::Record | DataKind::Event => {
            Err(format!("{} values cannot be read from JSON", kind.kind_name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::appdef::{AppDef, AppDefBuilder, FieldDef, TypeDef, TypeKind};

    fn appdef() -> Arc<AppDef> {
        let mut b = AppDefBuilder::new();
        b.add_type(
            TypeDef::new(QName::new("test", "Doc"), TypeKind::Document)
                .with_field(FieldDef::optional("name", DataKind::String))
                .with_field(FieldDef::optional("small", DataKind::Int32))
                .with_field(FieldDef::optional("blob", DataKind::Bytes))
                .with_field(FieldDef::optional("kind", DataKind::QName))
                .with_field(FieldDef::optional("price", DataKind::Float64)),
        );
        Arc::new(b.build().unwrap())
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_put_json_converts_by_kind() {
        let app = appdef();
        let mut row = Row::new(&app, &QName::new("test", "Doc"));
        row.put_json(&obj(json!({
            "name": "alpha",
            "small": 7,
            "blob": "AQID",
            "kind": "test.Doc",
            "price": 1.5,
            "sys.ID": 3,
            "sys.IsActive": false
        })));
        row.build().unwrap();

        assert_eq!(row.as_string("name"), "alpha");
        assert_eq!(row.as_int32("small"), 7);
        assert_eq!(row.as_bytes("blob"), &[1, 2, 3]);
        assert_eq!(row.as_qname("kind"), QName::new("test", "Doc"));
        assert_eq!(row.as_float64("price"), 1.5);
        assert_eq!(row.id(), RecordId::new(3));
        assert!(!row.is_active());
    }

    #[test]
    fn test_put_json_errors() {
        let app = appdef();
        let mut row = Row::new(&app, &QName::new("test", "Doc"));
        row.put_json(&obj(json!({
            "small": 5_000_000_000i64,
            "blob": "not base64!",
            "unknown": 1
        })));
        let errors = row.build().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .any(|e| matches!(e, FieldError::UnknownField { field, .. } if field == "unknown")));
    }

    #[test]
    fn test_put_json_null() {
        let app = appdef();
        let mut row = Row::new(&app, &QName::new("test", "Doc"));
        row.put_json(&obj(json!({ "name": null })));
        row.build().unwrap();
        assert_eq!(row.nilled(), &[0]);
    }
}
