//! Dynamic Row
//!
//! A schema-typed field container. Writes collect errors instead of
//! failing; `build` reports them joined and freezes the row. Reading a
//! field the schema does not define is a programming error and panics.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::appdef::{
    AppDef, DataKind, FieldDef, QName, TypeDef, SYS_CONTAINER, SYS_ID, SYS_IS_ACTIVE,
    SYS_PARENT_ID, SYS_QNAME,
};
use crate::events::Event;
use crate::ids::RecordId;
use crate::records::Record;

use super::errors::{FieldError, FieldErrors};
use super::value::FieldValue;

/// Schema-typed row of field values plus system fields.
#[derive(Clone)]
pub struct Row {
    appdef: Arc<AppDef>,
    def: Option<Arc<TypeDef>>,
    qname: QName,
    id: RecordId,
    parent_id: RecordId,
    container: String,
    is_active: bool,
    values: Vec<Option<FieldValue>>,
    /// Fields explicitly set to null
    nils: BTreeSet<u16>,
    /// Nilled field indexes, valid once built
    nilled: Vec<u16>,
    errors: FieldErrors,
    built: bool,
}

impl Row {
    /// Creates an empty row of the given type.
    ///
    /// An unknown type is recorded as a field error.
    pub fn new(appdef: &Arc<AppDef>, qname: &QName) -> Self {
        let mut row = Self::null(appdef);
        row.set_type(qname);
        row
    }

    /// Creates a row with the null type name.
    pub fn null(appdef: &Arc<AppDef>) -> Self {
        Self {
            appdef: Arc::clone(appdef),
            def: None,
            qname: QName::null(),
            id: RecordId::NULL,
            parent_id: RecordId::NULL,
            container: String::new(),
            is_active: true,
            values: Vec::new(),
            nils: BTreeSet::new(),
            nilled: Vec::new(),
            errors: FieldErrors::new(),
            built: false,
        }
    }

    fn set_type(&mut self, qname: &QName) {
        self.qname = qname.clone();
        self.def = None;
        self.values.clear();
        if qname.is_null() {
            return;
        }
        match self.appdef.type_def(qname) {
            Some(def) => {
                self.values = vec![None; def.fields.len()];
                self.def = Some(Arc::clone(def));
            }
            None => self.errors.push(FieldError::UnknownType {
                qname: qname.clone(),
            }),
        }
    }

    /// Resets to the null type with default system fields.
    pub fn clear(&mut self) {
        self.def = None;
        self.qname = QName::null();
        self.id = RecordId::NULL;
        self.parent_id = RecordId::NULL;
        self.container.clear();
        self.is_active = true;
        self.values.clear();
        self.nils.clear();
        self.nilled.clear();
        self.errors.clear();
        self.built = false;
    }

    /// Clears the row and reuses it for another type.
    pub fn reset(&mut self, qname: &QName) {
        self.clear();
        self.set_type(qname);
    }

    pub fn appdef(&self) -> &Arc<AppDef> {
        &self.appdef
    }

    pub fn type_def(&self) -> Option<&Arc<TypeDef>> {
        self.def.as_ref()
    }

    pub fn qname(&self) -> &QName {
        &self.qname
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn parent_id(&self) -> RecordId {
        self.parent_id
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Indexes of fields explicitly set to null, ascending. Valid once built.
    pub fn nilled(&self) -> &[u16] {
        &self.nilled
    }

    /// Errors collected so far.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Values by field index.
    pub fn values(&self) -> &[Option<FieldValue>] {
        &self.values
    }

    /// Iterates over user fields that hold a value.
    pub fn fields(&self) -> impl Iterator<Item = (usize, &FieldDef, &FieldValue)> {
        let defs = self.def.as_deref().map(|d| d.fields.as_slice()).unwrap_or(&[]);
        defs.iter()
            .zip(self.values.iter())
            .enumerate()
            .filter_map(|(i, (def, value))| value.as_ref().map(|v| (i, def, v)))
    }

    /// True if any user field holds a value or was explicitly nulled.
    pub fn has_user_changes(&self) -> bool {
        self.values.iter().any(Option::is_some) || !self.nils.is_empty()
    }

    pub fn put_int32(&mut self, name: &str, value: i32) {
        self.put(name, FieldValue::Int32(value));
    }

    pub fn put_int64(&mut self, name: &str, value: i64) {
        self.put(name, FieldValue::Int64(value));
    }

    pub fn put_float32(&mut self, name: &str, value: f32) {
        self.put(name, FieldValue::Float32(value));
    }

    pub fn put_float64(&mut self, name: &str, value: f64) {
        self.put(name, FieldValue::Float64(value));
    }

    pub fn put_bool(&mut self, name: &str, value: bool) {
        self.put(name, FieldValue::Bool(value));
    }

    pub fn put_string(&mut self, name: &str, value: impl Into<String>) {
        self.put(name, FieldValue::String(value.into()));
    }

    pub fn put_bytes(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        self.put(name, FieldValue::Bytes(value.into()));
    }

    pub fn put_qname(&mut self, name: &str, value: QName) {
        self.put(name, FieldValue::QName(value));
    }

    pub fn put_record_id(&mut self, name: &str, value: RecordId) {
        self.put(name, FieldValue::RecordId(value));
    }

    pub fn put_record(&mut self, name: &str, value: Record) {
        self.put(name, FieldValue::Record(Box::new(value)));
    }

    pub fn put_event(&mut self, name: &str, value: Arc<Event>) {
        self.put(name, FieldValue::Event(value));
    }

    /// Explicitly sets a user field to null.
    pub fn put_null(&mut self, name: &str) {
        if !self.check_writable(name) {
            return;
        }
        match self.user_field(name).map(|(idx, _)| idx) {
            Ok(idx) => {
                self.values[idx] = None;
                self.nils.insert(idx as u16);
            }
            Err(e) => self.errors.push(e),
        }
    }

    /// Writes a value, collecting any error.
    pub fn put(&mut self, name: &str, value: FieldValue) {
        if !self.check_writable(name) {
            return;
        }
        if name.starts_with("sys.") {
            self.put_sys(name, value);
            return;
        }

        let checked = self
            .user_field(name)
            .and_then(|(idx, field)| check_value(field, &value).map(|_| idx));
        match checked {
            Ok(idx) => {
                self.values[idx] = Some(value);
                self.nils.remove(&(idx as u16));
            }
            Err(e) => self.errors.push(e),
        }
    }

    fn check_writable(&mut self, name: &str) -> bool {
        if self.built {
            self.errors.push(FieldError::ReadOnly {
                field: name.to_string(),
            });
            return false;
        }
        true
    }

    fn user_field(&self, name: &str) -> Result<(usize, &FieldDef), FieldError> {
        self.def
            .as_deref()
            .and_then(|def| def.field_index(name).map(|i| (i, &def.fields[i])))
            .ok_or_else(|| FieldError::UnknownField {
                type_name: self.qname.clone(),
                field: name.to_string(),
            })
    }

    fn put_sys(&mut self, name: &str, value: FieldValue) {
        let sys = match self.def.as_deref() {
            Some(def) => def.sys_fields(),
            None => {
                self.errors.push(FieldError::NotApplicable {
                    type_name: self.qname.clone(),
                    field: name.to_string(),
                });
                return;
            }
        };
        let (applies, expected) = match name {
            SYS_QNAME => {
                self.errors.push(FieldError::ReadOnly {
                    field: name.to_string(),
                });
                return;
            }
            SYS_ID => (sys.id, DataKind::RecordId),
            SYS_PARENT_ID => (sys.parent_id, DataKind::RecordId),
            SYS_CONTAINER => (sys.container, DataKind::String),
            SYS_IS_ACTIVE => (sys.is_active, DataKind::Bool),
            _ => {
                self.errors.push(FieldError::UnknownField {
                    type_name: self.qname.clone(),
                    field: name.to_string(),
                });
                return;
            }
        };
        if !applies {
            self.errors.push(FieldError::NotApplicable {
                type_name: self.qname.clone(),
                field: name.to_string(),
            });
            return;
        }
        if value.kind() != expected {
            self.errors.push(FieldError::WrongKind {
                field: name.to_string(),
                expected: expected.kind_name(),
                actual: value.kind().kind_name(),
            });
            return;
        }
        match (name, value) {
            (SYS_ID, FieldValue::RecordId(id)) => self.id = id,
            (SYS_PARENT_ID, FieldValue::RecordId(id)) => self.parent_id = id,
            (SYS_CONTAINER, FieldValue::String(c)) => self.container = c,
            (SYS_IS_ACTIVE, FieldValue::Bool(a)) => self.is_active = a,
            _ => {}
        }
    }

    /// Flushes pending writes and reports collected errors.
    ///
    /// Zero-length strings and byte sequences are stored as explicit nulls.
    pub fn build(&mut self) -> Result<(), FieldErrors> {
        if !self.errors.is_empty() {
            return Err(self.errors.clone());
        }
        for (idx, value) in self.values.iter_mut().enumerate() {
            if value.as_ref().map_or(false, FieldValue::is_empty_var) {
                *value = None;
                self.nils.insert(idx as u16);
            }
        }
        self.nilled = self.nils.iter().copied().collect();
        self.built = true;
        Ok(())
    }

    fn field_value(&self, name: &str) -> Option<&FieldValue> {
        match self.user_field(name) {
            Ok((idx, _)) => self.values[idx].as_ref(),
            Err(_) => panic!("field '{}' is not defined in '{}'", name, self.qname),
        }
    }

    fn kind_mismatch(&self, name: &str, expected: DataKind, value: &FieldValue) -> ! {
        panic!(
            "field '{}' of '{}' is {}, read as {}",
            name,
            self.qname,
            value.kind().kind_name(),
            expected.kind_name()
        )
    }

    pub fn as_int32(&self, name: &str) -> i32 {
        match self.field_value(name) {
            None => 0,
            Some(FieldValue::Int32(v)) => *v,
            Some(v) => self.kind_mismatch(name, DataKind::Int32, v),
        }
    }

    pub fn as_int64(&self, name: &str) -> i64 {
        match self.field_value(name) {
            None => 0,
            Some(FieldValue::Int64(v)) => *v,
            Some(v) => self.kind_mismatch(name, DataKind::Int64, v),
        }
    }

    pub fn as_float32(&self, name: &str) -> f32 {
        match self.field_value(name) {
            None => 0.0,
            Some(FieldValue::Float32(v)) => *v,
            Some(v) => self.kind_mismatch(name, DataKind::Float32, v),
        }
    }

    pub fn as_float64(&self, name: &str) -> f64 {
        match self.field_value(name) {
            None => 0.0,
            Some(FieldValue::Float64(v)) => *v,
            Some(v) => self.kind_mismatch(name, DataKind::Float64, v),
        }
    }

    pub fn as_bool(&self, name: &str) -> bool {
        if name == SYS_IS_ACTIVE {
            return self.is_active;
        }
        match self.field_value(name) {
            None => false,
            Some(FieldValue::Bool(v)) => *v,
            Some(v) => self.kind_mismatch(name, DataKind::Bool, v),
        }
    }

    pub fn as_string(&self, name: &str) -> &str {
        if name == SYS_CONTAINER {
            return &self.container;
        }
        match self.field_value(name) {
            None => "",
            Some(FieldValue::String(v)) => v.as_str(),
            Some(v) => self.kind_mismatch(name, DataKind::String, v),
        }
    }

    pub fn as_bytes(&self, name: &str) -> &[u8] {
        match self.field_value(name) {
            None => &[],
            Some(FieldValue::Bytes(v)) => v.as_slice(),
            Some(v) => self.kind_mismatch(name, DataKind::Bytes, v),
        }
    }

    pub fn as_qname(&self, name: &str) -> QName {
        if name == SYS_QNAME {
            return self.qname.clone();
        }
        match self.field_value(name) {
            None => QName::null(),
            Some(FieldValue::QName(v)) => v.clone(),
            Some(v) => self.kind_mismatch(name, DataKind::QName, v),
        }
    }

    pub fn as_record_id(&self, name: &str) -> RecordId {
        match name {
            SYS_ID => return self.id,
            SYS_PARENT_ID => return self.parent_id,
            _ => {}
        }
        match self.field_value(name) {
            None => RecordId::NULL,
            Some(FieldValue::RecordId(v)) => *v,
            Some(v) => self.kind_mismatch(name, DataKind::RecordId, v),
        }
    }

    /// Embedded record, if set.
    pub fn as_record(&self, name: &str) -> Option<&Record> {
        match self.field_value(name) {
            None => None,
            Some(FieldValue::Record(v)) => Some(v.as_ref()),
            Some(v) => self.kind_mismatch(name, DataKind::Record, v),
        }
    }

    /// Embedded event, if set.
    pub fn as_event(&self, name: &str) -> Option<&Arc<Event>> {
        match self.field_value(name) {
            None => None,
            Some(FieldValue::Event(v)) => Some(v),
            Some(v) => self.kind_mismatch(name, DataKind::Event, v),
        }
    }

    /// True if the field holds a value. Unknown fields hold none.
    pub fn has_value(&self, name: &str) -> bool {
        self.user_field(name)
            .map(|(idx, _)| self.values[idx].is_some())
            .unwrap_or(false)
    }

    pub(crate) fn push_error(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub(crate) fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    pub(crate) fn set_parent_id(&mut self, id: RecordId) {
        self.parent_id = id;
    }

    pub(crate) fn set_container(&mut self, container: impl Into<String>) {
        self.container = container.into();
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Replaces a value by index, bypassing write checks. The row must be
    /// built again before use.
    pub(crate) fn set_value_at(&mut self, idx: usize, value: Option<FieldValue>) {
        if idx >= self.values.len() {
            return;
        }
        match value {
            Some(v) => {
                self.values[idx] = Some(v);
                self.nils.remove(&(idx as u16));
            }
            None => {
                self.values[idx] = None;
                self.nils.insert(idx as u16);
            }
        }
        self.built = false;
    }

    /// Marks the row as written from already verified bytes.
    pub(crate) fn set_built(&mut self, nilled: Vec<u16>) {
        self.nils = nilled.iter().copied().collect();
        self.nilled = nilled;
        self.built = true;
    }

    /// Freezes the row again after internal rewrites of verified values.
    pub(crate) fn rebuild(&mut self) {
        self.nilled = self.nils.iter().copied().collect();
        self.built = true;
    }

    /// Rewrites record id field values. Returns true if any changed.
    pub(crate) fn remap_record_ids(&mut self, map: impl Fn(RecordId) -> Option<RecordId>) -> bool {
        let mut changed = false;
        for value in self.values.iter_mut() {
            if let Some(FieldValue::RecordId(id)) = value {
                if let Some(new_id) = map(*id) {
                    *id = new_id;
                    changed = true;
                }
            }
        }
        if changed {
            self.built = false;
        }
        changed
    }

    /// Replaces every string value with `token` and every other value
    /// with its kind's zero value.
    pub(crate) fn mask_values(&mut self, token: &str) {
        let kinds: Vec<DataKind> = match self.def.as_deref() {
            Some(def) => def.fields.iter().map(|f| f.kind).collect(),
            None => return,
        };
        for (value, kind) in self.values.iter_mut().zip(kinds) {
            if value.is_none() {
                continue;
            }
            *value = match kind {
                DataKind::String => Some(FieldValue::String(token.to_string())),
                other => FieldValue::zero(other),
            };
        }
        self.built = false;
    }
}

/// Checks kind and length of a user field value.
fn check_value(field: &FieldDef, value: &FieldValue) -> Result<(), FieldError> {
    if value.kind() != field.kind {
        return Err(FieldError::WrongKind {
            field: field.name.clone(),
            expected: field.kind.kind_name(),
            actual: value.kind().kind_name(),
        });
    }
    if let Some(len) = value.len() {
        let max = field.effective_max_len();
        if len > max {
            return Err(FieldError::TooLong {
                field: field.name.clone(),
                max,
                len,
            });
        }
    }
    Ok(())
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.qname == other.qname
            && self.id == other.id
            && self.parent_id == other.parent_id
            && self.container == other.container
            && self.is_active == other.is_active
            && self.values == other.values
            && self.nilled == other.nilled
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("qname", &self.qname)
            .field("id", &self.id)
            .field("parent_id", &self.parent_id)
            .field("container", &self.container)
            .field("is_active", &self.is_active)
            .field("values", &self.values)
            .field("nilled", &self.nilled)
            .field("built", &self.built)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appdef::{AppDefBuilder, ContainerDef, TypeKind};

    fn qn(entity: &str) -> QName {
        QName::new("test", entity)
    }

    fn appdef() -> Arc<AppDef> {
        let mut b = AppDefBuilder::new();
        b.add_type(
            TypeDef::new(qn("Doc"), TypeKind::Document)
                .with_field(FieldDef::required("name", DataKind::String))
                .with_field(FieldDef::optional("age", DataKind::Int32))
                .with_field(FieldDef::optional("data", DataKind::Bytes).with_max_len(4))
                .with_field(FieldDef::optional("ref", DataKind::RecordId))
                .with_container(ContainerDef::new("lines", qn("Line"), 0, 10)),
        );
        b.add_type(
            TypeDef::new(qn("Line"), TypeKind::Record)
                .with_field(FieldDef::optional("qty", DataKind::Int64)),
        );
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn test_put_and_read() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Doc"));
        row.put_string("name", "alpha");
        row.put_int32("age", 42);
        row.put_record_id(SYS_ID, RecordId::new(1));
        row.build().unwrap();

        assert_eq!(row.as_string("name"), "alpha");
        assert_eq!(row.as_int32("age"), 42);
        assert_eq!(row.as_record_id(SYS_ID), RecordId::new(1));
        assert_eq!(row.as_qname(SYS_QNAME), qn("Doc"));
        assert!(row.as_bool(SYS_IS_ACTIVE));
    }

    #[test]
    fn test_unset_reads_zero() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Doc"));
        row.build().unwrap();
        assert_eq!(row.as_int32("age"), 0);
        assert_eq!(row.as_string("name"), "");
        assert!(row.as_bytes("data").is_empty());
        assert!(!row.has_value("age"));
    }

    #[test]
    #[should_panic(expected = "not defined")]
    fn test_read_unknown_field_panics() {
        let app = appdef();
        let row = Row::new(&app, &qn("Doc"));
        row.as_int32("missing");
    }

    #[test]
    fn test_errors_are_collected_and_joined() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Doc"));
        row.put_int32("name", 1);
        row.put_string("missing", "x");
        row.put_bytes("data", vec![1, 2, 3, 4, 5]);
        row.put_record_id(SYS_PARENT_ID, RecordId::new(1));

        let errors = row.build().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors
            .iter()
            .any(|e| matches!(e, FieldError::WrongKind { field, .. } if field == "name")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, FieldError::TooLong { max: 4, len: 5, .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, FieldError::NotApplicable { .. })));
    }

    #[test]
    fn test_unknown_type_is_a_build_error() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Nope"));
        assert!(matches!(
            row.build().unwrap_err().iter().next(),
            Some(FieldError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_empty_values_become_nilled() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Doc"));
        row.put_string("name", "");
        row.put_null("age");
        row.put_bytes("data", Vec::new());
        row.build().unwrap();

        assert_eq!(row.nilled(), &[0, 1, 2]);
        assert!(!row.has_value("name"));
        assert!(row.has_user_changes());
    }

    #[test]
    fn test_put_after_null_clears_nil() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Doc"));
        row.put_null("age");
        row.put_int32("age", 7);
        row.build().unwrap();
        assert!(row.nilled().is_empty());
        assert_eq!(row.as_int32("age"), 7);
    }

    #[test]
    fn test_built_row_is_read_only() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Doc"));
        row.build().unwrap();
        row.put_int32("age", 1);
        assert!(!row.has_value("age"));
        assert!(matches!(
            row.errors().iter().next(),
            Some(FieldError::ReadOnly { .. })
        ));
    }

    #[test]
    fn test_clear_resets_system_fields() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Line"));
        row.put_record_id(SYS_ID, RecordId::new(5));
        row.put_bool(SYS_IS_ACTIVE, false);
        row.put_string(SYS_CONTAINER, "lines");
        row.clear();

        assert!(row.qname().is_null());
        assert!(row.id().is_null());
        assert!(row.is_active());
        assert_eq!(row.container(), "");
        assert!(row.build().is_ok());
    }

    #[test]
    fn test_sys_qname_is_read_only() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Doc"));
        row.put_qname(SYS_QNAME, qn("Line"));
        assert!(row.build().is_err());
    }

    #[test]
    fn test_remap_record_ids() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Doc"));
        row.put_record_id("ref", RecordId::new(3));
        row.build().unwrap();

        let changed = row.remap_record_ids(|id| {
            (id == RecordId::new(3)).then(|| RecordId::FIRST_USER)
        });
        assert!(changed);
        assert!(!row.is_built());
        row.build().unwrap();
        assert_eq!(row.as_record_id("ref"), RecordId::FIRST_USER);
    }

    #[test]
    fn test_mask_values() {
        let app = appdef();
        let mut row = Row::new(&app, &qn("Doc"));
        row.put_string("name", "secret");
        row.put_int32("age", 99);
        row.put_record_id(SYS_ID, RecordId::new(2));
        row.mask_values("*");
        row.build().unwrap();

        assert_eq!(row.as_string("name"), "*");
        assert_eq!(row.as_int32("age"), 0);
        assert!(!row.has_value("data"));
        assert_eq!(row.id(), RecordId::new(2));
    }
}
