//! Row, record and object encoding
//!
//! Row layout:
//! ```text
//! [u16 qname id]                       0 = null row, nothing follows
//! V0:  [sys fields of the type kind]   id u64, parent u64, container u16, active u8
//! V1+: [u16 sys mask][present fields]  id u64, parent u64, container u16
//! [u32 len][(u16 field index, value)*] strictly increasing indexes
//! ```
//! Object layout: row, then (non-null rows only) `[u16 count][object*]`.

use std::sync::Arc;

use crate::appdef::{AppDef, DataKind, FieldDef};
use crate::ids::RecordId;
use crate::names::{Names, NULL_CONTAINER_ID, NULL_QNAME_ID};
use crate::records::{Object, Record};
use crate::row::{FieldValue, Row};

use super::buffer::{ByteReader, ByteWriter};
use super::errors::{CodecError, CodecResult};
use super::version::CodecVersion;

/// System field mask bits.
pub(crate) mod sys_mask {
    pub const ID: u16 = 0x0001;
    pub const PARENT_ID: u16 = 0x0002;
    pub const CONTAINER: u16 = 0x0004;
    pub const INACTIVE: u16 = 0x0008;
}

/// Default limit of raw input bytes kept for invalid events.
pub const DEFAULT_MAX_RAW_EVENT_BYTES: usize = u16::MAX as usize;

/// Default token replacing string values of unlogged arguments.
pub const DEFAULT_MASK_TOKEN: &str = "*";

/// Versioned binary codec bound to an application's names.
///
/// Encoders write `version`; decoders accept every known version.
#[derive(Debug, Clone)]
pub struct Codec {
    appdef: Arc<AppDef>,
    names: Arc<Names>,
    version: CodecVersion,
    max_raw_event_bytes: usize,
    mask_token: String,
}

impl Codec {
    pub fn new(appdef: Arc<AppDef>, names: Arc<Names>) -> Self {
        Self {
            appdef,
            names,
            version: CodecVersion::LATEST,
            max_raw_event_bytes: DEFAULT_MAX_RAW_EVENT_BYTES,
            mask_token: DEFAULT_MASK_TOKEN.to_string(),
        }
    }

    pub fn with_version(mut self, version: CodecVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_max_raw_event_bytes(mut self, max: usize) -> Self {
        self.max_raw_event_bytes = max;
        self
    }

    pub fn with_mask_token(mut self, token: impl Into<String>) -> Self {
        self.mask_token = token.into();
        self
    }

    pub fn appdef(&self) -> &Arc<AppDef> {
        &self.appdef
    }

    pub fn names(&self) -> &Arc<Names> {
        &self.names
    }

    pub fn version(&self) -> CodecVersion {
        self.version
    }

    pub(crate) fn max_raw_event_bytes(&self) -> usize {
        self.max_raw_event_bytes
    }

    pub(crate) fn mask_token(&self) -> &str {
        &self.mask_token
    }

    /// Encodes a row prefixed with the codec version byte.
    pub fn encode_row(&self, row: &Row) -> CodecResult<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.put_u8(self.version.as_byte());
        self.write_row(&mut w, row, self.version)?;
        Ok(w.into_inner())
    }

    pub fn decode_row(&self, data: &[u8]) -> CodecResult<Row> {
        let mut r = ByteReader::new(data);
        let version = CodecVersion::from_byte(r.get_u8()?)?;
        let row = self.read_row(&mut r, version)?;
        r.expect_end()?;
        Ok(row)
    }

    /// Encodes a stored record. Same layout as a row.
    pub fn encode_record(&self, record: &Record) -> CodecResult<Vec<u8>> {
        self.encode_row(record.row())
    }

    pub fn decode_record(&self, data: &[u8]) -> CodecResult<Record> {
        Ok(Record::from_row(self.decode_row(data)?, false))
    }

    /// Encodes an object tree prefixed with the codec version byte.
    pub fn encode_object(&self, object: &Object) -> CodecResult<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.put_u8(self.version.as_byte());
        self.write_object(&mut w, object, self.version)?;
        Ok(w.into_inner())
    }

    pub fn decode_object(&self, data: &[u8]) -> CodecResult<Object> {
        let mut r = ByteReader::new(data);
        let version = CodecVersion::from_byte(r.get_u8()?)?;
        let object = self.read_object(&mut r, version)?;
        r.expect_end()?;
        Ok(object)
    }

    pub(crate) fn write_row(
        &self,
        w: &mut ByteWriter,
        row: &Row,
        version: CodecVersion,
    ) -> CodecResult<()> {
        if row.qname().is_null() {
            w.put_u16(NULL_QNAME_ID);
            return Ok(());
        }
        let def = row.type_def().ok_or_else(|| {
            CodecError::unencodable(format!("type '{}' is not defined", row.qname()))
        })?;
        w.put_u16(self.names.qnames().id(row.qname())?);

        let sys = def.sys_fields();
        if version.has_sys_mask() {
            let mut mask = 0u16;
            if sys.id && !row.id().is_null() {
                mask |= sys_mask::ID;
            }
            if sys.parent_id && !row.parent_id().is_null() {
                mask |= sys_mask::PARENT_ID;
            }
            if sys.container && !row.container().is_empty() {
                mask |= sys_mask::CONTAINER;
            }
            if sys.is_active && !row.is_active() {
                mask |= sys_mask::INACTIVE;
            }
            w.put_u16(mask);
            if mask & sys_mask::ID != 0 {
                w.put_u64(row.id().value());
            }
            if mask & sys_mask::PARENT_ID != 0 {
                w.put_u64(row.parent_id().value());
            }
            if mask & sys_mask::CONTAINER != 0 {
                w.put_u16(self.names.containers().id(row.container())?);
            }
        } else {
            if sys.id {
                w.put_u64(row.id().value());
            }
            if sys.parent_id {
                w.put_u64(row.parent_id().value());
            }
            if sys.container {
                w.put_u16(self.names.containers().id(row.container())?);
            }
            if sys.is_active {
                w.put_u8(row.is_active() as u8);
            }
        }

        let mut user = ByteWriter::new();
        for (idx, _, value) in row.fields() {
            if value.is_empty_var() {
                continue;
            }
            user.put_u16(idx as u16);
            self.write_value(&mut user, value, version)?;
        }
        w.put_bytes32(&user.into_inner())
    }

    fn write_value(
        &self,
        w: &mut ByteWriter,
        value: &FieldValue,
        version: CodecVersion,
    ) -> CodecResult<()> {
        match value {
            FieldValue::Int32(v) => w.put_i32(*v),
            FieldValue::Int64(v) => w.put_i64(*v),
            FieldValue::Float32(v) => w.put_u32(v.to_bits()),
            FieldValue::Float64(v) => w.put_u64(v.to_bits()),
            FieldValue::Bool(v) => w.put_u8(*v as u8),
            FieldValue::String(v) => w.put_bytes16(v.as_bytes())?,
            FieldValue::Bytes(v) => w.put_bytes16(v)?,
            FieldValue::QName(v) => w.put_u16(self.names.qnames().id(v)?),
            FieldValue::RecordId(v) => w.put_u64(v.value()),
            FieldValue::Record(record) => {
                let mut inner = ByteWriter::new();
                self.write_row(&mut inner, record.row(), version)?;
                w.put_bytes32(&inner.into_inner())?;
            }
            FieldValue::Event(event) => {
                let bytes = self.encode_event_with(event, version, Vec::new())?;
                w.put_bytes32(&bytes)?;
            }
        }
        Ok(())
    }

    pub(crate) fn read_row(&self, r: &mut ByteReader<'_>, version: CodecVersion) -> CodecResult<Row> {
        let offset = r.offset();
        let qname_id = r.get_u16()?;
        if qname_id == NULL_QNAME_ID {
            let mut row = Row::null(&self.appdef);
            row.set_built(Vec::new());
            return Ok(row);
        }
        let qname = self.names.qnames().qname(qname_id)?.clone();
        let mut row = Row::new(&self.appdef, &qname);
        let def = match row.type_def() {
            Some(def) => Arc::clone(def),
            None => {
                return Err(CodecError::malformed(
                    offset,
                    format!("'{}' does not name a type", qname),
                ))
            }
        };

        let sys = def.sys_fields();
        if version.has_sys_mask() {
            let mask_offset = r.offset();
            let mask = r.get_u16()?;
            let mut allowed = 0u16;
            if sys.id {
                allowed |= sys_mask::ID;
            }
            if sys.parent_id {
                allowed |= sys_mask::PARENT_ID;
            }
            if sys.container {
                allowed |= sys_mask::CONTAINER;
            }
            if sys.is_active {
                allowed |= sys_mask::INACTIVE;
            }
            if mask & !allowed != 0 {
                return Err(CodecError::malformed(
                    mask_offset,
                    format!("system field mask {:#06x} not valid for '{}'", mask, qname),
                ));
            }
            if mask & sys_mask::ID != 0 {
                row.set_id(read_non_null_id(r, "id")?);
            }
            if mask & sys_mask::PARENT_ID != 0 {
                row.set_parent_id(read_non_null_id(r, "parent id")?);
            }
            if mask & sys_mask::CONTAINER != 0 {
                let container_offset = r.offset();
                let container_id = r.get_u16()?;
                if container_id == NULL_CONTAINER_ID {
                    return Err(CodecError::malformed(
                        container_offset,
                        "container flagged present but empty",
                    ));
                }
                row.set_container(self.names.containers().name(container_id)?);
            }
            row.set_active(mask & sys_mask::INACTIVE == 0);
        } else {
            if sys.id {
                row.set_id(RecordId::new(r.get_u64()?));
            }
            if sys.parent_id {
                row.set_parent_id(RecordId::new(r.get_u64()?));
            }
            if sys.container {
                let container_id = r.get_u16()?;
                row.set_container(self.names.containers().name(container_id)?);
            }
            if sys.is_active {
                row.set_active(r.get_bool()?);
            }
        }

        let len = r.get_u32()? as usize;
        let mut user = r.sub_reader(len)?;
        let mut last: Option<u16> = None;
        while !user.is_empty() {
            let idx_offset = user.offset();
            let idx = user.get_u16()?;
            if last.map_or(false, |prev| idx <= prev) {
                return Err(CodecError::malformed(
                    idx_offset,
                    format!("field index {} out of order", idx),
                ));
            }
            let field = def.fields.get(idx as usize).ok_or_else(|| {
                CodecError::malformed(
                    idx_offset,
                    format!("field index {} not defined in '{}'", idx, qname),
                )
            })?;
            let value = self.read_value(&mut user, field, version)?;
            row.set_value_at(idx as usize, Some(value));
            last = Some(idx);
        }

        row.set_built(Vec::new());
        Ok(row)
    }

    fn read_value(
        &self,
        r: &mut ByteReader<'_>,
        field: &FieldDef,
        version: CodecVersion,
    ) -> CodecResult<FieldValue> {
        let offset = r.offset();
        let value = match field.kind {
            DataKind::Int32 => FieldValue::Int32(r.get_i32()?),
            DataKind::Int64 => FieldValue::Int64(r.get_i64()?),
            DataKind::Float32 => FieldValue::Float32(f32::from_bits(r.get_u32()?)),
            DataKind::Float64 => FieldValue::Float64(f64::from_bits(r.get_u64()?)),
            DataKind::Bool => FieldValue::Bool(r.get_bool()?),
            DataKind::String => FieldValue::String(r.get_string16()?),
            DataKind::Bytes => FieldValue::Bytes(r.get_bytes16()?.to_vec()),
            DataKind::QName => FieldValue::QName(self.names.qnames().qname(r.get_u16()?)?.clone()),
            DataKind::RecordId => FieldValue::RecordId(RecordId::new(r.get_u64()?)),
            DataKind::Record => {
                let len = r.get_u32()? as usize;
                let mut inner = r.sub_reader(len)?;
                let row = self.read_row(&mut inner, version)?;
                inner.expect_end()?;
                FieldValue::Record(Box::new(Record::from_row(row, false)))
            }
            DataKind::Event => {
                let len = r.get_u32()? as usize;
                let mut inner = r.sub_reader(len)?;
                let event = self.read_event(&mut inner)?;
                inner.expect_end()?;
                FieldValue::Event(Arc::new(event))
            }
        };

        if let Some(len) = value.len() {
            if len == 0 {
                return Err(CodecError::malformed(
                    offset,
                    format!("empty value stored for '{}'", field.name),
                ));
            }
            if len > field.effective_max_len() {
                return Err(CodecError::malformed(
                    offset,
                    format!(
                        "value of '{}' is {} bytes, maximum {}",
                        field.name,
                        len,
                        field.effective_max_len()
                    ),
                ));
            }
        }
        Ok(value)
    }

    pub(crate) fn write_object(
        &self,
        w: &mut ByteWriter,
        object: &Object,
        version: CodecVersion,
    ) -> CodecResult<()> {
        self.write_row(w, object.row(), version)?;
        if object.qname().is_null() {
            return Ok(());
        }
        let children = object.children();
        let count = u16::try_from(children.len()).map_err(|_| {
            CodecError::overflow(
                format!("children of '{}'", object.qname()),
                children.len(),
                u16::MAX as usize,
            )
        })?;
        w.put_u16(count);
        for child in children {
            self.write_object(w, child, version)?;
        }
        Ok(())
    }

    pub(crate) fn read_object(
        &self,
        r: &mut ByteReader<'_>,
        version: CodecVersion,
    ) -> CodecResult<Object> {
        let row = self.read_row(r, version)?;
        let is_null = row.qname().is_null();
        let mut object = Object::from_row(row);
        if is_null {
            return Ok(object);
        }
        let count = r.get_u16()?;
        for _ in 0..count {
            object.push_child(self.read_object(r, version)?);
        }
        Ok(object)
    }
}

fn read_non_null_id(r: &mut ByteReader<'_>, what: &str) -> CodecResult<RecordId> {
    let offset = r.offset();
    let id = RecordId::new(r.get_u64()?);
    if id.is_null() {
        return Err(CodecError::malformed(
            offset,
            format!("{} flagged present but null", what),
        ));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appdef::{
        AppDefBuilder, ContainerDef, QName, TypeDef, TypeKind, OCCURS_UNBOUNDED, SYS_CONTAINER,
        SYS_ID, SYS_IS_ACTIVE, SYS_PARENT_ID,
    };
    use crate::codec::CodecErrorCode;

    fn qn(entity: &str) -> QName {
        QName::new("test", entity)
    }

    fn codec() -> Codec {
        let mut b = AppDefBuilder::new();
        b.add_type(
            TypeDef::new(qn("Doc"), TypeKind::Document)
                .with_field(FieldDef::optional("name", DataKind::String))
                .with_field(FieldDef::optional("count", DataKind::Int32))
                .with_field(FieldDef::optional("total", DataKind::Int64))
                .with_field(FieldDef::optional("ratio", DataKind::Float64))
                .with_field(FieldDef::optional("flag", DataKind::Bool))
                .with_field(FieldDef::optional("blob", DataKind::Bytes))
                .with_field(FieldDef::optional("kind", DataKind::QName))
                .with_field(FieldDef::optional("ref", DataKind::RecordId))
                .with_field(FieldDef::optional("snapshot", DataKind::Record))
                .with_container(ContainerDef::new("lines", qn("Line"), 0, OCCURS_UNBOUNDED)),
        );
        b.add_type(
            TypeDef::new(qn("Line"), TypeKind::Record)
                .with_field(FieldDef::optional("qty", DataKind::Int32)),
        );
        b.add_type(
            TypeDef::new(qn("Params"), TypeKind::Object)
                .with_field(FieldDef::optional("text", DataKind::String))
                .with_container(ContainerDef::new("items", qn("Item"), 0, OCCURS_UNBOUNDED)),
        );
        b.add_type(
            TypeDef::new(qn("Item"), TypeKind::Element)
                .with_field(FieldDef::optional("label", DataKind::String)),
        );
        let appdef = Arc::new(b.build().unwrap());
        let names = Arc::new(Names::prepare(&appdef).unwrap());
        Codec::new(appdef, names)
    }

    fn full_doc(codec: &Codec) -> Row {
        let mut line = Record::new(codec.appdef(), &qn("Line"));
        line.put_record_id(SYS_ID, RecordId::FIRST_USER);
        line.put_string(SYS_CONTAINER, "lines");
        line.put_int32("qty", 3);
        line.build().unwrap();

        let mut row = Row::new(codec.appdef(), &qn("Doc"));
        row.put_record_id(SYS_ID, RecordId::new(RecordId::FIRST_USER.value() + 1));
        row.put_string("name", "alpha");
        row.put_int32("count", -7);
        row.put_int64("total", i64::MAX);
        row.put_float64("ratio", 0.25);
        row.put_bool("flag", true);
        row.put_bytes("blob", vec![0, 1, 2]);
        row.put_qname("kind", qn("Line"));
        row.put_record_id("ref", RecordId::new(5));
        row.put_record("snapshot", line);
        row.build().unwrap();
        row
    }

    #[test]
    fn test_row_round_trip_all_versions() {
        for version in [CodecVersion::V0, CodecVersion::V1, CodecVersion::V2] {
            let codec = codec().with_version(version);
            let row = full_doc(&codec);
            let bytes = codec.encode_row(&row).unwrap();
            assert_eq!(bytes[0], version.as_byte());
            let decoded = codec.decode_row(&bytes).unwrap();
            assert_eq!(decoded, row, "version {}", version);
            assert!(decoded.is_built());
        }
    }

    #[test]
    fn test_null_row_is_two_byte_sentinel() {
        let codec = codec();
        let row = Row::null(codec.appdef());
        let bytes = codec.encode_row(&row).unwrap();
        assert_eq!(&bytes[1..], &[0, 0]);
        assert!(codec.decode_row(&bytes).unwrap().qname().is_null());
    }

    #[test]
    fn test_sys_mask_omits_defaults() {
        let codec = codec();
        let mut row = Row::new(codec.appdef(), &qn("Line"));
        row.build().unwrap();
        let bytes = codec.encode_row(&row).unwrap();
        // version, qname id, mask, empty user buffer
        assert_eq!(bytes.len(), 1 + 2 + 2 + 4);

        let mut row = Row::new(codec.appdef(), &qn("Line"));
        row.put_record_id(SYS_ID, RecordId::FIRST_USER);
        row.put_record_id(SYS_PARENT_ID, RecordId::new(RecordId::FIRST_USER.value() + 1));
        row.put_string(SYS_CONTAINER, "lines");
        row.put_bool(SYS_IS_ACTIVE, false);
        row.build().unwrap();
        let bytes = codec.encode_row(&row).unwrap();
        assert_eq!(u16::from_le_bytes([bytes[3], bytes[4]]), 0x000f);
        let decoded = codec.decode_row(&bytes).unwrap();
        assert!(!decoded.is_active());
        assert_eq!(decoded.container(), "lines");
    }

    #[test]
    fn test_v0_reads_sys_fields_from_kind() {
        let codec = codec().with_version(CodecVersion::V0);
        let mut row = Row::new(codec.appdef(), &qn("Line"));
        row.build().unwrap();
        let bytes = codec.encode_row(&row).unwrap();
        // id, parent, container, active flag
        assert_eq!(bytes.len(), 1 + 2 + 8 + 8 + 2 + 1 + 4);
        assert_eq!(codec.decode_row(&bytes).unwrap(), row);
    }

    #[test]
    fn test_empty_values_are_not_written() {
        let codec = codec();
        let mut row = Row::new(codec.appdef(), &qn("Doc"));
        row.put_string("name", "");
        row.build().unwrap();
        let bytes = codec.encode_row(&row).unwrap();
        let decoded = codec.decode_row(&bytes).unwrap();
        assert!(!decoded.has_value("name"));
    }

    #[test]
    fn test_object_round_trip() {
        let codec = codec();
        let mut obj = Object::new(codec.appdef(), &qn("Params"));
        obj.put_string("text", "root");
        obj.add_child("items").put_string("label", "a");
        obj.add_child("items").put_string("label", "b");
        obj.build().unwrap();

        let bytes = codec.encode_object(&obj).unwrap();
        let decoded = codec.decode_object(&bytes).unwrap();
        assert_eq!(decoded, obj);
        assert_eq!(decoded.children()[1].as_string("label"), "b");
        assert_eq!(decoded.children()[1].parent_id(), obj.id());
    }

    #[test]
    fn test_child_count_above_u16_is_rejected() {
        let codec = codec();
        let mut obj = Object::new(codec.appdef(), &qn("Params"));
        for _ in 0..=u16::MAX as usize {
            obj.add_child("items");
        }
        assert!(obj.build().unwrap_err().iter().any(|e| matches!(
            e,
            crate::row::FieldError::TooManyChildren { count: 65_536, .. }
        )));

        let err = codec.encode_object(&obj).unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::AeroCodecOverflow);
        assert!(err.to_string().contains("65536"));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let codec = codec();
        let mut bytes = codec.encode_row(&full_doc(&codec)).unwrap();
        bytes[0] = 0x09;
        let err = codec.decode_row(&bytes).unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::AeroCodecUnknownVersion);
    }

    #[test]
    fn test_unknown_qname_id_rejected() {
        let codec = codec();
        let err = codec.decode_row(&[CodecVersion::LATEST.as_byte(), 0xff, 0xff]).unwrap_err();
        assert_eq!(err.code(), CodecErrorCode::AeroCodecUnknownName);
    }

    #[test]
    fn test_truncated_row_fails() {
        let codec = codec();
        let bytes = codec.encode_row(&full_doc(&codec)).unwrap();
        for len in 0..bytes.len() {
            assert!(codec.decode_row(&bytes[..len]).is_err(), "prefix {}", len);
        }
    }

    #[test]
    fn test_mask_bit_not_carried_by_kind_rejected() {
        let codec = codec();
        let mut row = Row::new(codec.appdef(), &qn("Doc"));
        row.build().unwrap();
        let mut bytes = codec.encode_row(&row).unwrap();
        // documents carry no parent id
        bytes[3] = sys_mask::PARENT_ID as u8;
        assert_eq!(
            codec.decode_row(&bytes).unwrap_err().code(),
            CodecErrorCode::AeroCodecMalformed
        );
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let codec = codec();
        let mut bytes = codec.encode_row(&full_doc(&codec)).unwrap();
        bytes.push(0);
        assert!(codec.decode_row(&bytes).is_err());
    }
}
