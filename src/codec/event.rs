//! Event encoding
//!
//! ```text
//! [u8 version][u16 stored qname id]
//! [u16 partition][u64 plog offset][u64 workspace][u64 wlog offset]
//! [i64 registered at][u8 sync]([u16 device][i64 sync time])?
//! [u8 valid]
//! invalid: [u32 len][error message][u16 len][original qname][u32 len][raw bytes]
//! valid:   [argument object][unlogged argument object]
//!          [u16 n][create row ([u16 n][u16 emptied index]*)?]*
//!          [u16 n][u64 id][changes row ([u16 n][u16 emptied index]*)?]*
//! ```
//! Emptied indexes are present from V2 on.

use crate::appdef::QName;
use crate::events::{BuildError, Event, EventParams, SyncParams};
use crate::ids::RecordId;
use crate::names::{CORRUPTED_QNAME_ID, ERROR_QNAME_ID, NULL_QNAME_ID};
use crate::records::{Cud, Object, Record, UpdateRec};
use crate::row::Row;

use super::buffer::{ByteReader, ByteWriter};
use super::errors::{CodecError, CodecResult};
use super::row::Codec;
use super::version::CodecVersion;

impl Codec {
    pub fn encode_event(&self, event: &Event) -> CodecResult<Vec<u8>> {
        self.encode_event_with(event, self.version(), Vec::new())
    }

    /// Encodes into `buf`, reusing its allocation.
    pub fn encode_event_into(&self, event: &Event, buf: Vec<u8>) -> CodecResult<Vec<u8>> {
        self.encode_event_with(event, self.version(), buf)
    }

    pub fn decode_event(&self, data: &[u8]) -> CodecResult<Event> {
        let mut r = ByteReader::new(data);
        let event = self.read_event(&mut r)?;
        r.expect_end()?;
        Ok(event)
    }

    pub(crate) fn encode_event_with(
        &self,
        event: &Event,
        version: CodecVersion,
        buf: Vec<u8>,
    ) -> CodecResult<Vec<u8>> {
        let mut w = ByteWriter::with_buffer(buf);
        w.put_u8(version.as_byte());
        w.put_u16(self.names().qnames().id(&event.qname())?);
        write_params(&mut w, event.params());

        if !event.is_valid() {
            w.put_u8(0);
            self.write_invalid(&mut w, event)?;
            return Ok(w.into_inner());
        }

        w.put_u8(1);
        self.write_object(&mut w, event.argument_object(), version)?;

        let unlogged = event.unlogged_argument_object();
        if unlogged.qname().is_null() {
            self.write_object(&mut w, unlogged, version)?;
        } else {
            let mut masked = unlogged.clone();
            masked
                .mask_values(self.mask_token())
                .map_err(|e| CodecError::unencodable(e.to_string()))?;
            self.write_object(&mut w, &masked, version)?;
        }

        self.write_cud(&mut w, event.cud(), version)?;
        Ok(w.into_inner())
    }

    fn write_invalid(&self, w: &mut ByteWriter, event: &Event) -> CodecResult<()> {
        let (message, raw) = match event.error() {
            Some(err) => (err.message(), err.raw_bytes()),
            None => ("", &[][..]),
        };
        w.put_bytes32(message.as_bytes())?;
        w.put_bytes16(event.original_qname().to_string().as_bytes())?;

        // Raw input of arguments with verified values must not be kept
        let raw = if event.argument_object().has_verifiable_fields() {
            &[][..]
        } else {
            &raw[..raw.len().min(self.max_raw_event_bytes())]
        };
        w.put_bytes32(raw)
    }

    fn write_cud(&self, w: &mut ByteWriter, cud: &Cud, version: CodecVersion) -> CodecResult<()> {
        let creates = cud.creates();
        w.put_u16(count_u16("creates", creates.len())?);
        for create in creates {
            self.write_row(w, create.row(), version)?;
            if version.has_emptied_fields() {
                write_emptied(w, create.row())?;
            }
        }

        let updates = cud.updates();
        w.put_u16(count_u16("updates", updates.len())?);
        for update in updates {
            w.put_u64(update.id().value());
            self.write_row(w, update.changes(), version)?;
            if version.has_emptied_fields() {
                write_emptied(w, update.changes())?;
            }
        }
        Ok(())
    }

    pub(crate) fn read_event(&self, r: &mut ByteReader<'_>) -> CodecResult<Event> {
        let version = CodecVersion::from_byte(r.get_u8()?)?;
        let qname_offset = r.offset();
        let qname_id = r.get_u16()?;
        let stored = self.names().qnames().qname(qname_id)?.clone();
        let params = read_params(r)?;
        let valid = r.get_bool()?;

        if !valid {
            if qname_id != ERROR_QNAME_ID && qname_id != CORRUPTED_QNAME_ID {
                return Err(CodecError::malformed(
                    qname_offset,
                    format!("invalid event stored as '{}'", stored),
                ));
            }
            let message = r.get_string32()?;
            let original_offset = r.offset();
            let original: QName = r
                .get_string16()?
                .parse()
                .map_err(|e: String| CodecError::malformed(original_offset, e))?;
            if (qname_id == CORRUPTED_QNAME_ID) != (original == QName::corrupted()) {
                return Err(CodecError::malformed(
                    original_offset,
                    format!("event '{}' stored as '{}'", original, stored),
                ));
            }
            let raw = r.get_bytes32()?.to_vec();
            return Ok(Event::from_parts(
                original,
                params,
                raw.clone(),
                Object::null(self.appdef()),
                Object::null(self.appdef()),
                Cud::new(self.appdef()),
                Some(BuildError::new(message, raw)),
            ));
        }

        if matches!(qname_id, NULL_QNAME_ID | ERROR_QNAME_ID | CORRUPTED_QNAME_ID) {
            return Err(CodecError::malformed(
                qname_offset,
                format!("valid event stored as '{}'", stored),
            ));
        }
        let arg = self.read_object(r, version)?;
        let unlogged = self.read_object(r, version)?;
        let cud = self.read_cud(r, version)?;
        Ok(Event::from_parts(stored, params, Vec::new(), arg, unlogged, cud, None))
    }

    fn read_cud(&self, r: &mut ByteReader<'_>, version: CodecVersion) -> CodecResult<Cud> {
        let mut cud = Cud::new(self.appdef());

        let creates = r.get_u16()?;
        for _ in 0..creates {
            let mut row = self.read_row(r, version)?;
            if version.has_emptied_fields() {
                let emptied = read_emptied(r, &row)?;
                row.set_built(emptied);
            }
            cud.push_create(Record::from_row(row, true));
        }

        let updates = r.get_u16()?;
        for _ in 0..updates {
            let id_offset = r.offset();
            let id = RecordId::new(r.get_u64()?);
            let mut changes = self.read_row(r, version)?;
            if id.is_null() || changes.id() != id {
                return Err(CodecError::malformed(
                    id_offset,
                    format!("update of {} carries changes of {}", id, changes.id()),
                ));
            }
            if cud.update_of(id).is_some() {
                return Err(CodecError::malformed(
                    id_offset,
                    format!("record {} updated twice", id),
                ));
            }
            if version.has_emptied_fields() {
                let emptied = read_emptied(r, &changes)?;
                changes.set_built(emptied);
            }
            cud.push_update(UpdateRec::from_changes(id, changes));
        }
        Ok(cud)
    }
}

fn count_u16(what: &str, count: usize) -> CodecResult<u16> {
    u16::try_from(count).map_err(|_| CodecError::overflow(what, count, u16::MAX as usize))
}

fn write_params(w: &mut ByteWriter, params: &EventParams) {
    w.put_u16(params.partition);
    w.put_u64(params.plog_offset);
    w.put_u64(params.workspace);
    w.put_u64(params.wlog_offset);
    w.put_i64(params.registered_at);
    match params.sync {
        Some(sync) => {
            w.put_u8(1);
            w.put_u16(sync.device);
            w.put_i64(sync.sync_time);
        }
        None => w.put_u8(0),
    }
}

fn read_params(r: &mut ByteReader<'_>) -> CodecResult<EventParams> {
    let partition = r.get_u16()?;
    let plog_offset = r.get_u64()?;
    let workspace = r.get_u64()?;
    let wlog_offset = r.get_u64()?;
    let registered_at = r.get_i64()?;
    let sync = if r.get_bool()? {
        Some(SyncParams {
            device: r.get_u16()?,
            sync_time: r.get_i64()?,
        })
    } else {
        None
    };
    Ok(EventParams {
        partition,
        plog_offset,
        workspace,
        wlog_offset,
        registered_at,
        sync,
    })
}

fn write_emptied(w: &mut ByteWriter, row: &Row) -> CodecResult<()> {
    let emptied = row.nilled();
    w.put_u16(count_u16("emptied fields", emptied.len())?);
    for idx in emptied {
        w.put_u16(*idx);
    }
    Ok(())
}

/// Reads emptied indexes: strictly increasing, defined, and not holding a value.
fn read_emptied(r: &mut ByteReader<'_>, row: &Row) -> CodecResult<Vec<u16>> {
    let count = r.get_u16()?;
    let mut emptied = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let offset = r.offset();
        let idx = r.get_u16()?;
        let in_order = emptied.last().map_or(true, |prev| idx > *prev);
        let unset = matches!(row.values().get(idx as usize), Some(None));
        if !in_order || !unset {
            return Err(CodecError::malformed(
                offset,
                format!("invalid emptied field index {} for '{}'", idx, row.qname()),
            ));
        }
        emptied.push(idx);
    }
    Ok(emptied)
}
