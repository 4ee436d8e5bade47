//! Records store
//!
//! Materializes the change-sets of committed events and serves the
//! current state of each record.

use std::sync::Arc;

use tracing::{debug, info};

use crate::appdef::QName;
use crate::codec::Codec;
use crate::events::{Event, WorkspaceId};
use crate::ids::RecordId;
use crate::log::{keys, TrustLevel};
use crate::storage::{seal, unseal, StorageBackend, StorageKey};

use super::errors::{RecordsError, RecordsResult};
use super::record::Record;

/// Current state of records, per workspace.
pub struct Records {
    storage: Arc<dyn StorageBackend>,
    codec: Arc<Codec>,
    trust: TrustLevel,
}

impl Records {
    pub fn new(storage: Arc<dyn StorageBackend>, codec: Arc<Codec>, trust: TrustLevel) -> Self {
        Self {
            storage,
            codec,
            trust,
        }
    }

    /// Reads a record. A missing record is returned as a null record.
    pub fn get(&self, workspace: WorkspaceId, id: RecordId) -> RecordsResult<Record> {
        let key = keys::record_key(workspace, id);
        match self.storage.get(&key.pk, &key.cc)? {
            Some(value) => self.decode(&key, &value),
            None => Ok(Record::null(self.codec.appdef())),
        }
    }

    /// Reads several records in request order.
    pub fn get_batch(&self, workspace: WorkspaceId, ids: &[RecordId]) -> RecordsResult<Vec<Record>> {
        let keys: Vec<StorageKey> = ids
            .iter()
            .map(|id| keys::record_key(workspace, *id))
            .collect();
        self.storage
            .get_batch(&keys)?
            .into_iter()
            .zip(keys.iter())
            .map(|(value, key)| match value {
                Some(value) => self.decode(key, &value),
                None => Ok(Record::null(self.codec.appdef())),
            })
            .collect()
    }

    /// Reads the single instance of a singleton document type.
    pub fn get_singleton(&self, workspace: WorkspaceId, qname: &QName) -> RecordsResult<Record> {
        let id = self.codec.names().singletons().id(qname)?;
        self.get(workspace, id)
    }

    pub fn exists(&self, workspace: WorkspaceId, id: RecordId) -> RecordsResult<bool> {
        let key = keys::record_key(workspace, id);
        Ok(self.storage.get(&key.pk, &key.cc)?.is_some())
    }

    /// Writes the creates and updates of a valid event. Returns the
    /// number of records written.
    ///
    /// Every value is prepared and every create is checked before the
    /// first write, so a failing change-set writes nothing.
    ///
    /// Updates of events read back from a log carry no origin; it is
    /// loaded from storage and the update is built again.
    pub fn apply(&self, event: &Event) -> RecordsResult<usize> {
        if let Some(err) = event.error() {
            return Err(RecordsError::InvalidEvent {
                qname: event.original_qname().to_string(),
                reason: err.message().to_string(),
            });
        }
        let workspace = event.workspace();
        let cud = event.cud();

        let mut batch = Vec::with_capacity(cud.creates().len() + cud.updates().len());
        for create in cud.creates() {
            let value = seal(self.codec.encode_record(create)?);
            batch.push((keys::record_key(workspace, create.id()), value));
        }

        for update in cud.updates() {
            let mut update = update.clone();
            if update.origin().is_none() {
                let origin = self.get(workspace, update.id())?;
                if origin.qname().is_null() {
                    return Err(RecordsError::NotFound { id: update.id() });
                }
                update.set_origin(origin);
            }
            if update.result().is_none() {
                update.build().map_err(|source| RecordsError::Update {
                    id: update.id(),
                    source,
                })?;
            }
            let Some(result) = update.result() else {
                return Err(RecordsError::NotFound { id: update.id() });
            };
            let value = seal(self.codec.encode_record(result)?);
            batch.push((keys::record_key(workspace, update.id()), value));
        }

        let creates = cud.creates().len();
        if !self.trust.allows_record_overwrite() {
            let create_keys: Vec<StorageKey> =
                batch[..creates].iter().map(|(key, _)| key.clone()).collect();
            let existing = self.storage.get_batch(&create_keys)?;
            if let Some(pos) = existing.iter().position(Option::is_some) {
                return Err(RecordsError::Exists {
                    id: cud.creates()[pos].id(),
                });
            }
        }
        self.storage.put_batch(&batch)?;

        if !batch.is_empty() {
            info!(
                workspace,
                event = %event.qname(),
                wlog_offset = event.wlog_offset(),
                creates,
                updates = batch.len() - creates,
                "records applied"
            );
        }
        Ok(batch.len())
    }

    fn decode(&self, key: &StorageKey, value: &[u8]) -> RecordsResult<Record> {
        let payload = unseal(value).map_err(|e| e.for_key(&key.pk, &key.cc))?;
        let record = self.codec.decode_record(payload)?;
        debug!(id = %record.id(), qname = %record.qname(), "record read");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appdef::{AppDef, AppDefBuilder, DataKind, FieldDef, TypeDef, TypeKind, SYS_ID};
    use crate::events::{EventBuilder, EventParams, RawEventParams};
    use crate::names::Names;
    use crate::storage::MemoryBackend;

    fn qn(entity: &str) -> QName {
        QName::new("test", entity)
    }

    fn records(trust: TrustLevel) -> (Records, Arc<MemoryBackend>) {
        let mut b = AppDefBuilder::new();
        b.add_type(
            TypeDef::new(qn("Doc"), TypeKind::Document)
                .with_field(FieldDef::optional("name", DataKind::String))
                .with_field(FieldDef::optional("count", DataKind::Int32)),
        );
        b.add_type(TypeDef::new(qn("Config"), TypeKind::Document).as_singleton());
        let app: Arc<AppDef> = Arc::new(b.build().unwrap());
        let names = Arc::new(Names::prepare(&app).unwrap());
        let storage = Arc::new(MemoryBackend::new());
        let codec = Arc::new(Codec::new(app, names));
        (Records::new(storage.clone(), codec, trust), storage)
    }

    fn params() -> EventParams {
        EventParams {
            workspace: 5,
            ..EventParams::default()
        }
    }

    fn create_doc(records: &Records, id: RecordId, name: &str) -> Event {
        let app = records.codec.appdef();
        let mut b = EventBuilder::new_sync(
            app,
            RawEventParams::new(QName::command_cud(), params(), Vec::new()),
            Default::default(),
        );
        let doc = b.cud().create(&qn("Doc"));
        doc.put_record_id(SYS_ID, id);
        doc.put_string("name", name);
        b.build()
    }

    #[test]
    fn test_missing_record_is_null() {
        let (records, _) = records(TrustLevel::Strict);
        let rec = records.get(5, RecordId::FIRST_USER).unwrap();
        assert!(rec.qname().is_null());
        assert!(!records.exists(5, RecordId::FIRST_USER).unwrap());
    }

    #[test]
    fn test_apply_create_then_get() {
        let (records, _) = records(TrustLevel::Strict);
        let id = RecordId::FIRST_USER;
        let event = create_doc(&records, id, "alpha");
        assert_eq!(records.apply(&event).unwrap(), 1);

        let rec = records.get(5, id).unwrap();
        assert_eq!(rec.qname(), &qn("Doc"));
        assert_eq!(rec.as_string("name"), "alpha");
        // other workspaces do not see it
        assert!(records.get(6, id).unwrap().qname().is_null());

        let batch = records.get_batch(5, &[id, RecordId::new(id.value() + 1)]).unwrap();
        assert_eq!(batch[0].id(), id);
        assert!(batch[1].qname().is_null());
    }

    #[test]
    fn test_create_twice_depends_on_trust() {
        let (strict, _) = records(TrustLevel::Strict);
        let event = create_doc(&strict, RecordId::FIRST_USER, "a");
        strict.apply(&event).unwrap();
        assert!(matches!(
            strict.apply(&event),
            Err(RecordsError::Exists { .. })
        ));

        let (replay, _) = records(TrustLevel::Replay);
        replay.apply(&event).unwrap();
        replay.apply(&event).unwrap();
    }

    #[test]
    fn test_update_without_origin_loads_it() {
        let (records, _) = records(TrustLevel::Strict);
        let id = RecordId::FIRST_USER;
        records.apply(&create_doc(&records, id, "alpha")).unwrap();

        let origin = records.get(5, id).unwrap();
        let app = Arc::clone(records.codec.appdef());
        let mut b = EventBuilder::new(
            &app,
            RawEventParams::new(QName::command_cud(), params(), Vec::new()),
        );
        b.cud().update(origin).put_int32("count", 3);
        let event = b.build();

        // round trip through the codec drops the origin
        let decoded = records
            .codec
            .decode_event(&records.codec.encode_event(&event).unwrap())
            .unwrap();
        assert!(decoded.cud().updates()[0].origin().is_none());
        records.apply(&decoded).unwrap();

        let rec = records.get(5, id).unwrap();
        assert_eq!(rec.as_string("name"), "alpha");
        assert_eq!(rec.as_int32("count"), 3);
    }

    #[test]
    fn test_update_of_missing_record_fails() {
        let (records, _) = records(TrustLevel::Strict);
        let app = Arc::clone(records.codec.appdef());
        let mut origin = Record::new(&app, &qn("Doc"));
        origin.put_record_id(SYS_ID, RecordId::FIRST_USER);
        origin.build().unwrap();
        let mut b = EventBuilder::new(
            &app,
            RawEventParams::new(QName::command_cud(), params(), Vec::new()),
        );
        b.cud().update(origin).put_int32("count", 1);
        let event = records
            .codec
            .decode_event(&records.codec.encode_event(&b.build()).unwrap())
            .unwrap();
        assert!(matches!(
            records.apply(&event),
            Err(RecordsError::NotFound { .. })
        ));
    }

    #[test]
    fn test_failing_update_writes_no_create() {
        let (records, _) = records(TrustLevel::Strict);
        let app = Arc::clone(records.codec.appdef());
        let created = RecordId::FIRST_USER;
        let missing = RecordId::new(created.value() + 1);

        let mut origin = Record::new(&app, &qn("Doc"));
        origin.put_record_id(SYS_ID, missing);
        origin.build().unwrap();
        let mut b = EventBuilder::new_sync(
            &app,
            RawEventParams::new(QName::command_cud(), params(), Vec::new()),
            Default::default(),
        );
        let doc = b.cud().create(&qn("Doc"));
        doc.put_record_id(SYS_ID, created);
        doc.put_string("name", "orphan");
        b.cud().update(origin).put_int32("count", 1);
        let event = records
            .codec
            .decode_event(&records.codec.encode_event(&b.build()).unwrap())
            .unwrap();
        assert!(event.is_valid(), "{:?}", event.error());

        assert!(matches!(
            records.apply(&event),
            Err(RecordsError::NotFound { id }) if id == missing
        ));
        assert!(!records.exists(5, created).unwrap());
    }

    #[test]
    fn test_existing_create_writes_nothing() {
        let (records, _) = records(TrustLevel::Strict);
        let first = RecordId::FIRST_USER;
        let second = RecordId::new(first.value() + 1);
        records.apply(&create_doc(&records, second, "taken")).unwrap();

        let app = Arc::clone(records.codec.appdef());
        let mut b = EventBuilder::new_sync(
            &app,
            RawEventParams::new(QName::command_cud(), params(), Vec::new()),
            Default::default(),
        );
        for id in [first, second] {
            let doc = b.cud().create(&qn("Doc"));
            doc.put_record_id(SYS_ID, id);
            doc.put_string("name", "new");
        }
        let event = b.build();
        assert!(matches!(
            records.apply(&event),
            Err(RecordsError::Exists { id }) if id == second
        ));
        assert!(!records.exists(5, first).unwrap());
        assert_eq!(records.get(5, second).unwrap().as_string("name"), "taken");
    }

    #[test]
    fn test_corrupted_record_is_an_error() {
        let (records, storage) = records(TrustLevel::Strict);
        let id = RecordId::FIRST_USER;
        records.apply(&create_doc(&records, id, "alpha")).unwrap();
        let key = keys::record_key(5, id);
        storage.corrupt(&key.pk, &key.cc, |v| {
            let last = v.len() - 1;
            v[last] ^= 1;
        });
        assert!(matches!(records.get(5, id), Err(RecordsError::Storage(_))));
    }

    #[test]
    fn test_uncommitted_singleton_reads_null() {
        let (records, _) = records(TrustLevel::Strict);
        let rec = records.get_singleton(5, &qn("Config")).unwrap();
        assert!(rec.qname().is_null());
        assert!(matches!(
            records.get_singleton(5, &qn("Doc")),
            Err(RecordsError::Names(_))
        ));
    }

    #[test]
    fn test_invalid_event_is_not_applied() {
        let (records, _) = records(TrustLevel::Strict);
        let app = Arc::clone(records.codec.appdef());
        let event = EventBuilder::new(
            &app,
            RawEventParams::new(qn("Missing"), params(), Vec::new()),
        )
        .build();
        assert!(matches!(
            records.apply(&event),
            Err(RecordsError::InvalidEvent { .. })
        ));
    }
}
