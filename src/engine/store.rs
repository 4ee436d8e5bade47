//! Event store facade
//!
//! Wires the application definition, name tables, codec, event logs and
//! records store over one storage backend.
//!
//! Commit order of an event:
//! 1. `put_plog` checks singletons, regenerates raw ids and appends the
//!    event to its partition log
//! 2. `apply_records` materializes the change-set
//! 3. `put_wlog` appends the event to its workspace log

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::appdef::{AppDef, AppDefLoader};
use crate::codec::Codec;
use crate::config::StoreConfig;
use crate::events::regen::regenerate_ids;
use crate::events::{
    BufferPool, DbEvent, Event, EventBuilder, Offset, PartitionId, RawEventParams, SyncParams,
    ValidationCode, WorkspaceId,
};
use crate::ids::IdGenerator;
use crate::log::{EventLog, LogResult, ReadFlow};
use crate::names::Names;
use crate::records::Records;
use crate::storage::{FileBackend, StorageBackend};

use super::errors::EngineResult;

/// Event store over one storage backend.
pub struct EventStore {
    config: StoreConfig,
    appdef: Arc<AppDef>,
    names: Arc<Names>,
    codec: Arc<Codec>,
    log: EventLog,
    records: Records,
}

impl EventStore {
    pub fn new(
        config: StoreConfig,
        appdef: Arc<AppDef>,
        names: Arc<Names>,
        storage: Arc<dyn StorageBackend>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let codec = Arc::new(
            Codec::new(Arc::clone(&appdef), Arc::clone(&names))
                .with_version(config.codec_version)
                .with_mask_token(config.mask_token.clone())
                .with_max_raw_event_bytes(config.max_raw_event_bytes),
        );
        let pool = Arc::new(BufferPool::new(config.buffer_pool_capacity));
        let log = EventLog::new(
            Arc::clone(&storage),
            Arc::clone(&codec),
            pool,
            config.trust_level,
        );
        let records = Records::new(storage, Arc::clone(&codec), config.trust_level);

        Ok(Self {
            config,
            appdef,
            names,
            codec,
            log,
            records,
        })
    }

    /// Opens a store in `data_dir`: definitions from
    /// `metadata/appdef/`, name tables from `metadata/names.json`, data
    /// from `data/kv.dat`.
    pub fn open(data_dir: &Path, config: StoreConfig) -> EngineResult<Self> {
        let appdef = Arc::new(AppDefLoader::new(data_dir).load()?);
        let names = Arc::new(Names::load_or_prepare(data_dir, &appdef)?);
        let storage: Arc<dyn StorageBackend> = Arc::new(FileBackend::open(data_dir)?);
        info!(
            data_dir = %data_dir.display(),
            types = appdef.type_count(),
            trust_level = %config.trust_level,
            codec_version = %config.codec_version,
            "event store opened"
        );
        Self::new(config, appdef, names, storage)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn appdef(&self) -> &Arc<AppDef> {
        &self.appdef
    }

    pub fn names(&self) -> &Arc<Names> {
        &self.names
    }

    pub fn codec(&self) -> &Arc<Codec> {
        &self.codec
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn new_event(&self, raw: RawEventParams) -> EventBuilder {
        EventBuilder::new(&self.appdef, raw)
    }

    pub fn new_sync_event(&self, raw: RawEventParams, sync: SyncParams) -> EventBuilder {
        EventBuilder::new_sync(&self.appdef, raw, sync)
    }

    /// Commits an event to its partition log.
    ///
    /// A valid event may become invalid here if it creates a singleton
    /// that already exists. Invalid events are written as well; only
    /// storage, sequencing and id generation failures are errors.
    pub fn put_plog(&self, event: &mut Event, gen: &mut dyn IdGenerator) -> EngineResult<()> {
        if event.is_valid() {
            self.check_singletons(event)?;
        }
        regenerate_ids(event, self.names.singletons(), gen)?;
        self.log.put_plog(event)?;
        Ok(())
    }

    /// Appends a committed event to its workspace log.
    pub fn put_wlog(&self, event: &Event) -> EngineResult<()> {
        self.log.put_wlog(event)?;
        Ok(())
    }

    /// Materializes the change-set of a valid event.
    pub fn apply_records(&self, event: &Event) -> EngineResult<usize> {
        Ok(self.records.apply(event)?)
    }

    pub fn read_plog<F>(
        &self,
        partition: PartitionId,
        offset: Offset,
        count: i64,
        cancel: &CancellationToken,
        visit: F,
    ) -> LogResult<()>
    where
        F: FnMut(Offset, DbEvent) -> LogResult<ReadFlow>,
    {
        self.log.read_plog(partition, offset, count, cancel, visit)
    }

    pub fn read_wlog<F>(
        &self,
        workspace: WorkspaceId,
        offset: Offset,
        count: i64,
        cancel: &CancellationToken,
        visit: F,
    ) -> LogResult<()>
    where
        F: FnMut(Offset, DbEvent) -> LogResult<ReadFlow>,
    {
        self.log.read_wlog(workspace, offset, count, cancel, visit)
    }

    fn check_singletons(&self, event: &mut Event) -> EngineResult<()> {
        let workspace = event.workspace();
        let mut taken = Vec::new();
        for create in event.cud().creates() {
            let Some(def) = create.type_def() else {
                continue;
            };
            if !def.singleton {
                continue;
            }
            let id = self.names.singletons().id(&def.qname)?;
            if self.records.exists(workspace, id)? {
                taken.push(def.qname.clone());
            }
        }
        for qname in taken {
            warn!(workspace, singleton = %qname, "singleton already exists");
            event.invalidate(
                ValidationCode::UniqueViolation,
                format!("singleton '{}' already exists", qname),
            );
        }
        Ok(())
    }
}
