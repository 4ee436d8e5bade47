//! Partition log and workspace log
//!
//! Both logs store one sealed, encoded event per offset. Writes honor the
//! trust level; reads deliver events in offset order and turn undecodable
//! values into `sys.Corrupted` events instead of failing.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::Codec;
use crate::events::{BufferPool, DbEvent, Event, EventParams, Offset, PartitionId, WorkspaceId};
use crate::storage::{seal, unseal, StorageBackend, StorageKey};

use super::addressing::{read_partitioned, PartitionRange, ReadFlow};
use super::errors::{LogError, LogResult};
use super::keys::{self, PARTITION_RECORD_COUNT};
use super::trust::{LogKind, TrustLevel};

/// Reader and writer of both event logs.
pub struct EventLog {
    storage: Arc<dyn StorageBackend>,
    codec: Arc<Codec>,
    pool: Arc<BufferPool>,
    trust: TrustLevel,
}

impl EventLog {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        codec: Arc<Codec>,
        pool: Arc<BufferPool>,
        trust: TrustLevel,
    ) -> Self {
        Self {
            storage,
            codec,
            pool,
            trust,
        }
    }

    pub fn trust_level(&self) -> TrustLevel {
        self.trust
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Appends the event at its partition log offset.
    pub fn put_plog(&self, event: &Event) -> LogResult<()> {
        let key = keys::plog_key(event.partition(), event.plog_offset());
        self.write(
            LogKind::Partition,
            event.partition() as u64,
            event.plog_offset(),
            &key,
            event,
        )
    }

    /// Appends the event at its workspace log offset.
    pub fn put_wlog(&self, event: &Event) -> LogResult<()> {
        let key = keys::wlog_key(event.workspace(), event.wlog_offset());
        self.write(
            LogKind::Workspace,
            event.workspace(),
            event.wlog_offset(),
            &key,
            event,
        )
    }

    fn write(
        &self,
        log: LogKind,
        owner: u64,
        offset: Offset,
        key: &StorageKey,
        event: &Event,
    ) -> LogResult<()> {
        let encoded = self.codec.encode_event_into(event, self.pool.get())?;
        let value = seal(encoded);

        let written = if self.trust.allows_log_overwrite(log) {
            self.storage.put(&key.pk, &key.cc, &value).map(|_| true)
        } else {
            self.storage.insert_if_not_exists(&key.pk, &key.cc, &value)
        };
        let bytes = value.len();
        self.pool.put(value);

        if !written? {
            warn!(
                kind = %log,
                owner,
                offset,
                trust_level = %self.trust,
                "offset reuse rejected"
            );
            return Err(LogError::offset_reused(log, owner, offset));
        }

        debug!(
            kind = %log,
            owner,
            offset,
            event = %event.qname(),
            bytes,
            "event written"
        );
        Ok(())
    }

    /// Reads `count` partition log events from `offset`.
    ///
    /// The callback owns each delivered event and should release it.
    /// Storage must not be written from inside the callback.
    pub fn read_plog<F>(
        &self,
        partition: PartitionId,
        offset: Offset,
        count: i64,
        cancel: &CancellationToken,
        mut visit: F,
    ) -> LogResult<()>
    where
        F: FnMut(Offset, DbEvent) -> LogResult<ReadFlow>,
    {
        self.read(
            offset,
            count,
            cancel,
            |index| keys::plog_pk(partition, index),
            |offset| EventParams {
                partition,
                plog_offset: offset,
                ..EventParams::default()
            },
            &mut visit,
        )
    }

    /// Reads `count` workspace log events from `offset`.
    pub fn read_wlog<F>(
        &self,
        workspace: WorkspaceId,
        offset: Offset,
        count: i64,
        cancel: &CancellationToken,
        mut visit: F,
    ) -> LogResult<()>
    where
        F: FnMut(Offset, DbEvent) -> LogResult<ReadFlow>,
    {
        self.read(
            offset,
            count,
            cancel,
            |index| keys::wlog_pk(workspace, index),
            |offset| EventParams {
                workspace,
                wlog_offset: offset,
                ..EventParams::default()
            },
            &mut visit,
        )
    }

    fn read(
        &self,
        offset: Offset,
        count: i64,
        cancel: &CancellationToken,
        pk_of: impl Fn(u64) -> Vec<u8>,
        params_of: impl Fn(Offset) -> EventParams,
        visit: &mut dyn FnMut(Offset, DbEvent) -> LogResult<ReadFlow>,
    ) -> LogResult<()> {
        read_partitioned(offset, count, cancel, |range: PartitionRange| {
            let pk = pk_of(range.index);
            let from = range.min_cc.map(keys::cc);
            let to = range.max_cc.map(keys::cc);

            let mut found = 0usize;
            let mut flow = ReadFlow::Continue;
            let mut failure = None;

            self.storage
                .read_range(&pk, from.as_deref(), to.as_deref(), &mut |cc, value| {
                    found += 1;
                    if cancel.is_cancelled() {
                        failure = Some(LogError::cancelled(range.index));
                        return ControlFlow::Break(());
                    }
                    let Some(pos) = keys::position(cc) else {
                        failure = Some(LogError::aborted(format!(
                            "malformed clustering key {:?} in partition {}",
                            cc, range.index
                        )));
                        return ControlFlow::Break(());
                    };
                    let offset = range.index * PARTITION_RECORD_COUNT + pos as u64;
                    let event = self.load(value, params_of(offset));
                    match visit(offset, event) {
                        Ok(ReadFlow::Continue) => ControlFlow::Continue(()),
                        Ok(ReadFlow::Stop) => {
                            flow = ReadFlow::Stop;
                            ControlFlow::Break(())
                        }
                        Err(e) => {
                            failure = Some(e);
                            ControlFlow::Break(())
                        }
                    }
                })?;

            if let Some(e) = failure {
                return Err(e);
            }
            if found == 0 {
                return Ok(ReadFlow::Stop);
            }
            Ok(flow)
        })
    }

    /// Decodes a stored value into a pooled buffer.
    fn load(&self, value: &[u8], params: EventParams) -> DbEvent {
        let mut buf = self.pool.get();
        buf.extend_from_slice(value);

        let decoded = match unseal(&buf) {
            Ok(payload) => self.codec.decode_event(payload).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let event = match decoded {
            Ok(event) => event,
            Err(reason) => {
                warn!(
                    partition = params.partition,
                    plog_offset = params.plog_offset,
                    workspace = params.workspace,
                    wlog_offset = params.wlog_offset,
                    reason = %reason,
                    "corrupted event read"
                );
                Event::corrupted(self.codec.appdef(), params, value.to_vec(), reason)
            }
        };
        DbEvent::new(event, buf, Arc::clone(&self.pool))
    }
}
