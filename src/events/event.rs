//! Event: the transactional unit
//!
//! An event carries its log coordinates, the argument object trees and a
//! change-set. Invalid events keep their build error and are persisted
//! like any other event.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::appdef::{AppDef, QName};
use crate::records::{Cud, Object};

use super::errors::{BuildError, ValidationCode};

/// Handling partition number.
pub type PartitionId = u16;

/// Workspace identifier.
pub type WorkspaceId = u64;

/// Position in a partition log or workspace log.
pub type Offset = u64;

/// Origin of a client-synchronized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncParams {
    pub device: u16,
    /// Client time of synchronization, epoch milliseconds
    pub sync_time: i64,
}

/// Where and when an event was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventParams {
    pub partition: PartitionId,
    pub plog_offset: Offset,
    pub workspace: WorkspaceId,
    pub wlog_offset: Offset,
    /// Registration time, epoch milliseconds
    pub registered_at: i64,
    pub sync: Option<SyncParams>,
}

impl EventParams {
    pub fn is_sync(&self) -> bool {
        self.sync.is_some()
    }
}

/// A built event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    qname: QName,
    params: EventParams,
    /// Client input the event was built from
    raw_bytes: Vec<u8>,
    arg: Object,
    unlogged_arg: Object,
    cud: Cud,
    error: Option<BuildError>,
}

impl Event {
    pub(crate) fn from_parts(
        qname: QName,
        params: EventParams,
        raw_bytes: Vec<u8>,
        arg: Object,
        unlogged_arg: Object,
        cud: Cud,
        error: Option<BuildError>,
    ) -> Self {
        Self {
            qname,
            params,
            raw_bytes,
            arg,
            unlogged_arg,
            cud,
            error,
        }
    }

    /// Event standing in for stored bytes that could not be decoded.
    pub fn corrupted(
        appdef: &Arc<AppDef>,
        params: EventParams,
        raw_bytes: Vec<u8>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            qname: QName::corrupted(),
            params,
            error: Some(BuildError::new(reason, raw_bytes.clone())),
            raw_bytes,
            arg: Object::null(appdef),
            unlogged_arg: Object::null(appdef),
            cud: Cud::new(appdef),
        }
    }

    /// Stored name: `sys.Corrupted` for undecodable events, `sys.Error`
    /// for events that failed to build, the command name otherwise.
    pub fn qname(&self) -> QName {
        if self.qname == QName::corrupted() {
            return QName::corrupted();
        }
        if self.error.is_some() {
            return QName::error();
        }
        self.qname.clone()
    }

    /// Command name as requested, before error substitution.
    pub fn original_qname(&self) -> &QName {
        &self.qname
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none() && self.qname != QName::corrupted() && self.qname != QName::error()
    }

    pub fn error(&self) -> Option<&BuildError> {
        self.error.as_ref()
    }

    pub fn params(&self) -> &EventParams {
        &self.params
    }

    /// Client input. Empty for valid events read back from a log.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn partition(&self) -> PartitionId {
        self.params.partition
    }

    pub fn plog_offset(&self) -> Offset {
        self.params.plog_offset
    }

    pub fn workspace(&self) -> WorkspaceId {
        self.params.workspace
    }

    pub fn wlog_offset(&self) -> Offset {
        self.params.wlog_offset
    }

    /// Registration time, if representable.
    pub fn registered_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.params.registered_at).single()
    }

    pub fn argument_object(&self) -> &Object {
        &self.arg
    }

    pub fn unlogged_argument_object(&self) -> &Object {
        &self.unlogged_arg
    }

    pub fn cud(&self) -> &Cud {
        &self.cud
    }

    pub(crate) fn argument_object_mut(&mut self) -> &mut Object {
        &mut self.arg
    }

    pub(crate) fn cud_mut(&mut self) -> &mut Cud {
        &mut self.cud
    }

    /// Marks a built event invalid after the fact.
    pub(crate) fn invalidate(&mut self, code: ValidationCode, message: impl Into<String>) {
        let mut validation = match self.error.take() {
            Some(err) => err.validation().clone(),
            None => Default::default(),
        };
        validation.add(code, message);
        self.error = Some(BuildError::from_validation(validation, self.raw_bytes.clone()));
    }
}
