//! Change-set: record creations and updates carried by an event
//!
//! An update is seeded from an origin snapshot. Its `changes` row starts
//! with the origin's system fields, so a structural field differs from
//! the origin only if the caller wrote it. `result` is the origin merged
//! with the changes; it is valid only right after `build`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::appdef::{AppDef, QName, SYS_CONTAINER, SYS_ID, SYS_PARENT_ID, SYS_QNAME};
use crate::ids::RecordId;
use crate::row::{FieldError, FieldErrors, Row};

use super::record::Record;

/// Update of one existing record.
#[derive(Debug, Clone)]
pub struct UpdateRec {
    id: RecordId,
    origin: Option<Record>,
    changes: Row,
    result: Option<Record>,
}

impl UpdateRec {
    /// Starts an update of `origin`.
    pub fn new(origin: Record) -> Self {
        let mut changes = Row::new(origin.appdef(), origin.qname());
        changes.set_id(origin.id());
        changes.set_parent_id(origin.parent_id());
        changes.set_container(origin.container());
        changes.set_active(origin.is_active());
        Self {
            id: origin.id(),
            origin: Some(origin),
            changes,
            result: None,
        }
    }

    /// Update restored from stored changes; the origin is loaded later.
    pub(crate) fn from_changes(id: RecordId, changes: Row) -> Self {
        Self {
            id,
            origin: None,
            changes,
            result: None,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn qname(&self) -> &QName {
        self.changes.qname()
    }

    pub fn origin(&self) -> Option<&Record> {
        self.origin.as_ref()
    }

    pub fn changes(&self) -> &Row {
        &self.changes
    }

    pub fn changes_mut(&mut self) -> &mut Row {
        &mut self.changes
    }

    /// Origin merged with changes. `None` until built with an origin.
    pub fn result(&self) -> Option<&Record> {
        self.result.as_ref()
    }

    /// Replaces the origin snapshot. The update must be built again.
    pub fn set_origin(&mut self, origin: Record) {
        self.origin = Some(origin);
        self.result = None;
    }

    /// Rewrites record id values of the changes and the result.
    pub(crate) fn remap_record_ids(&mut self, map: impl Fn(RecordId) -> Option<RecordId> + Copy) {
        if self.changes.remap_record_ids(map) {
            self.changes.rebuild();
        }
        if let Some(result) = self.result.as_mut() {
            if result.remap_record_ids(map) {
                result.rebuild();
            }
        }
    }

    /// Builds the changes and, if the origin is known, the result.
    pub fn build(&mut self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Err(e) = self.changes.build() {
            errors.extend(e);
        }
        if self.changes.id() != self.id {
            errors.push(immutable(SYS_ID));
        }

        let Some(origin) = &self.origin else {
            self.result = None;
            return errors.into_result();
        };

        if self.changes.qname() != origin.qname() {
            errors.push(immutable(SYS_QNAME));
        }
        if self.changes.parent_id() != origin.parent_id() {
            errors.push(immutable(SYS_PARENT_ID));
        }
        if self.changes.container() != origin.container() {
            errors.push(immutable(SYS_CONTAINER));
        }
        if !errors.is_empty() {
            self.result = None;
            return Err(errors);
        }

        let mut result = origin.clone();
        result.set_new(false);
        result.set_active(self.changes.is_active());

        if self.changes.has_user_changes() {
            for (idx, value) in self.changes.values().iter().enumerate() {
                if let Some(value) = value {
                    result.set_value_at(idx, Some(value.clone()));
                }
            }
            for &idx in self.changes.nilled() {
                result.set_value_at(idx as usize, None);
            }
            result.build()?;
        }

        self.result = Some(result);
        Ok(())
    }
}

/// Updates are equal when they change the same record the same way.
impl PartialEq for UpdateRec {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.changes == other.changes
    }
}

fn immutable(field: &str) -> FieldError {
    FieldError::SysFieldImmutable {
        field: field.to_string(),
    }
}

/// Creations and updates of one event.
#[derive(Clone)]
pub struct Cud {
    appdef: Arc<AppDef>,
    creates: Vec<Record>,
    updates: Vec<UpdateRec>,
    index: HashMap<RecordId, usize>,
}

impl Cud {
    pub fn new(appdef: &Arc<AppDef>) -> Self {
        Self {
            appdef: Arc::clone(appdef),
            creates: Vec::new(),
            updates: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Adds a new record of the given type and returns it for writing.
    pub fn create(&mut self, qname: &QName) -> &mut Record {
        let mut record = Record::new(&self.appdef, qname);
        record.set_new(true);
        self.creates.push(record);
        let last = self.creates.len() - 1;
        &mut self.creates[last]
    }

    /// Starts an update of `origin` and returns its changes for writing.
    ///
    /// Updating the same record twice returns the existing changes.
    pub fn update(&mut self, origin: Record) -> &mut Row {
        let idx = match self.index.get(&origin.id()) {
            Some(idx) => *idx,
            None => {
                self.push_update(UpdateRec::new(origin));
                self.updates.len() - 1
            }
        };
        self.updates[idx].changes_mut()
    }

    pub(crate) fn push_create(&mut self, record: Record) {
        self.creates.push(record);
    }

    pub(crate) fn push_update(&mut self, update: UpdateRec) {
        self.index.insert(update.id(), self.updates.len());
        self.updates.push(update);
    }

    pub fn creates(&self) -> &[Record] {
        &self.creates
    }

    pub(crate) fn creates_mut(&mut self) -> &mut [Record] {
        &mut self.creates
    }

    pub fn updates(&self) -> &[UpdateRec] {
        &self.updates
    }

    pub(crate) fn updates_mut(&mut self) -> &mut [UpdateRec] {
        &mut self.updates
    }

    pub fn update_of(&self, id: RecordId) -> Option<&UpdateRec> {
        self.index.get(&id).map(|idx| &self.updates[*idx])
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty()
    }

    /// Builds every creation and update, joining all errors.
    pub fn build(&mut self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for record in &mut self.creates {
            if let Err(e) = record.build() {
                errors.extend(e);
            }
        }
        for update in &mut self.updates {
            if let Err(e) = update.build() {
                errors.extend(e);
            }
        }
        errors.into_result()
    }
}

impl PartialEq for Cud {
    fn eq(&self, other: &Self) -> bool {
        self.creates == other.creates && self.updates == other.updates
    }
}

impl fmt::Debug for Cud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cud")
            .field("creates", &self.creates)
            .field("updates", &self.updates)
            .finish()
    }
}
