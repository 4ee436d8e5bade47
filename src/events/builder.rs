//! Event builder
//!
//! The builder exposes the argument trees and the change-set for writing.
//! `build` never fails: problems are recorded in the returned event.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::appdef::{AppDef, QName};
use crate::ids::RecordId;
use crate::records::{Cud, Object};

use super::errors::{BuildError, ValidationCode, ValidationError, ValidationErrors};
use super::event::{Event, EventParams, SyncParams};
use super::validate::validate_event;

/// What a new event is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEventParams {
    /// Command name
    pub qname: QName,
    pub params: EventParams,
    /// Raw client input, kept for invalid events
    pub raw_bytes: Vec<u8>,
}

impl RawEventParams {
    pub fn new(qname: QName, params: EventParams, raw_bytes: Vec<u8>) -> Self {
        Self {
            qname,
            params,
            raw_bytes,
        }
    }
}

/// Builder of a single event.
#[derive(Debug)]
pub struct EventBuilder {
    qname: QName,
    params: EventParams,
    raw_bytes: Vec<u8>,
    arg: Object,
    unlogged_arg: Object,
    cud: Cud,
    name_error: Option<ValidationError>,
}

impl EventBuilder {
    /// Starts an event. The command's parameter types shape the
    /// argument objects.
    pub fn new(appdef: &Arc<AppDef>, raw: RawEventParams) -> Self {
        let mut arg = Object::null(appdef);
        let mut unlogged_arg = Object::null(appdef);
        let mut name_error = None;

        let qname = raw.qname;
        if qname.is_null() {
            name_error = Some(ValidationError::new(
                ValidationCode::EmptyName,
                "event command name is empty",
            ));
        } else if qname == QName::command_cud() || qname == QName::corrupted() {
            // change-set only, no arguments
        } else {
            match appdef.command(&qname) {
                Some(cmd) => {
                    if let Some(param) = &cmd.param {
                        arg = Object::new(appdef, param);
                    }
                    if let Some(param) = &cmd.unlogged_param {
                        unlogged_arg = Object::new(appdef, param);
                    }
                }
                None => {
                    name_error = Some(ValidationError::new(
                        ValidationCode::InvalidName,
                        format!("command '{}' is not defined", qname),
                    ))
                }
            }
        }

        Self {
            qname,
            params: raw.params,
            raw_bytes: raw.raw_bytes,
            arg,
            unlogged_arg,
            cud: Cud::new(appdef),
            name_error,
        }
    }

    /// Starts an event synchronized from a client. Its identifiers are
    /// already resolved and are kept as given.
    pub fn new_sync(appdef: &Arc<AppDef>, mut raw: RawEventParams, sync: SyncParams) -> Self {
        raw.params.sync = Some(sync);
        Self::new(appdef, raw)
    }

    pub fn qname(&self) -> &QName {
        &self.qname
    }

    pub fn params(&self) -> &EventParams {
        &self.params
    }

    pub fn argument_object(&mut self) -> &mut Object {
        &mut self.arg
    }

    pub fn unlogged_argument_object(&mut self) -> &mut Object {
        &mut self.unlogged_arg
    }

    pub fn cud(&mut self) -> &mut Cud {
        &mut self.cud
    }

    /// Builds and validates the event.
    pub fn build(self) -> Event {
        let Self {
            qname,
            params,
            raw_bytes,
            mut arg,
            mut unlogged_arg,
            mut cud,
            name_error,
        } = self;

        let mut errors = ValidationErrors::new();
        if let Some(err) = name_error {
            errors.push(err);
        }
        // argument nodes must not take a raw id a create already proposes
        let reserved: HashSet<RecordId> = cud
            .creates()
            .iter()
            .map(|rec| rec.id())
            .filter(|id| id.is_raw())
            .collect();
        if let Err(e) = arg.build_reserving(&reserved) {
            errors.add(ValidationCode::InvalidData, format!("argument: {}", e));
        }
        if let Err(e) = unlogged_arg.build_reserving(&reserved) {
            errors.add(ValidationCode::InvalidData, format!("unlogged argument: {}", e));
        }
        if let Err(e) = cud.build() {
            errors.add(ValidationCode::InvalidData, format!("cud: {}", e));
        }
        if errors.is_empty() {
            errors.extend(validate_event(&arg, &cud, params.is_sync()));
        }

        let error = if errors.is_empty() {
            debug!(
                event = %qname,
                partition = params.partition,
                plog_offset = params.plog_offset,
                creates = cud.creates().len(),
                updates = cud.updates().len(),
                "event built"
            );
            None
        } else {
            warn!(
                event = %qname,
                partition = params.partition,
                plog_offset = params.plog_offset,
                errors = %errors,
                "event build failed"
            );
            Some(BuildError::from_validation(errors, raw_bytes.clone()))
        };

        Event::from_parts(qname, params, raw_bytes, arg, unlogged_arg, cud, error)
    }
}
