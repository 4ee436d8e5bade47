//! Raw identifier regeneration
//!
//! Before an event is written to the partition log, every raw id it
//! proposes is replaced by a storage id:
//! - argument nodes, parents first, then creates in order
//! - singleton creates take the id assigned to their type
//! - every record id value equal to a replaced raw id is rewritten
//!
//! Synchronized events already carry storage ids; they only advance the
//! generator.

use std::collections::HashMap;

use tracing::debug;

use crate::ids::{IdError, IdGenerator, IdResult, RecordId};
use crate::names::SingletonTable;

use super::event::Event;

/// Replaces raw ids of a valid event. Returns the number replaced.
pub(crate) fn regenerate_ids(
    event: &mut Event,
    singletons: &SingletonTable,
    gen: &mut dyn IdGenerator,
) -> IdResult<usize> {
    if !event.is_valid() {
        return Ok(0);
    }

    if event.params().is_sync() {
        observe_sync_ids(event, gen);
        return Ok(0);
    }

    let mut map: HashMap<RecordId, RecordId> = HashMap::new();

    let mut arg_ids = Vec::new();
    event.argument_object().walk(&mut |node| {
        if node.id().is_raw() {
            if let Some(def) = node.type_def() {
                arg_ids.push((node.id(), def.clone()));
            }
        }
    });
    for (raw, def) in arg_ids {
        let id = gen.next_id(raw, &def)?;
        map.insert(raw, id);
    }

    for create in event.cud().creates() {
        let raw = create.id();
        if !raw.is_raw() {
            continue;
        }
        let Some(def) = create.type_def() else {
            continue;
        };
        let id = if def.singleton {
            singletons
                .id(&def.qname)
                .map_err(|_| IdError::UnknownSingleton(def.qname.to_string()))?
        } else {
            gen.next_id(raw, def)?
        };
        map.insert(raw, id);
    }

    if map.is_empty() {
        return Ok(0);
    }
    let lookup = |id: RecordId| map.get(&id).copied();

    event.argument_object_mut().walk_mut(&mut |node| {
        remap_sys(node, &lookup);
        node.remap_record_ids(lookup);
        node.rebuild();
    });

    let cud = event.cud_mut();
    for create in cud.creates_mut() {
        remap_sys(create, &lookup);
        create.remap_record_ids(lookup);
        create.rebuild();
    }
    for update in cud.updates_mut() {
        update.remap_record_ids(lookup);
    }

    debug!(
        event = %event.qname(),
        partition = event.partition(),
        plog_offset = event.plog_offset(),
        regenerated = map.len(),
        "raw ids regenerated"
    );
    Ok(map.len())
}

fn remap_sys(row: &mut crate::row::Row, lookup: &impl Fn(RecordId) -> Option<RecordId>) {
    if let Some(id) = lookup(row.id()) {
        row.set_id(id);
    }
    if let Some(parent) = lookup(row.parent_id()) {
        row.set_parent_id(parent);
    }
}

fn observe_sync_ids(event: &Event, gen: &mut dyn IdGenerator) {
    event.argument_object().walk(&mut |node| {
        if let Some(def) = node.type_def() {
            if !node.id().is_null() {
                gen.update_on_sync(node.id(), def);
            }
        }
    });
    for create in event.cud().creates() {
        if let Some(def) = create.type_def() {
            gen.update_on_sync(create.id(), def);
        }
    }
}
