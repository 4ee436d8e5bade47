//! Structural validation of built events
//!
//! Runs only on events whose rows built cleanly. Checks the argument
//! tree against its types, the change-set against identifier rules, and
//! raw references against the raw identifiers the event itself proposes.

use std::collections::{HashMap, HashSet};

use crate::appdef::{QName, TypeDef, TypeKind, OCCURS_UNBOUNDED};
use crate::ids::RecordId;
use crate::records::{Cud, Object};
use crate::row::{FieldValue, Row};

use super::errors::{ValidationCode, ValidationErrors};

/// Validates the argument tree and change-set of one event.
pub(crate) fn validate_event(arg: &Object, cud: &Cud, is_sync: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    validate_argument(arg, &mut errors);
    validate_creates(cud, is_sync, &mut errors);
    validate_updates(cud, &mut errors);

    let raw_ids = collect_raw_ids(arg, cud, &mut errors);
    validate_refs(arg, cud, &raw_ids, &mut errors);
    validate_create_parents(cud, &raw_ids, &mut errors);

    errors
}

fn validate_argument(arg: &Object, errors: &mut ValidationErrors) {
    if arg.qname().is_null() {
        return;
    }
    let Some(def) = arg.type_def() else {
        return;
    };
    if def.kind != TypeKind::Object {
        errors.add(
            ValidationCode::InvalidType,
            format!("argument '{}' must be an object, not {}", def.qname, def.kind.kind_name()),
        );
        return;
    }
    arg.walk(&mut |node| validate_node(node, errors));
}

fn validate_node(node: &Object, errors: &mut ValidationErrors) {
    let Some(def) = node.type_def() else {
        return;
    };
    check_required(node.row(), def, errors);

    for container in &def.containers {
        let count = node.children_in(&container.name).count();
        if count < container.min_occurs as usize {
            errors.add(
                ValidationCode::InvalidOccursMin,
                format!(
                    "'{}' container '{}' has {} children, at least {} required",
                    def.qname, container.name, count, container.min_occurs
                ),
            );
        }
        if container.max_occurs != OCCURS_UNBOUNDED && count > container.max_occurs as usize {
            errors.add(
                ValidationCode::InvalidOccursMax,
                format!(
                    "'{}' container '{}' has {} children, at most {} allowed",
                    def.qname, container.name, count, container.max_occurs
                ),
            );
        }
    }

    for child in node.children() {
        match def.container(child.container()) {
            Some(container) if &container.qname == child.qname() => {}
            _ => {
                errors.add(
                    ValidationCode::InvalidChild,
                    format!(
                        "'{}' has no container '{}' of type '{}'",
                        def.qname,
                        child.container(),
                        child.qname()
                    ),
                );
                continue;
            }
        }
        if let Some(child_def) = child.type_def() {
            if child_def.kind != TypeKind::Element {
                errors.add(
                    ValidationCode::InvalidType,
                    format!(
                        "child '{}' must be an element, not {}",
                        child_def.qname,
                        child_def.kind.kind_name()
                    ),
                );
            }
        }
        if child.parent_id() != node.id() {
            errors.add(
                ValidationCode::InvalidRecordId,
                format!(
                    "element {} of '{}' has parent {}, expected {}",
                    child.id(),
                    child.qname(),
                    child.parent_id(),
                    node.id()
                ),
            );
        }
    }
}

fn check_required(row: &Row, def: &TypeDef, errors: &mut ValidationErrors) {
    for (idx, field) in def.fields.iter().enumerate() {
        if field.required && row.values().get(idx).map_or(true, Option::is_none) {
            errors.add(
                ValidationCode::EmptyData,
                format!("'{}' field '{}' is required", def.qname, field.name),
            );
        }
    }
}

fn storable_def<'a>(row: &'a Row, errors: &mut ValidationErrors) -> Option<&'a TypeDef> {
    let def = row.type_def()?;
    if !def.kind.is_storable() {
        errors.add(
            ValidationCode::InvalidType,
            format!(
                "'{}' is {} and cannot be stored",
                def.qname,
                def.kind.kind_name()
            ),
        );
        return None;
    }
    Some(def)
}

fn validate_creates(cud: &Cud, is_sync: bool, errors: &mut ValidationErrors) {
    let mut singletons: HashSet<&QName> = HashSet::new();
    for create in cud.creates() {
        let Some(def) = storable_def(create.row(), errors) else {
            continue;
        };
        check_required(create.row(), def, errors);

        let id = create.id();
        let id_ok = if is_sync {
            !id.is_null() && !id.is_raw()
        } else {
            id.is_raw()
        };
        if !id_ok {
            let expected = if is_sync { "a storage" } else { "a raw" };
            errors.add(
                ValidationCode::InvalidRecordId,
                format!("new '{}' has id {}, expected {} id", def.qname, id, expected),
            );
        }

        if def.singleton && !singletons.insert(&def.qname) {
            errors.add(
                ValidationCode::UniqueViolation,
                format!("singleton '{}' is created more than once", def.qname),
            );
        }
    }
}

fn validate_updates(cud: &Cud, errors: &mut ValidationErrors) {
    for update in cud.updates() {
        if storable_def(update.changes(), errors).is_none() {
            continue;
        }
        if update.id().is_raw() || update.id().is_null() {
            errors.add(
                ValidationCode::InvalidRecordId,
                format!("update of '{}' names id {}", update.qname(), update.id()),
            );
        }
    }
}

/// Raw ids proposed by the event and the types they were proposed for.
fn collect_raw_ids(
    arg: &Object,
    cud: &Cud,
    errors: &mut ValidationErrors,
) -> HashMap<RecordId, QName> {
    let mut ids = HashMap::new();
    let mut propose = |id: RecordId, qname: &QName, errors: &mut ValidationErrors| {
        if !id.is_raw() {
            return;
        }
        if ids.insert(id, qname.clone()).is_some() {
            errors.add(
                ValidationCode::InvalidRecordId,
                format!("raw id {} is used more than once", id),
            );
        }
    };

    arg.walk(&mut |node| propose(node.id(), node.qname(), errors));
    for create in cud.creates() {
        propose(create.id(), create.qname(), errors);
    }
    ids
}

fn check_ref_fields(row: &Row, raw_ids: &HashMap<RecordId, QName>, errors: &mut ValidationErrors) {
    for (_, field, value) in row.fields() {
        let FieldValue::RecordId(target) = value else {
            continue;
        };
        if !target.is_raw() {
            continue;
        }
        match raw_ids.get(target) {
            Some(qname) if field.refs.is_empty() || field.refs.contains(qname) => {}
            Some(qname) => errors.add(
                ValidationCode::InvalidRefRecordId,
                format!(
                    "'{}' field '{}' refers to {} of type '{}', which it does not allow",
                    row.qname(),
                    field.name,
                    target,
                    qname
                ),
            ),
            None => errors.add(
                ValidationCode::InvalidRefRecordId,
                format!(
                    "'{}' field '{}' refers to unknown raw id {}",
                    row.qname(),
                    field.name,
                    target
                ),
            ),
        }
    }
}

fn validate_refs(
    arg: &Object,
    cud: &Cud,
    raw_ids: &HashMap<RecordId, QName>,
    errors: &mut ValidationErrors,
) {
    arg.walk(&mut |node| check_ref_fields(node.row(), raw_ids, errors));
    for create in cud.creates() {
        check_ref_fields(create.row(), raw_ids, errors);
    }
    for update in cud.updates() {
        check_ref_fields(update.changes(), raw_ids, errors);
    }
}

/// A new record with a raw parent must be placed in a container of a
/// record created by the same event.
fn validate_create_parents(
    cud: &Cud,
    raw_ids: &HashMap<RecordId, QName>,
    errors: &mut ValidationErrors,
) {
    let created: HashMap<RecordId, &Row> = cud
        .creates()
        .iter()
        .filter(|c| c.id().is_raw())
        .map(|c| (c.id(), c.row()))
        .collect();

    for create in cud.creates() {
        let parent_id = create.parent_id();
        if !parent_id.is_raw() {
            continue;
        }
        let Some(parent) = created.get(&parent_id) else {
            let reason = if raw_ids.contains_key(&parent_id) {
                "is not a new record"
            } else {
                "is unknown"
            };
            errors.add(
                ValidationCode::InvalidRefRecordId,
                format!("parent {} of new '{}' {}", parent_id, create.qname(), reason),
            );
            continue;
        };
        let fits = parent
            .type_def()
            .and_then(|def| def.container(create.container()))
            .map_or(false, |c| &c.qname == create.qname());
        if !fits {
            errors.add(
                ValidationCode::InvalidChild,
                format!(
                    "'{}' has no container '{}' of type '{}'",
                    parent.qname(),
                    create.container(),
                    create.qname()
                ),
            );
        }
    }
}
