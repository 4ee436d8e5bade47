//! Object trees
//!
//! An object is a row plus an ordered list of owned children, each tagged
//! with the container it occupies in its parent. Elements are objects of
//! the element kind; they carry parent and container system fields.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::appdef::{AppDef, QName, SYS_ID};
use crate::ids::RecordId;
use crate::row::{FieldError, FieldErrors, Row};

/// A row with owned, container-tagged children.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    row: Row,
    children: Vec<Object>,
}

impl Object {
    pub fn new(appdef: &Arc<AppDef>, qname: &QName) -> Self {
        Self {
            row: Row::new(appdef, qname),
            children: Vec::new(),
        }
    }

    pub fn null(appdef: &Arc<AppDef>) -> Self {
        Self {
            row: Row::null(appdef),
            children: Vec::new(),
        }
    }

    pub(crate) fn from_row(row: Row) -> Self {
        Self {
            row,
            children: Vec::new(),
        }
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn children(&self) -> &[Object] {
        &self.children
    }

    /// Children placed in the named container.
    pub fn children_in<'a>(&'a self, container: &'a str) -> impl Iterator<Item = &'a Object> {
        self.children
            .iter()
            .filter(move |c| c.row.container() == container)
    }

    pub(crate) fn push_child(&mut self, child: Object) {
        self.children.push(child);
    }

    /// Appends a child to the named container and returns it for writing.
    ///
    /// An unknown container is recorded as an error on this object; the
    /// returned child is then null-typed.
    pub fn add_child(&mut self, container: &str) -> &mut Object {
        let child_type = self
            .row
            .type_def()
            .and_then(|def| def.container(container))
            .map(|c| c.qname.clone());

        let child = match child_type {
            Some(qname) => {
                let mut child = Object::new(self.row.appdef(), &qname);
                child.row.set_container(container);
                child
            }
            None => {
                let type_name = self.row.qname().clone();
                self.row.push_error(FieldError::UnknownContainer {
                    type_name,
                    container: container.to_string(),
                });
                Object::null(self.row.appdef())
            }
        };
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Visits this object and all descendants, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Object)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub(crate) fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut Object)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }

    /// True if any node's type declares a verifiable field.
    pub fn has_verifiable_fields(&self) -> bool {
        let mut found = false;
        self.walk(&mut |node| {
            if let Some(def) = node.row.type_def() {
                found |= def.fields.iter().any(|f| f.verifiable);
            }
        });
        found
    }

    /// Builds every node of the tree.
    ///
    /// Nodes without an identifier get a fresh raw identifier; children
    /// without a parent identifier get their parent's.
    pub fn build(&mut self) -> Result<(), FieldErrors> {
        self.build_reserving(&HashSet::new())
    }

    /// Same as [`Object::build`], but fresh raw identifiers also skip
    /// `reserved`.
    pub fn build_reserving(&mut self, reserved: &HashSet<RecordId>) -> Result<(), FieldErrors> {
        let mut used = reserved.clone();
        self.walk(&mut |node| {
            if node.row.id().is_raw() {
                used.insert(node.row.id());
            }
        });

        let mut errors = FieldErrors::new();
        let mut next = RecordId::MIN_RAW.value();
        self.walk_mut(&mut |node| {
            let carries_id = node.row.type_def().map_or(false, |d| d.sys_fields().id);
            if !carries_id || !node.row.id().is_null() {
                return;
            }
            while used.contains(&RecordId::new(next)) {
                next += 1;
            }
            let id = RecordId::new(next);
            if !id.is_raw() {
                errors.push(FieldError::InvalidValue {
                    field: SYS_ID.to_string(),
                    reason: "raw id space exhausted".to_string(),
                });
                return;
            }
            node.row.set_id(id);
            used.insert(id);
        });

        self.build_node(&mut errors);
        errors.into_result()
    }

    fn build_node(&mut self, errors: &mut FieldErrors) {
        if self.children.len() > u16::MAX as usize {
            errors.push(FieldError::TooManyChildren {
                type_name: self.row.qname().clone(),
                count: self.children.len(),
            });
        }

        let parent_id = self.row.id();
        for child in &mut self.children {
            let carries_parent = child
                .row
                .type_def()
                .map_or(false, |d| d.sys_fields().parent_id);
            if carries_parent && child.row.parent_id().is_null() {
                child.row.set_parent_id(parent_id);
            }
        }

        if let Err(e) = self.row.build() {
            errors.extend(e);
        }
        for child in &mut self.children {
            child.build_node(errors);
        }
    }

    /// Replaces user values of every node: strings with `token`, other
    /// kinds with their zero value. System fields are kept.
    pub fn mask_values(&mut self, token: &str) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        self.walk_mut(&mut |node| {
            node.row.mask_values(token);
            if let Err(e) = node.row.build() {
                errors.extend(e);
            }
        });
        errors.into_result()
    }

    /// Fills the tree from a JSON object. Members named after a container
    /// hold a child object or an array of child objects.
    pub fn fill_from_json(&mut self, object: &Map<String, Value>) {
        for (name, value) in object {
            let is_container = self
                .row
                .type_def()
                .map_or(false, |def| def.container(name).is_some());
            if !is_container {
                self.row.put_json_value(name, value);
                continue;
            }
            match value {
                Value::Array(items) => {
                    for item in items {
                        self.fill_child(name, item);
                    }
                }
                other => self.fill_child(name, other),
            }
        }
    }

    fn fill_child(&mut self, container: &str, value: &Value) {
        match value.as_object() {
            Some(child_json) => self.add_child(container).fill_from_json(child_json),
            None => self.row.push_error(FieldError::InvalidValue {
                field: container.to_string(),
                reason: format!("expected object, got {}", value),
            }),
        }
    }
}

impl Deref for Object {
    type Target = Row;

    fn deref(&self) -> &Row {
        &self.row
    }
}

impl DerefMut for Object {
    fn deref_mut(&mut self) -> &mut Row {
        &mut self.row
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::appdef::{
        AppDefBuilder, ContainerDef, DataKind, FieldDef, TypeDef, TypeKind, OCCURS_UNBOUNDED,
    };

    fn qn(entity: &str) -> QName {
        QName::new("test", entity)
    }

    fn appdef() -> Arc<AppDef> {
        let mut b = AppDefBuilder::new();
        b.add_type(
            TypeDef::new(qn("Params"), TypeKind::Object)
                .with_field(FieldDef::optional("text", DataKind::String))
                .with_field(FieldDef::optional("count", DataKind::Int32))
                .with_container(ContainerDef::new("items", qn("Item"), 0, OCCURS_UNBOUNDED)),
        );
        b.add_type(
            TypeDef::new(qn("Item"), TypeKind::Element)
                .with_field(FieldDef::optional("label", DataKind::String))
                .with_container(ContainerDef::new("tags", qn("Tag"), 0, OCCURS_UNBOUNDED)),
        );
        b.add_type(
            TypeDef::new(qn("Tag"), TypeKind::Element)
                .with_field(FieldDef::optional("value", DataKind::String)),
        );
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn test_build_assigns_ids_and_parents() {
        let app = appdef();
        let mut obj = Object::new(&app, &qn("Params"));
        obj.put_string("text", "hello");
        {
            let item = obj.add_child("items");
            item.put_string("label", "a");
            item.add_child("tags").put_string("value", "x");
        }
        obj.add_child("items").put_string("label", "b");
        obj.build().unwrap();

        assert_eq!(obj.id(), RecordId::new(1));
        let items: Vec<&Object> = obj.children_in("items").collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].parent_id(), obj.id());
        assert_eq!(items[0].container(), "items");
        assert_eq!(items[0].children()[0].parent_id(), items[0].id());

        let mut ids = HashSet::new();
        obj.walk(&mut |n| {
            assert!(n.id().is_raw());
            assert!(ids.insert(n.id()));
        });
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_build_keeps_explicit_ids() {
        let app = appdef();
        let mut obj = Object::new(&app, &qn("Params"));
        obj.put_record_id(SYS_ID, RecordId::new(1));
        obj.add_child("items");
        obj.build().unwrap();
        assert_eq!(obj.id(), RecordId::new(1));
        assert_eq!(obj.children()[0].id(), RecordId::new(2));
    }

    #[test]
    fn test_build_skips_reserved_ids() {
        let app = appdef();
        let mut obj = Object::new(&app, &qn("Params"));
        obj.add_child("items");
        let reserved: HashSet<RecordId> = [RecordId::new(1), RecordId::new(3)].into_iter().collect();
        obj.build_reserving(&reserved).unwrap();
        assert_eq!(obj.id(), RecordId::new(2));
        assert_eq!(obj.children()[0].id(), RecordId::new(4));
    }

    #[test]
    fn test_too_many_children() {
        let app = appdef();
        let mut obj = Object::new(&app, &qn("Params"));
        for _ in 0..=u16::MAX as usize {
            obj.add_child("items");
        }
        let errors = obj.build().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, FieldError::TooManyChildren { count: 65_536, .. })));
    }

    #[test]
    fn test_unknown_container_fails_build() {
        let app = appdef();
        let mut obj = Object::new(&app, &qn("Params"));
        obj.add_child("nope");
        let errors = obj.build().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, FieldError::UnknownContainer { container, .. } if container == "nope")));
    }

    #[test]
    fn test_child_errors_are_joined() {
        let app = appdef();
        let mut obj = Object::new(&app, &qn("Params"));
        obj.put_int32("text", 1);
        obj.add_child("items").put_int32("label", 2);
        assert_eq!(obj.build().unwrap_err().len(), 2);
    }

    #[test]
    fn test_mask_values_recursive() {
        let app = appdef();
        let mut obj = Object::new(&app, &qn("Params"));
        obj.put_string("text", "secret");
        obj.put_int32("count", 3);
        obj.add_child("items").put_string("label", "private");
        obj.build().unwrap();

        obj.mask_values("*").unwrap();
        assert_eq!(obj.as_string("text"), "*");
        assert_eq!(obj.as_int32("count"), 0);
        assert_eq!(obj.children()[0].as_string("label"), "*");
        assert_eq!(obj.children()[0].parent_id(), obj.id());
    }

    #[test]
    fn test_fill_from_json() {
        let app = appdef();
        let mut obj = Object::new(&app, &qn("Params"));
        let data = json!({
            "text": "root",
            "items": [
                {"label": "a", "tags": [{"value": "t1"}, {"value": "t2"}]},
                {"label": "b"}
            ]
        });
        obj.fill_from_json(data.as_object().unwrap());
        obj.build().unwrap();

        assert_eq!(obj.as_string("text"), "root");
        assert_eq!(obj.children().len(), 2);
        assert_eq!(obj.children()[0].children().len(), 2);
        assert_eq!(obj.children()[0].children()[1].as_string("value"), "t2");
    }

    #[test]
    fn test_fill_from_json_rejects_scalar_child() {
        let app = appdef();
        let mut obj = Object::new(&app, &qn("Params"));
        obj.fill_from_json(json!({"items": [1]}).as_object().unwrap());
        assert!(obj.build().is_err());
    }
}
