//! Type definitions supplied by the application definition.
//!
//! Supported data kinds:
//! - int32 / int64: signed integers
//! - float32 / float64: IEEE floats
//! - bool
//! - string: UTF-8, bounded length
//! - bytes: raw bytes, bounded length
//! - qname: reference to a qualified name
//! - record_id: reference to a record
//! - record / event: embedded record or event

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::qname::QName;

/// Default maximum length of string and bytes fields.
pub const DEFAULT_FIELD_MAX_LEN: u16 = 255;

/// Container occurrence value meaning "no upper bound".
pub const OCCURS_UNBOUNDED: u16 = u16::MAX;

/// Names of the system fields.
pub const SYS_QNAME: &str = "sys.QName";
pub const SYS_ID: &str = "sys.ID";
pub const SYS_PARENT_ID: &str = "sys.ParentID";
pub const SYS_CONTAINER: &str = "sys.Container";
pub const SYS_IS_ACTIVE: &str = "sys.IsActive";

/// Kind of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    String,
    Bytes,
    QName,
    RecordId,
    Record,
    Event,
}

impl DataKind {
    /// Returns the kind name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            DataKind::Int32 => "int32",
            DataKind::Int64 => "int64",
            DataKind::Float32 => "float32",
            DataKind::Float64 => "float64",
            DataKind::Bool => "bool",
            DataKind::String => "string",
            DataKind::Bytes => "bytes",
            DataKind::QName => "qname",
            DataKind::RecordId => "record_id",
            DataKind::Record => "record",
            DataKind::Event => "event",
        }
    }

    /// Variable-length kinds carry a length-bounded payload.
    pub fn is_variable_len(&self) -> bool {
        matches!(self, DataKind::String | DataKind::Bytes)
    }
}

/// Kind of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Document,
    Record,
    Object,
    Element,
    ViewPartition,
    ViewCluster,
    ViewValue,
    Command,
}

/// Set of system fields a type kind carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysFieldSet {
    pub id: bool,
    pub parent_id: bool,
    pub container: bool,
    pub is_active: bool,
}

impl SysFieldSet {
    const NONE: Self = Self {
        id: false,
        parent_id: false,
        container: false,
        is_active: false,
    };
}

impl TypeKind {
    /// Returns the system fields carried by rows of this kind.
    pub fn sys_fields(&self) -> SysFieldSet {
        match self {
            TypeKind::Document => SysFieldSet {
                id: true,
                is_active: true,
                ..SysFieldSet::NONE
            },
            TypeKind::Record => SysFieldSet {
                id: true,
                parent_id: true,
                container: true,
                is_active: true,
            },
            TypeKind::Object => SysFieldSet {
                id: true,
                ..SysFieldSet::NONE
            },
            TypeKind::Element => SysFieldSet {
                id: true,
                parent_id: true,
                container: true,
                ..SysFieldSet::NONE
            },
            TypeKind::ViewPartition
            | TypeKind::ViewCluster
            | TypeKind::ViewValue
            | TypeKind::Command => SysFieldSet::NONE,
        }
    }

    /// Kinds that may be created or updated through a change-set.
    pub fn is_storable(&self) -> bool {
        matches!(self, TypeKind::Document | TypeKind::Record)
    }

    /// Kinds that may appear in an argument object tree.
    pub fn is_argument(&self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Element)
    }

    /// Kinds that may declare unique field groups.
    pub fn supports_uniques(&self) -> bool {
        matches!(self, TypeKind::Document | TypeKind::Record)
    }

    /// Kinds that may declare containers.
    pub fn supports_containers(&self) -> bool {
        matches!(
            self,
            TypeKind::Document | TypeKind::Record | TypeKind::Object | TypeKind::Element
        )
    }

    /// Returns the kind name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeKind::Document => "document",
            TypeKind::Record => "record",
            TypeKind::Object => "object",
            TypeKind::Element => "element",
            TypeKind::ViewPartition => "view_partition",
            TypeKind::ViewCluster => "view_cluster",
            TypeKind::ViewValue => "view_value",
            TypeKind::Command => "command",
        }
    }
}

/// User field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: DataKind,
    #[serde(default)]
    pub required: bool,
    /// Value must be supplied as a verified token
    #[serde(default)]
    pub verifiable: bool,
    /// Maximum length for string and bytes fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<u16>,
    /// Allowed target types for record_id fields (empty: any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<QName>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: DataKind, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
            verifiable: false,
            max_len: None,
            refs: Vec::new(),
        }
    }

    /// Create a required field
    pub fn required(name: impl Into<String>, kind: DataKind) -> Self {
        Self::new(name, kind, true)
    }

    /// Create an optional field
    pub fn optional(name: impl Into<String>, kind: DataKind) -> Self {
        Self::new(name, kind, false)
    }

    /// Create a record_id field referencing the given types
    pub fn reference(name: impl Into<String>, required: bool, refs: Vec<QName>) -> Self {
        Self {
            refs,
            ..Self::new(name, DataKind::RecordId, required)
        }
    }

    pub fn with_max_len(mut self, max_len: u16) -> Self {
        self.max_len = Some(max_len);
        self
    }

    pub fn verified(mut self) -> Self {
        self.verifiable = true;
        self
    }

    /// Effective maximum length of string and bytes values.
    pub fn effective_max_len(&self) -> usize {
        self.max_len.unwrap_or(DEFAULT_FIELD_MAX_LEN) as usize
    }
}

/// Container definition: a named slot for child objects or records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDef {
    pub name: String,
    #[serde(rename = "type")]
    pub qname: QName,
    #[serde(default)]
    pub min_occurs: u16,
    #[serde(default = "default_max_occurs")]
    pub max_occurs: u16,
}

fn default_max_occurs() -> u16 {
    1
}

impl ContainerDef {
    pub fn new(name: impl Into<String>, qname: QName, min_occurs: u16, max_occurs: u16) -> Self {
        Self {
            name: name.into(),
            qname,
            min_occurs,
            max_occurs,
        }
    }
}

/// A group of fields whose combined value must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueDef {
    pub name: String,
    pub fields: Vec<String>,
}

impl UniqueDef {
    pub fn new(name: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Complete type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub qname: QName,
    pub kind: TypeKind,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub containers: Vec<ContainerDef>,
    #[serde(default)]
    pub uniques: Vec<UniqueDef>,
    /// Document with exactly one instance per workspace
    #[serde(default)]
    pub singleton: bool,
    #[serde(skip)]
    field_index: HashMap<String, usize>,
}

impl TypeDef {
    /// Create a new type definition with no fields
    pub fn new(qname: QName, kind: TypeKind) -> Self {
        Self {
            qname,
            kind,
            fields: Vec::new(),
            containers: Vec::new(),
            uniques: Vec::new(),
            singleton: false,
            field_index: HashMap::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self.reindex();
        self
    }

    pub fn with_container(mut self, container: ContainerDef) -> Self {
        self.containers.push(container);
        self
    }

    pub fn with_unique(mut self, unique: UniqueDef) -> Self {
        self.uniques.push(unique);
        self
    }

    pub fn as_singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    /// Rebuilds the name index after deserialization or mutation.
    pub(crate) fn reindex(&mut self) {
        self.field_index = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
    }

    /// Returns the index of a user field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.field_index.get(name).copied()
    }

    /// Returns a user field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    /// Returns a container definition by name.
    pub fn container(&self, name: &str) -> Option<&ContainerDef> {
        self.containers.iter().find(|c| c.name == name)
    }

    pub fn sys_fields(&self) -> SysFieldSet {
        self.kind.sys_fields()
    }
}

/// Command definition: names the argument and result types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDef {
    pub qname: QName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<QName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlogged_param: Option<QName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<QName>,
}

impl CommandDef {
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            param: None,
            unlogged_param: None,
            result: None,
        }
    }

    pub fn with_param(mut self, param: QName) -> Self {
        self.param = Some(param);
        self
    }

    pub fn with_unlogged_param(mut self, param: QName) -> Self {
        self.unlogged_param = Some(param);
        self
    }

    pub fn with_result(mut self, result: QName) -> Self {
        self.result = Some(result);
        self
    }
}
