//! Application definition subsystem
//!
//! Supplies everything the record core needs to know about types:
//! field catalogs, container catalogs, type kinds and commands.
//!
//! # Design Principles
//!
//! - Definitions are checked once, at preparation time
//! - The prepared `AppDef` is immutable and shared
//! - Unique field groups are validated before any data is written

mod errors;
mod loader;
mod qname;
mod registry;
mod types;
mod uniques;

pub use errors::{AppDefError, AppDefErrorCode, AppDefResult, Severity};
pub use loader::{AppDefLoader, DefinitionFile};
pub use qname::{is_valid_ident, QName, SYS_PACKAGE};
pub use registry::{AppDef, AppDefBuilder};
pub use types::{
    CommandDef, ContainerDef, DataKind, FieldDef, SysFieldSet, TypeDef, TypeKind, UniqueDef,
    DEFAULT_FIELD_MAX_LEN, OCCURS_UNBOUNDED, SYS_CONTAINER, SYS_ID, SYS_IS_ACTIVE, SYS_PARENT_ID,
    SYS_QNAME,
};
pub use uniques::validate_uniques;
