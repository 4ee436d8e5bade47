//! Application definition registry
//!
//! `AppDefBuilder` collects type and command definitions and checks them
//! once; the resulting `AppDef` is immutable and shared behind an `Arc`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::errors::{AppDefError, AppDefResult};
use super::qname::{is_valid_ident, QName};
use super::types::{CommandDef, DataKind, TypeDef, TypeKind, OCCURS_UNBOUNDED};
use super::uniques::validate_uniques;

/// Immutable set of type and command definitions for one application.
#[derive(Debug, Default)]
pub struct AppDef {
    types: HashMap<QName, Arc<TypeDef>>,
    commands: HashMap<QName, CommandDef>,
}

impl AppDef {
    /// Returns a type definition by name.
    pub fn type_def(&self, qname: &QName) -> Option<&Arc<TypeDef>> {
        self.types.get(qname)
    }

    /// Returns a command definition by name.
    pub fn command(&self, qname: &QName) -> Option<&CommandDef> {
        self.commands.get(qname)
    }

    /// Iterates over all type definitions.
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeDef>> {
        self.types.values()
    }

    /// Iterates over all command definitions.
    pub fn commands(&self) -> impl Iterator<Item = &CommandDef> {
        self.commands.values()
    }

    /// Iterates over singleton document types.
    pub fn singletons(&self) -> impl Iterator<Item = &Arc<TypeDef>> {
        self.types.values().filter(|t| t.singleton)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

/// Collects definitions and validates them into an `AppDef`.
#[derive(Debug, Default)]
pub struct AppDefBuilder {
    types: Vec<TypeDef>,
    commands: Vec<CommandDef>,
}

impl AppDefBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, def: TypeDef) -> &mut Self {
        self.types.push(def);
        self
    }

    pub fn add_command(&mut self, def: CommandDef) -> &mut Self {
        self.commands.push(def);
        self
    }

    /// Validates all collected definitions and produces the registry.
    pub fn build(self) -> AppDefResult<AppDef> {
        let mut types: HashMap<QName, Arc<TypeDef>> = HashMap::with_capacity(self.types.len());

        for mut def in self.types {
            if def.qname.is_null() || def.qname.is_sys() {
                return Err(AppDefError::invalid_type(
                    &def.qname,
                    "null and sys names are reserved",
                ));
            }
            if def.kind == TypeKind::Command {
                return Err(AppDefError::invalid_type(
                    &def.qname,
                    "commands are defined with add_command",
                ));
            }
            if types.contains_key(&def.qname) {
                return Err(AppDefError::duplicate_type(&def.qname));
            }
            def.reindex();
            check_own_structure(&def)?;
            validate_uniques(&def)?;
            types.insert(def.qname.clone(), Arc::new(def));
        }

        for def in types.values() {
            check_references(def, &types)?;
        }

        let mut commands = HashMap::with_capacity(self.commands.len() + 1);
        commands.insert(QName::command_cud(), CommandDef::new(QName::command_cud()));

        for cmd in self.commands {
            if cmd.qname.is_null() || cmd.qname.is_sys() {
                return Err(AppDefError::invalid_type(
                    &cmd.qname,
                    "null and sys names are reserved",
                ));
            }
            if commands.contains_key(&cmd.qname) || types.contains_key(&cmd.qname) {
                return Err(AppDefError::duplicate_type(&cmd.qname));
            }
            for param in [&cmd.param, &cmd.unlogged_param].into_iter().flatten() {
                let target = types
                    .get(param)
                    .ok_or_else(|| AppDefError::unknown_type(param, &cmd.qname))?;
                if target.kind != TypeKind::Object {
                    return Err(AppDefError::invalid_type(
                        &cmd.qname,
                        format!("parameter '{}' must be an object", param),
                    ));
                }
            }
            if let Some(result) = &cmd.result {
                if !types.contains_key(result) {
                    return Err(AppDefError::unknown_type(result, &cmd.qname));
                }
            }
            commands.insert(cmd.qname.clone(), cmd);
        }

        Ok(AppDef { types, commands })
    }
}

/// Checks what can be checked without looking at other types.
fn check_own_structure(def: &TypeDef) -> AppDefResult<()> {
    let mut names = HashSet::new();
    for field in &def.fields {
        if !is_valid_ident(&field.name) {
            return Err(AppDefError::invalid_type(
                &def.qname,
                format!("invalid field name '{}'", field.name),
            ));
        }
        if !names.insert(field.name.as_str()) {
            return Err(AppDefError::invalid_type(
                &def.qname,
                format!("field '{}' is defined twice", field.name),
            ));
        }
        if field.max_len.is_some() && !field.kind.is_variable_len() {
            return Err(AppDefError::invalid_type(
                &def.qname,
                format!("field '{}': max_len applies to string and bytes only", field.name),
            ));
        }
        if field.max_len == Some(0) {
            return Err(AppDefError::invalid_type(
                &def.qname,
                format!("field '{}': max_len must be positive", field.name),
            ));
        }
        if !field.refs.is_empty() && field.kind != DataKind::RecordId {
            return Err(AppDefError::invalid_type(
                &def.qname,
                format!("field '{}': refs apply to record_id fields only", field.name),
            ));
        }
    }

    if !def.containers.is_empty() && !def.kind.supports_containers() {
        return Err(AppDefError::invalid_type(
            &def.qname,
            format!("{} types cannot have containers", def.kind.kind_name()),
        ));
    }
    if def.containers.len() > u16::MAX as usize {
        return Err(AppDefError::invalid_type(&def.qname, "too many containers"));
    }

    let mut containers = HashSet::new();
    for cont in &def.containers {
        if !is_valid_ident(&cont.name) {
            return Err(AppDefError::invalid_type(
                &def.qname,
                format!("invalid container name '{}'", cont.name),
            ));
        }
        if !containers.insert(cont.name.as_str()) {
            return Err(AppDefError::invalid_type(
                &def.qname,
                format!("container '{}' is defined twice", cont.name),
            ));
        }
        if cont.max_occurs == 0 || cont.min_occurs > cont.max_occurs {
            return Err(AppDefError::invalid_type(
                &def.qname,
                format!(
                    "container '{}': invalid occurs {}..{}",
                    cont.name,
                    cont.min_occurs,
                    if cont.max_occurs == OCCURS_UNBOUNDED {
                        "unbounded".to_string()
                    } else {
                        cont.max_occurs.to_string()
                    }
                ),
            ));
        }
    }

    if def.singleton && def.kind != TypeKind::Document {
        return Err(AppDefError::invalid_type(
            &def.qname,
            "only documents can be singletons",
        ));
    }

    Ok(())
}

/// Checks containers and references against the other registered types.
fn check_references(def: &TypeDef, types: &HashMap<QName, Arc<TypeDef>>) -> AppDefResult<()> {
    for cont in &def.containers {
        let child = types
            .get(&cont.qname)
            .ok_or_else(|| AppDefError::unknown_type(&cont.qname, &def.qname))?;
        let expected = match def.kind {
            TypeKind::Document | TypeKind::Record => TypeKind::Record,
            _ => TypeKind::Element,
        };
        if child.kind != expected {
            return Err(AppDefError::invalid_type(
                &def.qname,
                format!(
                    "container '{}' must hold {} types, '{}' is {}",
                    cont.name,
                    expected.kind_name(),
                    cont.qname,
                    child.kind.kind_name()
                ),
            ));
        }
    }

    for field in &def.fields {
        for target in &field.refs {
            let target_def = types
                .get(target)
                .ok_or_else(|| AppDefError::unknown_type(target, &def.qname))?;
            if !target_def.kind.is_storable() && !target_def.kind.is_argument() {
                return Err(AppDefError::invalid_type(
                    &def.qname,
                    format!("field '{}' cannot reference '{}'", field.name, target),
                ));
            }
        }
    }

    Ok(())
}
