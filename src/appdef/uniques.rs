//! Unique field group validation
//!
//! Checked once while the application definition is prepared:
//! - the type kind supports uniques
//! - no group is empty
//! - no field repeats within a group
//! - every field exists and is required
//! - at most one string/bytes field per group
//! - no two groups share the same field set

use std::collections::BTreeSet;

use super::errors::{AppDefError, AppDefResult};
use super::types::TypeDef;

/// Validates the unique field groups declared by a type.
pub fn validate_uniques(def: &TypeDef) -> AppDefResult<()> {
    if def.uniques.is_empty() {
        return Ok(());
    }

    if !def.kind.supports_uniques() {
        return Err(AppDefError::invalid_unique(
            &def.qname,
            &def.uniques[0].name,
            format!("{} types do not support uniques", def.kind.kind_name()),
        ));
    }

    let mut seen_sets: Vec<(&str, BTreeSet<&str>)> = Vec::with_capacity(def.uniques.len());

    for unique in &def.uniques {
        if unique.fields.is_empty() {
            return Err(AppDefError::invalid_unique(
                &def.qname,
                &unique.name,
                "field list is empty",
            ));
        }

        let mut names = BTreeSet::new();
        let mut var_len = None;

        for field_name in &unique.fields {
            if !names.insert(field_name.as_str()) {
                return Err(AppDefError::invalid_unique(
                    &def.qname,
                    &unique.name,
                    format!("field '{}' is repeated", field_name),
                ));
            }

            let field = def.field(field_name).ok_or_else(|| {
                AppDefError::invalid_unique(
                    &def.qname,
                    &unique.name,
                    format!("field '{}' is not defined", field_name),
                )
            })?;

            if !field.required {
                return Err(AppDefError::invalid_unique(
                    &def.qname,
                    &unique.name,
                    format!("field '{}' must be required", field_name),
                ));
            }

            if field.kind.is_variable_len() {
                if let Some(other) = var_len {
                    return Err(AppDefError::invalid_unique(
                        &def.qname,
                        &unique.name,
                        format!(
                            "fields '{}' and '{}' are both variable-length",
                            other, field_name
                        ),
                    ));
                }
                var_len = Some(field_name.as_str());
            }
        }

        if let Some((other, _)) = seen_sets.iter().find(|(_, set)| *set == names) {
            return Err(AppDefError::invalid_unique(
                &def.qname,
                &unique.name,
                format!("same field set as unique '{}'", other),
            ));
        }
        seen_sets.push((unique.name.as_str(), names));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appdef::errors::AppDefErrorCode;
    use crate::appdef::qname::QName;
    use crate::appdef::types::{DataKind, FieldDef, TypeKind, UniqueDef};

    fn doc() -> TypeDef {
        TypeDef::new(QName::new("test", "Doc"), TypeKind::Document)
            .with_field(FieldDef::required("name", DataKind::String))
            .with_field(FieldDef::required("code", DataKind::Bytes))
            .with_field(FieldDef::required("num", DataKind::Int64))
            .with_field(FieldDef::required("flag", DataKind::Bool))
            .with_field(FieldDef::optional("note", DataKind::String))
    }

    fn assert_invalid(def: &TypeDef, fragment: &str) {
        let err = validate_uniques(def).unwrap_err();
        assert_eq!(err.code(), AppDefErrorCode::AeroAppDefInvalidUnique);
        assert!(
            err.message().contains(fragment),
            "expected '{}' in '{}'",
            fragment,
            err.message()
        );
    }

    #[test]
    fn test_valid_uniques() {
        let def = doc()
            .with_unique(UniqueDef::new("u1", &["name", "num"]))
            .with_unique(UniqueDef::new("u2", &["code", "flag"]));
        assert!(validate_uniques(&def).is_ok());
    }

    #[test]
    fn test_kind_without_uniques() {
        let def = TypeDef::new(QName::new("test", "Obj"), TypeKind::Object)
            .with_field(FieldDef::required("name", DataKind::String))
            .with_unique(UniqueDef::new("u1", &["name"]));
        assert_invalid(&def, "do not support");
    }

    #[test]
    fn test_empty_group() {
        let def = doc().with_unique(UniqueDef::new("u1", &[]));
        assert_invalid(&def, "empty");
    }

    #[test]
    fn test_repeated_field() {
        let def = doc().with_unique(UniqueDef::new("u1", &["num", "num"]));
        assert_invalid(&def, "repeated");
    }

    #[test]
    fn test_unknown_field() {
        let def = doc().with_unique(UniqueDef::new("u1", &["missing"]));
        assert_invalid(&def, "not defined");
    }

    #[test]
    fn test_optional_field() {
        let def = doc().with_unique(UniqueDef::new("u1", &["note"]));
        assert_invalid(&def, "must be required");
    }

    #[test]
    fn test_two_variable_length_fields() {
        let def = doc().with_unique(UniqueDef::new("u1", &["name", "code"]));
        assert_invalid(&def, "variable-length");
    }

    #[test]
    fn test_same_set_in_different_order() {
        let def = doc()
            .with_unique(UniqueDef::new("u1", &["name", "num"]))
            .with_unique(UniqueDef::new("u2", &["num", "name"]));
        assert_invalid(&def, "same field set as unique 'u1'");
    }

    #[test]
    fn test_overlapping_sets_allowed() {
        let def = doc()
            .with_unique(UniqueDef::new("u1", &["name", "num"]))
            .with_unique(UniqueDef::new("u2", &["num"]));
        assert!(validate_uniques(&def).is_ok());
    }
}
