//! Rule: Unknown Struct
//!
//! Reports an error when a parameter's type names a struct that is neither
//! defined in the document nor imported.

use crate::model::{EntityId, EntityKind, Model};
use crate::types::{Type, TypeKind};

use super::super::{Issue, ValidationRule};

pub struct UnknownStructRule;

fn struct_names<'a>(ty: &'a Type, names: &mut Vec<&'a str>) {
    match ty.kind() {
        TypeKind::Struct(name) => names.push(name),
        TypeKind::Array { item, .. } => struct_names(item, names),
        TypeKind::Pair(left, right) | TypeKind::Map(left, right) => {
            struct_names(left, names);
            struct_names(right, names);
        }
        TypeKind::Primitive(_) | TypeKind::Object => {}
    }
}

impl ValidationRule for UnknownStructRule {
    fn id(&self) -> &'static str {
        "unknown-struct"
    }

    fn description(&self) -> &'static str {
        "Struct types must be defined or imported"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind.parameter_kind().is_some()
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let Some(ty) = model.parameter_type(entity) else {
            return Vec::new();
        };
        let Some(document) = model.document_of(entity) else {
            return Vec::new();
        };

        let mut names = Vec::new();
        struct_names(&ty, &mut names);
        if names.is_empty() {
            return Vec::new();
        }

        names
            .into_iter()
            .filter(|name| model.find_struct(document, name).is_none())
            .map(|name| Issue::error(entity, format!("unknown struct '{name}'"), self.id()))
            .collect()
    }
}
