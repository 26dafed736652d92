//! Rule: Missing Type
//!
//! Reports an error when a parameter has no declared type. Scatter iterators
//! derive their type and call parameters mirror their callee, so neither is
//! checked.

use crate::model::{EntityId, EntityKind, Model, ParameterKind};

use super::super::{Issue, ValidationRule};

pub struct MissingTypeRule;

impl ValidationRule for MissingTypeRule {
    fn id(&self) -> &'static str {
        "missing-type"
    }

    fn description(&self) -> &'static str {
        "Parameters must declare a type"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        matches!(
            kind.parameter_kind(),
            Some(kind) if kind != ParameterKind::ScatterIterator
        )
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        if model
            .parent(entity)
            .is_some_and(|parent| parent.kind() == EntityKind::Call)
        {
            return Vec::new();
        }
        if model.parameter_type(entity).is_some() {
            return Vec::new();
        }
        vec![Issue::error(
            entity,
            format!(
                "{} '{}' has no type",
                entity.kind(),
                model.name(entity).unwrap_or_default()
            ),
            self.id(),
        )]
    }
}
