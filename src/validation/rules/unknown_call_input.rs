//! Rule: Unknown Call Input
//!
//! Reports an error when a call supplies a value for an input its target
//! does not declare (for example after the callee's input was removed).

use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct UnknownCallInputRule;

impl ValidationRule for UnknownCallInputRule {
    fn id(&self) -> &'static str {
        "unknown-call-input"
    }

    fn description(&self) -> &'static str {
        "Call inputs must exist on the call target"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind == EntityKind::INPUT
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let Some(call) = model
            .parent(entity)
            .filter(|parent| parent.kind() == EntityKind::Call)
        else {
            return Vec::new();
        };
        // Without a callee there is nothing to compare against
        if model.callee(call).is_none() {
            return Vec::new();
        }
        let mirrored = model
            .parameter(entity)
            .is_ok_and(|parameter| parameter.mirror().is_some());
        if mirrored || !model.has_value(entity) {
            return Vec::new();
        }
        vec![Issue::error(
            entity,
            format!(
                "'{}' has no input named '{}'",
                model.name(call).unwrap_or_default(),
                model.name(entity).unwrap_or_default()
            ),
            self.id(),
        )]
    }
}
