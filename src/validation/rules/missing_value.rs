//! Rule: Missing Value
//!
//! Reports an error when an expression that must be computed has no value:
//! declarations, executable outputs, scatter collections, and call inputs
//! whose callee input is required (neither optional nor defaulted).

use crate::model::{EntityId, EntityKind, Model, ParameterKind};

use super::super::{Issue, ValidationRule};

pub struct MissingValueRule;

impl MissingValueRule {
    fn required_call_input(model: &Model, entity: EntityId) -> bool {
        let Ok(parameter) = model.parameter(entity) else {
            return false;
        };
        let Some(mirror) = parameter.mirror() else {
            return false;
        };
        let optional = model
            .parameter_type(mirror)
            .is_some_and(|ty| ty.is_optional());
        !optional && !model.has_value(mirror)
    }
}

impl ValidationRule for MissingValueRule {
    fn id(&self) -> &'static str {
        "missing-value"
    }

    fn description(&self) -> &'static str {
        "Declarations, outputs, scatter collections and required call inputs need a value"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        matches!(
            kind.parameter_kind(),
            Some(
                ParameterKind::Declaration
                    | ParameterKind::Output
                    | ParameterKind::Input
                    | ParameterKind::ScatterIterator
            )
        )
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        if model.has_value(entity) {
            return Vec::new();
        }
        let in_call = model
            .parent(entity)
            .is_some_and(|parent| parent.kind() == EntityKind::Call);
        let name = model.name(entity).unwrap_or_default();

        let message = match entity.kind().parameter_kind() {
            Some(ParameterKind::Declaration) => format!("declaration '{name}' has no value"),
            Some(ParameterKind::Output) if !in_call => format!("output '{name}' has no value"),
            Some(ParameterKind::ScatterIterator) => {
                format!("scatter over '{name}' has no collection")
            }
            Some(ParameterKind::Input) if in_call && Self::required_call_input(model, entity) => {
                let call = model
                    .parent(entity)
                    .map(|call| model.call_reference_name(call))
                    .unwrap_or_default();
                format!("required input '{name}' of call '{call}' has no value")
            }
            _ => return Vec::new(),
        };
        vec![Issue::error(entity, message, self.id())]
    }
}
