//! Rule: Illegal Reference
//!
//! Reports an error when an identifier only matches entities it may not be
//! bound to, such as a call's own output used in one of its inputs.

use crate::expression::DependencyProblem;
use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct IllegalReferenceRule;

impl ValidationRule for IllegalReferenceRule {
    fn id(&self) -> &'static str {
        "illegal-reference"
    }

    fn description(&self) -> &'static str {
        "References must respect binding scope rules"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind.is_expression()
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let Ok(dependencies) = model.dependencies(entity) else {
            return Vec::new();
        };
        dependencies
            .iter()
            .filter_map(|dependency| match &dependency.problem {
                Some(DependencyProblem::Illegal(err)) => Some(Issue::error(
                    entity,
                    format!("'{}' cannot be referenced here: {err}", dependency.identifier),
                    self.id(),
                )),
                _ => None,
            })
            .collect()
    }
}
