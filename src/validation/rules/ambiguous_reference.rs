//! Rule: Ambiguous Reference
//!
//! Warns when a rename made an identifier resolve to a different entity than
//! the one it was bound to. The dependency is left unresolved rather than
//! silently rebound.

use crate::expression::DependencyProblem;
use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct AmbiguousReferenceRule;

impl ValidationRule for AmbiguousReferenceRule {
    fn id(&self) -> &'static str {
        "ambiguous-reference"
    }

    fn description(&self) -> &'static str {
        "Renamed references must still point at the renamed entity"
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
            .filter(|d| d.problem == Some(DependencyProblem::Ambiguous))
            .map(|d| {
                Issue::warning(
                    entity,
                    format!("'{}' became ambiguous after a rename", d.identifier),
                    self.id(),
                )
            })
            .collect()
    }
}
