//! Rule: Unknown Identifier
//!
//! Reports an error for every identifier an expression mentions that does
//! not resolve to anything in scope.
//!
//! # Examples
//!
//! ```wdl
//! workflow wf {
//!     # Error: 'missing' is not declared anywhere visible
//!     Int x = missing + 1
//! }
//! ```
//!
//! Identifiers left dangling by a rename are reported here too (see
//! `ambiguous_reference.rs` for the accompanying warning).

use crate::expression::DependencyProblem;
use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct UnknownIdentifierRule;

impl ValidationRule for UnknownIdentifierRule {
    fn id(&self) -> &'static str {
        "unknown-identifier"
    }

    fn description(&self) -> &'static str {
        "Identifiers must resolve to a value in scope"
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
            .filter(|dependency| {
                matches!(
                    dependency.problem,
                    Some(DependencyProblem::Unresolved | DependencyProblem::Ambiguous)
                )
            })
            .map(|dependency| {
                Issue::error(
                    entity,
                    format!("unknown identifier '{}'", dependency.identifier),
                    self.id(),
                )
            })
            .collect()
    }
}
