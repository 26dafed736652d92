//! Rule: Type Mismatch
//!
//! Reports an error when an expression consisting of a single reference
//! resolves to a value whose effective type does not fit the target.
//!
//! # Examples
//!
//! ```wdl
//! workflow wf {
//!     input { Array[Int] xs }
//!     # Error: Array[Int] is not compatible with Int
//!     Int x = xs
//!     scatter (i in xs) {
//!         # OK: seen from inside the scatter
//!         Int y = i
//!     }
//! }
//! ```
//!
//! Composite expressions are not evaluated, so they are never reported.

use crate::expression::BindingError;
use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct TypeMismatchRule;

impl ValidationRule for TypeMismatchRule {
    fn id(&self) -> &'static str {
        "type-mismatch"
    }

    fn description(&self) -> &'static str {
        "Referenced values must have a compatible type"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind.is_expression()
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let Some(dependency) = model.sole_dependency(entity) else {
            return Vec::new();
        };
        let Some(source) = dependency.source else {
            return Vec::new();
        };
        let Some(member) = model.match_identifier(source, &dependency.identifier, entity) else {
            return Vec::new();
        };
        let Some(ty) = member.known() else {
            return Vec::new();
        };

        match model.check_types(source, entity, Some(ty)) {
            Err(err @ BindingError::TypeMismatch { .. }) => {
                vec![Issue::error(entity, err.to_string(), self.id())]
            }
            _ => Vec::new(),
        }
    }
}
