//! Rule: Invalid Expression
//!
//! Reports an error when expression text cannot be parsed for dependencies.
//! Such an expression has no dependencies at all until it is fixed.

use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct InvalidExpressionRule;

impl ValidationRule for InvalidExpressionRule {
    fn id(&self) -> &'static str {
        "invalid-expression"
    }

    fn description(&self) -> &'static str {
        "Expressions must be syntactically valid"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind.is_expression()
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let Ok(expression) = model.expression_data(entity) else {
            return Vec::new();
        };
        match expression.extract_error() {
            Some(err) => vec![Issue::error(entity, err.to_string(), self.id())],
            None => Vec::new(),
        }
    }
}
