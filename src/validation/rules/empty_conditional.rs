//! Rule: Empty Conditional
//!
//! Reports an error when a conditional has no condition expression, or the
//! expression has no value.

use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct EmptyConditionalRule;

impl ValidationRule for EmptyConditionalRule {
    fn id(&self) -> &'static str {
        "empty-conditional"
    }

    fn description(&self) -> &'static str {
        "Conditionals need a condition"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind == EntityKind::Conditional
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let has_condition = model
            .condition(entity)
            .is_some_and(|condition| model.has_value(condition));
        if has_condition {
            return Vec::new();
        }
        vec![Issue::error(entity, "conditional has no condition", self.id())]
    }
}
