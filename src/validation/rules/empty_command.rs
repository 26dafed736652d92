//! Rule: Empty Command
//!
//! Warns when a task's command block contains nothing but whitespace.

use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct EmptyCommandRule;

impl ValidationRule for EmptyCommandRule {
    fn id(&self) -> &'static str {
        "empty-command"
    }

    fn description(&self) -> &'static str {
        "Task commands should not be empty"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind == EntityKind::Command
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let empty = model
            .parent(entity)
            .and_then(|task| model.command_data(task))
            .is_some_and(|command| command.text().trim().is_empty());
        if empty {
            vec![Issue::warning(entity, "command is empty", self.id())]
        } else {
            Vec::new()
        }
    }
}
