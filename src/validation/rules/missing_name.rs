//! Rule: Missing Name
//!
//! Reports an error when an entity whose kind requires a name has an empty
//! one. Construction already refuses a missing name; an empty string is
//! accepted there and reported here.

use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct MissingNameRule;

impl ValidationRule for MissingNameRule {
    fn id(&self) -> &'static str {
        "missing-name"
    }

    fn description(&self) -> &'static str {
        "Tasks, workflows, structs, calls and parameters must be named"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind.requires_name()
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        match model.name(entity) {
            Some(name) if !name.trim().is_empty() => Vec::new(),
            _ => vec![Issue::error(
                entity,
                format!("{} has no name", entity.kind()),
                self.id(),
            )],
        }
    }
}
