//! Rule: Import Failed
//!
//! Reports an error on an import whose document could not be fetched or
//! parsed.

use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct ImportFailedRule;

impl ValidationRule for ImportFailedRule {
    fn id(&self) -> &'static str {
        "import-failed"
    }

    fn description(&self) -> &'static str {
        "Imported documents must load"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind == EntityKind::Import
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let Ok(import) = model.import(entity) else {
            return Vec::new();
        };
        match import.failure() {
            Some(failure) => vec![Issue::error(
                entity,
                format!("cannot import '{}': {failure}", import.uri()),
                self.id(),
            )],
            None => Vec::new(),
        }
    }
}
