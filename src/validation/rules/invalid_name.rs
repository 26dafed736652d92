//! Rule: Invalid Name
//!
//! Reports an error when a name is not a WDL identifier or is a reserved
//! word.
//!
//! # Examples
//!
//! ```wdl
//! # Error: 'input' is reserved
//! Int input = 1
//!
//! # Error: not an identifier
//! call my-task
//! ```
//!
//! Call names are target paths (`lib.task`), so each segment is checked on
//! its own; the alias, when present, is checked as a plain name.

use crate::model::{EntityId, EntityKind, Model};
use crate::types::is_identifier;

use super::super::{Issue, ValidationRule};

const RESERVED: &[&str] = &[
    "Array", "Boolean", "File", "Float", "Int", "Map", "None", "Object", "Pair", "String",
    "alias", "as", "call", "command", "else", "false", "if", "import", "in", "input", "meta",
    "object", "output", "parameter_meta", "runtime", "scatter", "struct", "task", "then",
    "true", "version", "workflow",
];

fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

pub struct InvalidNameRule;

impl InvalidNameRule {
    fn check(&self, entity: EntityId, name: &str, issues: &mut Vec<Issue>) {
        if name.is_empty() {
            return;
        }
        if is_reserved(name) {
            issues.push(Issue::error(
                entity,
                format!("'{name}' is a reserved word"),
                self.id(),
            ));
        } else if !is_identifier(name) {
            issues.push(Issue::error(
                entity,
                format!("'{name}' is not a valid identifier"),
                self.id(),
            ));
        }
    }
}

impl ValidationRule for InvalidNameRule {
    fn id(&self) -> &'static str {
        "invalid-name"
    }

    fn description(&self) -> &'static str {
        "Names must be identifiers and must not be reserved words"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind.requires_name() || kind == EntityKind::Import
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let mut issues = Vec::new();
        if let Some(alias) = model.alias(entity) {
            self.check(entity, alias, &mut issues);
        }
        if entity.kind() == EntityKind::Import {
            return issues;
        }

        let name = model.name(entity).unwrap_or_default();
        if entity.kind() == EntityKind::Call {
            if name.split('.').any(|segment| !is_identifier(segment)) && !name.is_empty() {
                issues.push(Issue::error(
                    entity,
                    format!("'{name}' is not a valid call target"),
                    self.id(),
                ));
            }
        } else {
            self.check(entity, name, &mut issues);
        }
        issues
    }
}
