//! Rule: Duplicate Name
//!
//! Reports an error on every entity that shares its name with another one in
//! the same namespace.
//!
//! # Examples
//!
//! ```wdl
//! workflow wf {
//!     # Error on both: two calls addressed as 'step1'
//!     call a as step1
//!     call b as step1
//! }
//! ```

use crate::model::{EntityId, EntityKind, Model};

use super::super::{namespace_key, scope_members, Issue, ValidationRule};

pub struct DuplicateNameRule;

impl ValidationRule for DuplicateNameRule {
    fn id(&self) -> &'static str {
        "duplicate-name"
    }

    fn description(&self) -> &'static str {
        "Names must be unique within their scope"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        !matches!(
            kind,
            EntityKind::Document
                | EntityKind::Scatter
                | EntityKind::Conditional
                | EntityKind::Command
                | EntityKind::Expression
        )
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let Some(key) = namespace_key(model, entity) else {
            return Vec::new();
        };

        let clash = scope_members(model, key.scope).into_iter().any(|peer| {
            peer != entity
                && namespace_key(model, peer).is_some_and(|other| {
                    other.namespace == key.namespace && other.name == key.name
                })
        });

        if clash {
            vec![Issue::error(
                entity,
                format!("duplicate name '{}'", key.name),
                self.id(),
            )]
        } else {
            Vec::new()
        }
    }
}
