//! Rule: Unknown Call Target
//!
//! Reports an error when a call's target names no task or workflow, either
//! in its own document or behind an import namespace.
//!
//! # Examples
//!
//! ```wdl
//! import "lib.wdl" as lib
//!
//! workflow wf {
//!     call lib.align      # OK if lib.wdl defines `align`
//!     call missing_task   # Error
//! }
//! ```

use crate::model::{EntityId, EntityKind, Model};

use super::super::{Issue, ValidationRule};

pub struct UnknownCallTargetRule;

impl ValidationRule for UnknownCallTargetRule {
    fn id(&self) -> &'static str {
        "unknown-call-target"
    }

    fn description(&self) -> &'static str {
        "Calls must target a known task or workflow"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        kind == EntityKind::Call
    }

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        if model.callee(entity).is_some() {
            return Vec::new();
        }
        let target = model.name(entity).unwrap_or_default();
        if target.is_empty() {
            // missing-name covers it
            return Vec::new();
        }
        vec![Issue::error(
            entity,
            format!("no task or workflow named '{target}'"),
            self.id(),
        )]
    }
}
