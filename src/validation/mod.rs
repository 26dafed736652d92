//! Semantic Validation
//!
//! Semantic problems never fail an operation. Each entity keeps the issues
//! found on it alone; [`Model::issues`] aggregates a whole subtree on demand.
//!
//! # Architecture
//!
//! 1. **ValidationRule trait** - Each rule checks one aspect of one entity
//! 2. **Validator** - Holds the rules and runs the applicable ones
//! 3. **Issue** - The output of validation (errors and warnings)
//!
//! Revalidation is not run on every mutation. Each entity kind subscribes to
//! the events that can change its own issues (see the model's reactions),
//! and only that entity (plus its namespace peers after a rename) is
//! revalidated.
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `validation/rules/`
//! 2. Implement `ValidationRule` for your struct
//! 3. Add it to `Validator::new()`

mod namespace;
pub mod rules;

use std::collections::HashSet;
use std::fmt;

use crate::error::{ModelError, ModelResult};
use crate::events::Event;
use crate::model::{EntityId, EntityKind, Model};

pub(crate) use namespace::{namespace_key, scope_members};

#[cfg(test)]
mod tests;

// ============================================================================
// Issues
// ============================================================================

/// A semantic problem found on one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Which rule produced this issue
    pub rule_id: &'static str,
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Entity the issue was found on
    pub entity: EntityId,
}

/// Severity levels for issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Must be fixed
    Error,
    /// Should probably be fixed
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl Issue {
    pub fn error(entity: EntityId, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            rule_id,
            severity: Severity::Error,
            message: message.into(),
            entity,
        }
    }

    pub fn warning(entity: EntityId, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            rule_id,
            severity: Severity::Warning,
            message: message.into(),
            entity,
        }
    }

    /// Check if this is an error (not a warning)
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {}: {} [{}]",
            self.severity.as_str(),
            self.entity,
            self.message,
            self.rule_id
        )
    }
}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// Trait that all validation rules implement.
///
/// A rule inspects a single entity and reports the issues found on it. It
/// may read the rest of the model (scopes, callees, imports) but never
/// mutates it.
pub trait ValidationRule {
    /// Unique identifier for this rule (e.g., "unknown-identifier")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    /// Whether the rule looks at entities of `kind` at all
    fn applies_to(&self, kind: EntityKind) -> bool;

    fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue>;
}

// ============================================================================
// Validator - Runs All Rules
// ============================================================================

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// Create a validator with all built-in rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(rules::MissingNameRule),
                Box::new(rules::InvalidNameRule),
                Box::new(rules::DuplicateNameRule),
                Box::new(rules::MissingTypeRule),
                Box::new(rules::UnknownStructRule),
                Box::new(rules::MissingValueRule),
                Box::new(rules::InvalidExpressionRule),
                Box::new(rules::UnknownIdentifierRule),
                Box::new(rules::IllegalReferenceRule),
                Box::new(rules::TypeMismatchRule),
                Box::new(rules::EmptyCommandRule),
                Box::new(rules::EmptyConditionalRule),
                Box::new(rules::UnknownCallTargetRule),
                Box::new(rules::UnknownCallInputRule),
                Box::new(rules::ImportFailedRule),
                // Warning rules
                Box::new(rules::AmbiguousReferenceRule),
            ],
        }
    }

    /// Validator running only `rules`
    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Run every applicable rule against one entity
    pub fn validate(&self, model: &Model, entity: EntityId) -> Vec<Issue> {
        let kind = entity.kind();
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(kind))
            .flat_map(|rule| rule.validate(model, entity))
            .collect()
    }

    /// List of registered rules as `(id, description)`
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Model API
// ============================================================================

impl Model {
    /// Replace the validator (e.g. to run a reduced rule set)
    pub fn set_validator(&mut self, validator: Validator) {
        self.validator = validator;
    }

    /// Recompute the issues found on `id` alone
    pub(crate) fn revalidate(&mut self, id: EntityId) {
        let Some(node) = self.entities.get(&id) else {
            return;
        };
        let issues = self.validator.validate(self, id);
        if node.issues == issues {
            return;
        }
        if let Some(node) = self.entities.get_mut(&id) {
            node.issues = issues;
        }
        self.emit(id, Event::IssuesChanged);
    }

    /// Revalidate the members of `scope`'s namespaces called one of `names`
    pub(crate) fn revalidate_namesakes(&mut self, scope: EntityId, names: &HashSet<String>) {
        if names.is_empty() {
            return;
        }
        let namesakes: Vec<EntityId> = scope_members(self, scope)
            .into_iter()
            .filter(|member| {
                namespace_key(self, *member).is_some_and(|key| names.contains(&key.name))
            })
            .collect();
        for member in namesakes {
            self.revalidate(member);
        }
    }

    /// Force a validation pass over `id` and its subtree, returning every issue
    pub fn validate(&mut self, id: EntityId) -> ModelResult<Vec<Issue>> {
        self.ensure_live(id)?;
        self.revalidate(id);
        for descendant in self.descendants(id) {
            self.revalidate(descendant);
        }
        self.issues(id)
    }

    /// Issues of `id` and all of its descendants, as last computed
    pub fn issues(&self, id: EntityId) -> ModelResult<Vec<Issue>> {
        let mut issues = self.node(id)?.issues.clone();
        for descendant in self.descendants(id) {
            if let Some(node) = self.entities.get(&descendant) {
                issues.extend(node.issues.iter().cloned());
            }
        }
        Ok(issues)
    }

    /// Issues found on `id` alone
    pub fn own_issues(&self, id: EntityId) -> ModelResult<&[Issue]> {
        Ok(&self.node(id)?.issues)
    }

    /// No error-severity issue in the subtree (as last computed)
    pub fn is_valid(&self, id: EntityId) -> bool {
        self.issues(id)
            .map(|issues| !issues.iter().any(Issue::is_error))
            .unwrap_or(false)
    }

    /// Validate and refuse while errors remain
    ///
    /// Anything that turns the model into output (text generation, export)
    /// goes through this gate first.
    pub fn ensure_valid(&mut self, id: EntityId) -> ModelResult<()> {
        let issues = self.validate(id)?;
        if issues.iter().any(Issue::is_error) {
            return Err(ModelError::Invalid(issues));
        }
        Ok(())
    }
}
