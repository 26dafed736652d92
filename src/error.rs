//! Structural errors
//!
//! These are failures of the call that caused them: unknown or destroyed
//! entities, missing construction options, malformed types, illegal binds and
//! load failures. Semantic problems of a document are never errors; they are
//! collected as [`Issue`](crate::validation::Issue)s instead.

use thiserror::Error;

use crate::expression::BindingError;
use crate::model::{EntityId, EntityKind};
use crate::types::TypeParseError;
use crate::validation::Issue;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("entity {0} has been destroyed")]
    Destroyed(EntityId),

    #[error("{kind} requires option '{option}'")]
    MissingOption {
        kind: EntityKind,
        option: &'static str,
    },

    #[error("entity {id} is not a {expected}")]
    WrongKind { id: EntityId, expected: &'static str },

    #[error("{child} cannot be placed under {parent}")]
    InvalidParent { child: EntityKind, parent: EntityKind },

    #[error("reparenting {0} would create a cycle")]
    Cycle(EntityId),

    #[error(transparent)]
    InvalidType(#[from] TypeParseError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("validation failed with {} error(s)", count_errors(.0))]
    Invalid(Vec<Issue>),

    #[error("failed to load '{uri}': {cause}")]
    Load { uri: String, cause: String },

    #[error("import recursion depth exceeded at '{uri}' (limit {depth})")]
    RecursionDepthExceeded { uri: String, depth: usize },

    #[error("invalid construction payload: {0}")]
    Payload(#[from] serde_json::Error),
}

fn count_errors(issues: &[Issue]) -> usize {
    issues.iter().filter(|issue| issue.is_error()).count()
}

pub type ModelResult<T> = Result<T, ModelError>;
