//! Live semantic model of WDL workflow documents
//!
//! Documents are built from a construction payload into one entity arena,
//! [`Model`]. Edits (renames, binds, reparenting, type changes) fire events
//! that keep expression dependencies, call mirrors and validation issues
//! current.
//!
//! ```ignore
//! let mut model = Model::new();
//! let document = model.create_document(Some("main.wdl"), Some("1.0"))?;
//! let workflow = model.add_workflow(document, "wf")?;
//! let input = model.add_parameter(workflow, ParameterKind::Input, "n", Some(Type::int()))?;
//! let declaration = model.add_parameter(workflow, ParameterKind::Declaration, "m", Some(Type::int()))?;
//! model.set_text(declaration, "n + 1")?;
//! assert_eq!(model.inbound(declaration)?, &[input]);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod expression;
pub mod model;
pub mod payload;
pub mod project;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests;

pub use config::Settings;
pub use error::{ModelError, ModelResult};
pub use events::{Event, EventKind, EventRecord};
pub use expression::{BindingError, Dependency, DependencyProblem, ExpressionValue};
pub use model::{EntityId, EntityKind, Model, ParameterKind};
pub use payload::{DocumentParser, DocumentPayload, JsonDocumentParser};
pub use project::{ContentResolver, FsResolver, MemoryResolver, Project};
pub use types::{Primitive, Type, TypeKind};
pub use validation::{Issue, Severity, ValidationRule, Validator};
