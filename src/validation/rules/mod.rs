//! Validation Rules
//!
//! Each file in this module contains one validation rule.
//!
//! - `missing_name.rs` / `invalid_name.rs` - Names required by a kind, and their syntax
//! - `duplicate_name.rs` - Two entities with one name in a namespace
//! - `missing_type.rs` / `unknown_struct.rs` - Parameter types
//! - `missing_value.rs` - Declarations, outputs and required call inputs without a value
//! - `invalid_expression.rs` - Expression text the extractor rejects
//! - `unknown_identifier.rs` / `illegal_reference.rs` / `ambiguous_reference.rs` - Dependency resolution
//! - `type_mismatch.rs` - Incompatible resolved references
//! - `empty_command.rs` / `empty_conditional.rs` - Empty bodies
//! - `unknown_call_target.rs` / `unknown_call_input.rs` - Calls
//! - `import_failed.rs` - Imports that could not be loaded

mod ambiguous_reference;
mod duplicate_name;
mod empty_command;
mod empty_conditional;
mod illegal_reference;
mod import_failed;
mod invalid_expression;
mod invalid_name;
mod missing_name;
mod missing_type;
mod missing_value;
mod type_mismatch;
mod unknown_call_input;
mod unknown_call_target;
mod unknown_identifier;
mod unknown_struct;

pub use ambiguous_reference::AmbiguousReferenceRule;
pub use duplicate_name::DuplicateNameRule;
pub use empty_command::EmptyCommandRule;
pub use empty_conditional::EmptyConditionalRule;
pub use illegal_reference::IllegalReferenceRule;
pub use import_failed::ImportFailedRule;
pub use invalid_expression::InvalidExpressionRule;
pub use invalid_name::InvalidNameRule;
pub use missing_name::MissingNameRule;
pub use missing_type::MissingTypeRule;
pub use missing_value::MissingValueRule;
pub use type_mismatch::TypeMismatchRule;
pub use unknown_call_input::UnknownCallInputRule;
pub use unknown_call_target::UnknownCallTargetRule;
pub use unknown_identifier::UnknownIdentifierRule;
pub use unknown_struct::UnknownStructRule;
