//! Binding legality
//!
//! Structural legality depends only on where the two endpoints sit in the
//! tree. Type compatibility compares *effective* types: a source seen from
//! outside an enclosing Scatter is an array, from outside an enclosing
//! Conditional it is optional.

use thiserror::Error;

use crate::model::{EntityId, EntityKind, Model, ParameterKind};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("an expression cannot be bound to itself")]
    SelfBinding,

    #[error("call outputs cannot be bound")]
    CallOutput,

    #[error("cannot bind a nested value into an enclosing action's input or declaration")]
    AncestorScope,

    #[error("source is not visible from the target's scope")]
    OutOfScope,

    #[error("an output cannot be bound inside its own action")]
    OutputIntoOwnScope,

    #[error("type mismatch: {source_type} is not compatible with {target_type}")]
    TypeMismatch {
        source_type: String,
        target_type: String,
    },

    #[error("entity cannot take part in a binding")]
    NotBindable,
}

impl Model {
    /// Check that `target` may take its value from `source`
    pub fn can_bind(&self, source: EntityId, target: EntityId) -> Result<(), BindingError> {
        self.check_structure(source, target)?;
        self.check_types(source, target, None)
    }

    pub(crate) fn check_structure(
        &self,
        source: EntityId,
        target: EntityId,
    ) -> Result<(), BindingError> {
        if source == target {
            return Err(BindingError::SelfBinding);
        }

        let source_kind = match source.kind() {
            EntityKind::Parameter(ParameterKind::StructProperty) => {
                return Err(BindingError::NotBindable)
            }
            EntityKind::Parameter(kind) => kind,
            _ => return Err(BindingError::NotBindable),
        };
        let target_kind = match target.kind() {
            EntityKind::Parameter(ParameterKind::StructProperty) => {
                return Err(BindingError::NotBindable)
            }
            EntityKind::Parameter(kind) => Some(kind),
            EntityKind::Expression => None,
            _ => return Err(BindingError::NotBindable),
        };

        let target_parent = self.parent(target);
        if target_kind == Some(ParameterKind::Output)
            && target_parent.is_some_and(|parent| parent.kind() == EntityKind::Call)
        {
            return Err(BindingError::CallOutput);
        }

        let Some(source_parent) = self.parent(source) else {
            return Ok(());
        };

        if source_kind == ParameterKind::Output {
            if self.is_parent_for(source_parent, target) {
                return Err(BindingError::OutputIntoOwnScope);
            }
            return Ok(());
        }

        let cross_scope = source_kind == ParameterKind::Declaration
            && source_parent.kind() == EntityKind::Scatter;

        if let (Some(kind @ (ParameterKind::Input | ParameterKind::Declaration)), Some(parent)) =
            (target_kind, target_parent)
        {
            if self.is_parent_for(parent, source) && !cross_scope {
                let sibling = parent == source_parent
                    && matches!(
                        source_kind,
                        ParameterKind::Input
                            | ParameterKind::Declaration
                            | ParameterKind::ScatterIterator
                    );
                if !(sibling && kind == ParameterKind::Declaration) {
                    return Err(BindingError::AncestorScope);
                }
            }
        }

        if !cross_scope && !self.is_parent_for(source_parent, target) {
            return Err(BindingError::OutOfScope);
        }
        Ok(())
    }

    /// Compare effective types; `member` overrides the source's own type when
    /// the binding goes through a struct or pair member path
    pub(crate) fn check_types(
        &self,
        source: EntityId,
        target: EntityId,
        member: Option<Type>,
    ) -> Result<(), BindingError> {
        let Some(source_type) = member.or_else(|| self.parameter_type(source)) else {
            return Ok(());
        };
        let Some(base) = self.target_type(target) else {
            return Ok(());
        };

        let effective = self.effective_source_type(source_type, source, target);
        if effective.is_subtype_of(&base) {
            return Ok(());
        }
        let alternative = self.alternative_target_type(&base, source, target);
        if effective.is_subtype_of(&alternative) {
            return Ok(());
        }

        Err(BindingError::TypeMismatch {
            source_type: effective.to_string(),
            target_type: base.to_string(),
        })
    }

    /// Source type wrapped by every Scatter/Conditional between the source
    /// and the nearest action that also contains the target
    pub(crate) fn effective_source_type(
        &self,
        mut ty: Type,
        source: EntityId,
        target: EntityId,
    ) -> Type {
        for action in self.stack(source) {
            if self.is_within(action, target) {
                break;
            }
            ty = match action.kind() {
                EntityKind::Scatter => ty.make_array(),
                EntityKind::Conditional => ty.make_optional(),
                _ => ty,
            };
        }
        ty
    }

    /// Type a target accepts: the container for an iterator, Boolean for a
    /// condition, the declared type otherwise
    fn target_type(&self, target: EntityId) -> Option<Type> {
        match target.kind() {
            EntityKind::Expression => Some(Type::boolean()),
            EntityKind::Parameter(ParameterKind::ScatterIterator) => {
                self.parameter_type(target).map(|ty| ty.make_array())
            }
            _ => self.parameter_type(target),
        }
    }

    /// Target type as seen from the source's side of the target's own
    /// Scatter/Conditional nesting
    fn alternative_target_type(&self, base: &Type, source: EntityId, target: EntityId) -> Type {
        let mut ty = base.clone();
        for action in self.stack(target) {
            if self.is_within(action, source) {
                break;
            }
            ty = match action.kind() {
                EntityKind::Scatter => ty.make_array(),
                EntityKind::Conditional => ty.make_optional(),
                _ => ty,
            };
        }
        ty
    }
}
