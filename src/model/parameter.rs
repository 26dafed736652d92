//! Parameters: inputs, declarations, outputs, struct properties and scatter
//! iterators share one struct tagged by [`ParameterKind`]

use super::{EntityData, EntityId, EntityKind, Model, ParameterKind};
use crate::error::{ModelError, ModelResult};
use crate::events::Event;
use crate::expression::ExpressionData;
use crate::types::Type;

#[derive(Debug, Clone)]
pub struct ParameterData {
    pub(crate) kind: ParameterKind,
    pub(crate) ty: Option<Type>,
    pub(crate) expression: ExpressionData,
    /// Callee parameter mirrored by a call input/output
    pub(crate) mirror: Option<EntityId>,
}

impl ParameterData {
    pub(crate) fn new(kind: ParameterKind) -> Self {
        Self {
            kind,
            ty: None,
            expression: ExpressionData::default(),
            mirror: None,
        }
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }

    pub fn expression(&self) -> &ExpressionData {
        &self.expression
    }

    pub fn mirror(&self) -> Option<EntityId> {
        self.mirror
    }
}

impl Model {
    /// Create a parameter under `parent`
    pub fn add_parameter(
        &mut self,
        parent: EntityId,
        kind: ParameterKind,
        name: &str,
        ty: Option<Type>,
    ) -> ModelResult<EntityId> {
        let id = self.create(EntityKind::Parameter(kind), Some(name))?;
        if let EntityData::Parameter(parameter) = &mut self.node_mut(id)?.data {
            parameter.ty = ty;
        }
        if let Err(err) = self.set_parent(id, Some(parent)) {
            self.mark_destroyed(id);
            return Err(err);
        }
        Ok(id)
    }

    pub fn parameter(&self, id: EntityId) -> ModelResult<&ParameterData> {
        match &self.node(id)?.data {
            EntityData::Parameter(parameter) => Ok(parameter),
            _ => Err(ModelError::WrongKind {
                id,
                expected: "parameter",
            }),
        }
    }

    fn parameter_mut(&mut self, id: EntityId) -> ModelResult<&mut ParameterData> {
        match &mut self.node_mut(id)?.data {
            EntityData::Parameter(parameter) => Ok(parameter),
            _ => Err(ModelError::WrongKind {
                id,
                expected: "parameter",
            }),
        }
    }

    /// Declared type; `None` for untyped parameters and non-parameters
    pub fn parameter_type(&self, id: EntityId) -> Option<Type> {
        self.parameter(id).ok().and_then(|p| p.ty.clone())
    }

    pub fn set_type(&mut self, id: EntityId, ty: Option<Type>) -> ModelResult<()> {
        let parameter = self.parameter_mut(id)?;
        if parameter.ty == ty {
            return Ok(());
        }
        let old = std::mem::replace(&mut parameter.ty, ty.clone());
        self.emit(id, Event::TypeChanged { old, new: ty });
        Ok(())
    }

    /// Parse and set a type string
    pub fn set_type_str(&mut self, id: EntityId, ty: &str) -> ModelResult<()> {
        let ty = Type::parse(ty)?;
        self.set_type(id, Some(ty))
    }

    pub(crate) fn set_mirror(&mut self, id: EntityId, mirror: Option<EntityId>) -> ModelResult<()> {
        self.parameter_mut(id)?.mirror = mirror;
        Ok(())
    }

    /// Derive a scatter iterator's type from its connections
    ///
    /// The element type of a single array-typed source wins; otherwise the
    /// type of the first typed consumer is used.
    pub(crate) fn refresh_iterator_type(&mut self, id: EntityId) -> ModelResult<()> {
        if id.kind() != EntityKind::SCATTER_ITERATOR || !self.contains(id) {
            return Ok(());
        }
        let derived = self.iterator_source_type(id).or_else(|| {
            self.parameter(id).ok().and_then(|p| {
                p.expression
                    .outbound
                    .iter()
                    .find_map(|consumer| self.parameter_type(*consumer))
            })
        });
        self.set_type(id, derived)
    }

    fn iterator_source_type(&self, id: EntityId) -> Option<Type> {
        let dependency = self.sole_dependency(id)?;
        let source = dependency.source?;
        let ty = self
            .match_identifier(source, &dependency.identifier, id)?
            .known()?;
        self.effective_source_type(ty, source, id)
            .make_array_item()
    }
}
