//! Struct definitions: named bags of struct properties

use super::{EntityId, EntityKind, Model, ParameterKind};
use crate::error::ModelResult;
use crate::types::Type;

impl Model {
    pub fn add_struct(&mut self, document: EntityId, name: &str) -> ModelResult<EntityId> {
        self.add_child(document, EntityKind::Struct, Some(name))
    }

    pub fn add_struct_property(
        &mut self,
        structure: EntityId,
        name: &str,
        ty: Option<Type>,
    ) -> ModelResult<EntityId> {
        self.add_parameter(structure, ParameterKind::StructProperty, name, ty)
    }

    /// Property of `structure` named `name`
    pub fn struct_property(&self, structure: EntityId, name: &str) -> Option<EntityId> {
        self.children_of_kind(structure, EntityKind::STRUCT_PROPERTY)
            .into_iter()
            .find(|property| self.name(*property) == Some(name))
    }
}
