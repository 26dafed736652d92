//! Stack-relative references and identifier matching

use crate::model::{EntityId, EntityKind, Model, ParameterKind};
use crate::types::{Type, TypeKind};

/// Type reached by an identifier path
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MemberType {
    Known(Type),
    /// The candidate (or a member on the way) carries no usable type
    Untyped,
}

impl MemberType {
    fn of(ty: Option<Type>) -> Self {
        ty.map_or(MemberType::Untyped, MemberType::Known)
    }

    pub(crate) fn known(self) -> Option<Type> {
        match self {
            MemberType::Known(ty) => Some(ty),
            MemberType::Untyped => None,
        }
    }
}

impl Model {
    /// Shortest name by which `requester` can address `entity`
    ///
    /// Call parameters are qualified with the call's alias (or the last
    /// segment of its target name) and workflow outputs with the workflow
    /// name, unless the requester sits inside that call or workflow.
    pub fn reference(&self, entity: EntityId, requester: EntityId) -> String {
        let name = self.name(entity).unwrap_or_default().to_string();
        let Some(parent) = self.parent(entity) else {
            return name;
        };

        match (entity.kind(), parent.kind()) {
            (
                EntityKind::Parameter(ParameterKind::Input | ParameterKind::Output),
                EntityKind::Call,
            ) if !self.is_within(parent, requester) => {
                format!("{}.{}", self.call_reference_name(parent), name)
            }
            (EntityKind::Parameter(ParameterKind::Output), EntityKind::Workflow)
                if !self.is_within(parent, requester) =>
            {
                format!("{}.{}", self.name(parent).unwrap_or_default(), name)
            }
            _ => name,
        }
    }

    /// Whether `identifier` addresses `candidate` (or a member of it) from
    /// `requester`'s position, and the type the path reaches
    pub(crate) fn match_identifier(
        &self,
        candidate: EntityId,
        identifier: &str,
        requester: EntityId,
    ) -> Option<MemberType> {
        let reference = self.reference(candidate, requester);
        if reference.is_empty() {
            return None;
        }
        if identifier == reference {
            return Some(MemberType::of(self.parameter_type(candidate)));
        }

        let rest = identifier
            .strip_prefix(reference.as_str())
            .and_then(|rest| rest.strip_prefix('.'))?;
        let ty = self.parameter_type(candidate)?;
        self.member_type(ty, rest, requester)
    }

    /// Walk `path` through struct properties, pair members and objects
    fn member_type(&self, mut ty: Type, path: &str, requester: EntityId) -> Option<MemberType> {
        for segment in path.split('.') {
            ty = match ty.kind() {
                TypeKind::Object => return Some(MemberType::Untyped),
                TypeKind::Pair(_, _) => ty.pair_member(segment)?,
                TypeKind::Struct(name) => {
                    let document = self.document_of(requester)?;
                    let structure = self.find_struct(document, name)?;
                    let property = self.struct_property(structure, segment)?;
                    match self.parameter_type(property) {
                        Some(ty) => ty,
                        None => return Some(MemberType::Untyped),
                    }
                }
                _ => return None,
            };
        }
        Some(MemberType::Known(ty))
    }
}
