//! Name scopes for duplicate detection
//!
//! Workflows form one flat value namespace across their nested scatters and
//! conditionals; call parameters, struct properties and task parameters are
//! scoped by their direct owner.

use crate::model::{EntityId, EntityKind, Model, ParameterKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Namespace {
    Executables,
    Structs,
    Imports,
    /// Inputs, declarations, iterators and calls
    Values,
    Outputs,
    CallInputs,
    CallOutputs,
    Properties,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NamespaceKey {
    pub(crate) scope: EntityId,
    pub(crate) namespace: Namespace,
    pub(crate) name: String,
}

pub(crate) fn namespace_key(model: &Model, id: EntityId) -> Option<NamespaceKey> {
    let parent = model.parent(id)?;
    let named = || model.name(id).map(str::to_string);

    let (scope, namespace, name) = match id.kind() {
        EntityKind::Task | EntityKind::Workflow => (parent, Namespace::Executables, named()?),
        EntityKind::Struct => (parent, Namespace::Structs, named()?),
        EntityKind::Import => (parent, Namespace::Imports, model.import_namespace(id)?),
        EntityKind::Call => (
            model.executable_of(id)?,
            Namespace::Values,
            model.call_reference_name(id),
        ),
        EntityKind::Parameter(kind) => match (kind, parent.kind()) {
            (ParameterKind::StructProperty, _) => (parent, Namespace::Properties, named()?),
            (ParameterKind::Input, EntityKind::Call) => (parent, Namespace::CallInputs, named()?),
            (ParameterKind::Output, EntityKind::Call) => (parent, Namespace::CallOutputs, named()?),
            (ParameterKind::Output, _) => (model.executable_of(id)?, Namespace::Outputs, named()?),
            _ => (model.executable_of(id)?, Namespace::Values, named()?),
        },
        _ => return None,
    };

    (!name.is_empty()).then_some(NamespaceKey {
        scope,
        namespace,
        name,
    })
}

/// Every entity whose namespace scope is `scope`
pub(crate) fn scope_members(model: &Model, scope: EntityId) -> Vec<EntityId> {
    let candidates = if scope.kind() == EntityKind::Workflow {
        model.descendants(scope)
    } else {
        model.children(scope).to_vec()
    };
    candidates
        .into_iter()
        .filter(|member| namespace_key(model, *member).is_some_and(|key| key.scope == scope))
        .collect()
}
