//! The model's own subscriptions
//!
//! Every entity subscribes to the events that can change its dependencies,
//! its call mirrors or its issues. All reactions run at
//! [`INTERNAL_PRIORITY`] and are owned by the entity itself, so destroying it
//! removes them.

use std::collections::HashSet;

use tracing::warn;

use super::{EntityId, EntityKind, Model, ParameterKind};
use crate::error::ModelResult;
use crate::events::{Event, EventKind, EventRecord, INTERNAL_PRIORITY};
use crate::validation::namespace_key;

type Reaction = fn(&mut Model, EntityId, &EventRecord) -> ModelResult<()>;

/// Install the reactions matching `id`'s kind
///
/// Order matters: resolution and retargeting run before revalidation so the
/// validator sees the settled graph.
pub(crate) fn install(model: &mut Model, id: EntityId) -> ModelResult<()> {
    let kind = id.kind();

    if kind.is_expression() {
        subscribe(model, id, EventKind::TreeChanged, resolve)?;
    }
    if kind == EntityKind::Call {
        subscribe(model, id, EventKind::TreeChanged, retarget)?;
    }
    if kind == EntityKind::SCATTER_ITERATOR {
        subscribe(model, id, EventKind::TreeChanged, refresh_iterator)?;
        subscribe(model, id, EventKind::ConnectionsChanged, refresh_iterator)?;
        subscribe(model, id, EventKind::DependenciesChanged, refresh_iterator)?;
    }
    if let EntityKind::Parameter(parameter) = kind {
        subscribe(model, id, EventKind::TypeChanged, propagate_type)?;
        if matches!(parameter, ParameterKind::Input | ParameterKind::Output) {
            for event in [
                EventKind::NameChanged,
                EventKind::TypeChanged,
                EventKind::ValueChanged,
            ] {
                subscribe(model, id, event, sync_callers)?;
            }
        }
    }
    if kind == EntityKind::Expression {
        subscribe(model, id, EventKind::ValueChanged, revalidate_conditional)?;
    }
    if kind.is_executable() {
        subscribe(model, id, EventKind::ChildAdded, signature_changed)?;
        subscribe(model, id, EventKind::ChildRemoved, signature_changed)?;
    }
    if matches!(
        kind,
        EntityKind::Document
            | EntityKind::Task
            | EntityKind::Workflow
            | EntityKind::Call
            | EntityKind::Struct
    ) {
        subscribe(model, id, EventKind::ChildAdded, revalidate_namesakes)?;
        subscribe(model, id, EventKind::ChildRemoved, revalidate_namesakes)?;
    }

    // A new name can satisfy identifiers, call targets and struct types
    // anywhere in the entity's reach.
    if kind.requires_name() || kind == EntityKind::Import {
        subscribe(model, id, EventKind::NameChanged, reshape)?;
    }
    if matches!(kind, EntityKind::Call | EntityKind::Import) {
        subscribe(model, id, EventKind::AliasChanged, reshape)?;
    }

    // No rule on a scatter looks at the shape of the tree.
    if kind != EntityKind::Scatter {
        subscribe(model, id, EventKind::TreeChanged, revalidate_reshaped)?;
    }
    for event in revalidation_events(kind) {
        subscribe(model, id, event, revalidate)?;
    }
    Ok(())
}

/// Events other than a reshape after which `kind`'s own issues may differ
fn revalidation_events(kind: EntityKind) -> Vec<EventKind> {
    let mut events = Vec::new();
    if kind.is_expression() {
        events.extend([
            EventKind::ValueChanged,
            EventKind::DependenciesChanged,
            EventKind::TypeChanged,
        ]);
    }
    match kind {
        EntityKind::Command => events.push(EventKind::CommandChanged),
        EntityKind::Call => events.push(EventKind::CallTargetChanged),
        EntityKind::Import => events.push(EventKind::ImportLoaded),
        EntityKind::Conditional => {
            events.extend([EventKind::ChildAdded, EventKind::ChildRemoved])
        }
        _ => {}
    }
    events
}

fn subscribe(
    model: &mut Model,
    id: EntityId,
    event: EventKind,
    reaction: Reaction,
) -> ModelResult<()> {
    model.on_with(id, event, Some(id), INTERNAL_PRIORITY, move |model, record| {
        if !model.contains(id) {
            return;
        }
        if let Err(err) = reaction(model, id, record) {
            warn!(entity = %id, event = %record.kind(), error = %err, "reaction failed");
        }
    })?;
    Ok(())
}

/* ===================== Reactions ===================== */

fn resolve(model: &mut Model, id: EntityId, _: &EventRecord) -> ModelResult<()> {
    model.resolve(id)
}

fn retarget(model: &mut Model, id: EntityId, _: &EventRecord) -> ModelResult<()> {
    model.resolve_call_target(id)
}

fn refresh_iterator(model: &mut Model, id: EntityId, _: &EventRecord) -> ModelResult<()> {
    model.refresh_iterator_type(id)
}

/// Iterators on either side re-derive their type; dependents re-check theirs
fn propagate_type(model: &mut Model, id: EntityId, _: &EventRecord) -> ModelResult<()> {
    let expression = model.expression_data(id)?;
    let inbound = expression.inbound.clone();
    let outbound = expression.outbound.clone();

    for peer in inbound.iter().chain(&outbound) {
        if peer.kind() == EntityKind::SCATTER_ITERATOR {
            model.refresh_iterator_type(*peer)?;
        }
    }
    for dependent in outbound {
        model.revalidate(dependent);
    }
    Ok(())
}

/// Executable parameters drive the mirrors at every call site
fn sync_callers(model: &mut Model, id: EntityId, _: &EventRecord) -> ModelResult<()> {
    match model.parent(id) {
        Some(executable) if executable.kind().is_executable() => {
            model.sync_call_sites(executable)
        }
        _ => Ok(()),
    }
}

fn signature_changed(model: &mut Model, id: EntityId, record: &EventRecord) -> ModelResult<()> {
    let child = match record.event {
        Event::ChildAdded { child } | Event::ChildRemoved { child } => child,
        _ => return Ok(()),
    };
    let parameter = matches!(child.kind(), EntityKind::INPUT | EntityKind::OUTPUT);
    if record.origin == id && parameter {
        model.sync_call_sites(id)?;
    }
    Ok(())
}

fn revalidate_conditional(model: &mut Model, id: EntityId, _: &EventRecord) -> ModelResult<()> {
    if let Some(conditional) = model
        .parent(id)
        .filter(|parent| parent.kind() == EntityKind::Conditional)
    {
        model.revalidate(conditional);
    }
    Ok(())
}

/// Peers sharing a name with the added or removed subtree
fn revalidate_namesakes(model: &mut Model, id: EntityId, record: &EventRecord) -> ModelResult<()> {
    let child = match record.event {
        Event::ChildAdded { child } | Event::ChildRemoved { child } => child,
        _ => return Ok(()),
    };
    let names = declared_names(model, child);
    model.revalidate_namesakes(id, &names);
    Ok(())
}

fn reshape(model: &mut Model, id: EntityId, record: &EventRecord) -> ModelResult<()> {
    let scope = model.reshape_scope(id);
    model.spread_from(scope, Event::TreeChanged { source: id });

    let mut names = declared_names(model, id);
    if let Event::NameChanged { old, new } | Event::AliasChanged { old, new } = &record.event {
        for name in [old, new].into_iter().flatten() {
            names.insert(name.clone());
        }
    }
    if let Some(target) = model.name(id).filter(|_| id.kind() == EntityKind::Call) {
        names.extend(target.rsplit('.').next().map(str::to_string));
    }
    if let Some(key) = namespace_key(model, id) {
        model.revalidate_namesakes(key.scope, &names);
    }
    Ok(())
}

/// Namespace names carried by `id` and everything below it
///
/// Works on detached subtrees, which have no namespace key of their own.
fn declared_names(model: &Model, id: EntityId) -> HashSet<String> {
    let mut names = HashSet::new();
    for member in std::iter::once(id).chain(model.descendants(id)) {
        let name = match member.kind() {
            EntityKind::Call => Some(model.call_reference_name(member)),
            EntityKind::Import => model.import_namespace(member),
            _ => model.name(member).map(str::to_string),
        };
        names.extend(name.filter(|name| !name.is_empty()));
    }
    names
}

/// Revalidate after a reshape that can reach `id`'s issues: document-wide
/// names, the moved subtree itself, or anything `id` reads from it
fn revalidate_reshaped(model: &mut Model, id: EntityId, record: &EventRecord) -> ModelResult<()> {
    let Event::TreeChanged { source } = record.event else {
        return Ok(());
    };
    let affected = source.kind().is_document_wide()
        || model.is_within(source, id)
        || model
            .expression_data(id)
            .is_ok_and(|data| data.inbound.iter().any(|dep| model.is_within(source, *dep)));
    if affected {
        model.revalidate(id);
    }
    Ok(())
}

fn revalidate(model: &mut Model, id: EntityId, _: &EventRecord) -> ModelResult<()> {
    model.revalidate(id);
    Ok(())
}
