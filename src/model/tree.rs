//! Tree shape: reparenting, bubbling, spreading, stack queries, destruction

use std::collections::HashSet;

use tracing::debug;

use super::{EntityData, EntityId, EntityKind, EntityNode, Model, ParameterKind};
use crate::error::{ModelError, ModelResult};
use crate::events::{Collection, Event, EventRecord};
use crate::expression::ExpressionValue;

/// Which parents an entity kind may be attached to
fn allowed_parent(child: EntityKind, parent: EntityKind) -> bool {
    use EntityKind as K;
    match child {
        K::Import | K::Struct | K::Task | K::Workflow => parent == K::Document,
        K::Parameter(ParameterKind::StructProperty) => parent == K::Struct,
        K::Parameter(ParameterKind::Input) | K::Parameter(ParameterKind::Output) => {
            matches!(parent, K::Task | K::Workflow | K::Call)
        }
        K::Parameter(ParameterKind::Declaration) => {
            matches!(parent, K::Task | K::Workflow | K::Scatter | K::Conditional)
        }
        K::Parameter(ParameterKind::ScatterIterator) => parent == K::Scatter,
        K::Call | K::Scatter | K::Conditional => {
            matches!(parent, K::Workflow | K::Scatter | K::Conditional)
        }
        K::Command => parent == K::Task,
        K::Expression => parent == K::Conditional,
        K::Document => false,
    }
}

fn collection_of(kind: EntityKind) -> Option<Collection> {
    match kind {
        EntityKind::Import => Some(Collection::Imports),
        EntityKind::Struct => Some(Collection::Structs),
        EntityKind::Workflow => Some(Collection::Workflows),
        EntityKind::Task => Some(Collection::Tasks),
        _ => None,
    }
}

impl Model {
    /* ===================== Reparenting ===================== */

    /// Move `child` under `parent` (or detach it with `None`)
    ///
    /// This is the single mutation point of the tree: the entity is removed
    /// from its old parent's child list before being appended to the new one.
    /// Setting the current parent again is a no-op.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> ModelResult<()> {
        let old = self.node(child)?.parent;
        if old == parent {
            return Ok(());
        }

        if let Some(parent) = parent {
            let parent_kind = self.node(parent)?.kind();
            if !allowed_parent(child.kind(), parent_kind) {
                return Err(ModelError::InvalidParent {
                    child: child.kind(),
                    parent: parent_kind,
                });
            }
            if parent == child || self.is_parent_for(child, parent) {
                return Err(ModelError::Cycle(child));
            }
        }

        let old_scope = old.map(|_| self.reshape_scope(child));
        self.detach(child);

        if let Some(parent) = parent {
            self.attach(child, parent);
        }

        self.bubble_from(child, Event::ParentChanged { old, new: parent });
        self.bubble_from(child, Event::Changed);

        let new_scope = self.reshape_scope(child);
        self.spread_from(new_scope, Event::TreeChanged { source: child });
        if let Some(old_scope) = old_scope.filter(|scope| *scope != new_scope) {
            if self.contains(old_scope) && !self.is_within(new_scope, old_scope) {
                self.spread_from(old_scope, Event::TreeChanged { source: child });
            }
        }
        Ok(())
    }

    /// Narrowest subtree that can observe a change of `id`'s place or name
    ///
    /// Document members and workflow outputs are visible across the
    /// document; everything else only inside its task or workflow.
    pub(crate) fn reshape_scope(&self, id: EntityId) -> EntityId {
        let document_wide = match id.kind() {
            EntityKind::Parameter(ParameterKind::Output) => self
                .parent(id)
                .is_some_and(|parent| parent.kind() == EntityKind::Workflow),
            kind => kind.is_document_wide(),
        };
        if document_wide {
            return self.root(id);
        }
        self.executable_of(id).unwrap_or_else(|| self.root(id))
    }

    /// Append to the parent's child list without the tree-wide notifications
    pub(crate) fn attach(&mut self, child: EntityId, parent: EntityId) {
        let Some(parent_node) = self.entities.get_mut(&parent) else {
            return;
        };
        if !parent_node.children.contains(&child) {
            parent_node.children.push(child);
        }
        if let Some(child_node) = self.entities.get_mut(&child) {
            child_node.parent = Some(parent);
        }

        if parent.kind() == EntityKind::Document {
            if let Some(collection) = collection_of(child.kind()) {
                self.emit(
                    parent,
                    Event::CollectionChanged {
                        collection,
                        entity: child,
                        added: true,
                    },
                );
            }
        }
        self.bubble_from(parent, Event::ChildAdded { child });
    }

    pub(crate) fn detach(&mut self, child: EntityId) {
        let Some(parent) = self.entities.get(&child).and_then(|node| node.parent) else {
            return;
        };
        if let Some(parent_node) = self.entities.get_mut(&parent) {
            parent_node.children.retain(|c| *c != child);
        }
        if let Some(child_node) = self.entities.get_mut(&child) {
            child_node.parent = None;
        }

        if parent.kind() == EntityKind::Document {
            if let Some(collection) = collection_of(child.kind()) {
                self.emit(
                    parent,
                    Event::CollectionChanged {
                        collection,
                        entity: child,
                        added: false,
                    },
                );
            }
        }
        self.bubble_from(parent, Event::ChildRemoved { child });
    }

    /* ===================== Propagation ===================== */

    /// Fire on `id`, then on each ancestor up to the root or a muted ancestor
    pub fn bubble(&mut self, id: EntityId, event: Event) -> ModelResult<()> {
        self.ensure_live(id)?;
        self.bubble_from(id, event);
        Ok(())
    }

    /// Fire on `id`, then on every descendant
    pub fn spread(&mut self, id: EntityId, event: Event) -> ModelResult<()> {
        self.ensure_live(id)?;
        self.spread_from(id, event);
        Ok(())
    }

    pub(crate) fn bubble_from(&mut self, id: EntityId, event: Event) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if !self.contains(current) || self.is_muted(current) {
                break;
            }
            self.dispatch_record(EventRecord::new(current, id, event.clone()));
            cursor = self.entities.get(&current).and_then(|node| node.parent);
        }
    }

    pub(crate) fn spread_from(&mut self, id: EntityId, event: Event) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !self.contains(current) {
                continue;
            }
            self.dispatch_record(EventRecord::new(current, id, event.clone()));
            if let Some(node) = self.entities.get(&current) {
                pending.extend(node.children.iter().rev().copied());
            }
        }
    }

    /// Fire a specific event on `id` followed by a bubbled `Changed`
    pub(crate) fn emit(&mut self, id: EntityId, event: Event) {
        if !self.contains(id) {
            return;
        }
        self.dispatch_record(EventRecord::new(id, id, event));
        self.bubble_from(id, Event::Changed);
    }

    /* ===================== Queries ===================== */

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.entities
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: EntityId) -> Vec<EntityId> {
        let mut result = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            result.push(current);
            cursor = self.parent(current);
        }
        result
    }

    /// Execution stack: enclosing actions, nearest first
    pub fn stack(&self, id: EntityId) -> Vec<EntityId> {
        self.ancestors(id)
            .into_iter()
            .filter(|ancestor| ancestor.kind().is_action())
            .collect()
    }

    /// Whether `ancestor` strictly encloses `id`
    pub fn is_parent_for(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// `id` itself or inside `scope`
    pub(crate) fn is_within(&self, scope: EntityId, id: EntityId) -> bool {
        scope == id || self.is_parent_for(scope, id)
    }

    pub fn root(&self, id: EntityId) -> EntityId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Nearest strict ancestor whose kind is one of `kinds`
    pub fn nearest(&self, id: EntityId, kinds: &[EntityKind]) -> Option<EntityId> {
        self.ancestors(id)
            .into_iter()
            .find(|ancestor| kinds.contains(&ancestor.kind()))
    }

    /// Document containing `id` (or `id` itself when it is a document)
    pub fn document_of(&self, id: EntityId) -> Option<EntityId> {
        if id.kind() == EntityKind::Document {
            return self.contains(id).then_some(id);
        }
        self.nearest(id, &[EntityKind::Document])
    }

    /// Task or Workflow enclosing `id`
    pub fn executable_of(&self, id: EntityId) -> Option<EntityId> {
        self.nearest(id, &[EntityKind::Task, EntityKind::Workflow])
    }

    /// Strict descendants in pre-order
    pub fn descendants(&self, id: EntityId) -> Vec<EntityId> {
        let mut result = Vec::new();
        let mut pending: Vec<EntityId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = pending.pop() {
            result.push(current);
            pending.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// First entity under `root` (inclusive, pre-order) matching `predicate`
    pub fn find(
        &self,
        root: EntityId,
        predicate: impl Fn(&EntityNode) -> bool,
    ) -> Option<EntityId> {
        std::iter::once(root)
            .chain(self.descendants(root))
            .find(|id| self.entities.get(id).is_some_and(&predicate))
    }

    /// Every entity under `root` (inclusive, pre-order) matching `predicate`
    pub fn find_all(
        &self,
        root: EntityId,
        predicate: impl Fn(&EntityNode) -> bool,
    ) -> Vec<EntityId> {
        std::iter::once(root)
            .chain(self.descendants(root))
            .filter(|id| self.entities.get(id).is_some_and(&predicate))
            .collect()
    }

    /// First entity of `kind` named `name` under `root`
    pub fn find_by_name(&self, root: EntityId, kind: EntityKind, name: &str) -> Option<EntityId> {
        self.find(root, |node| node.kind() == kind && node.name() == Some(name))
    }

    /* ===================== Destruction ===================== */

    /// Destroy an entity and its subtree
    ///
    /// Connections into the subtree are removed from both sides. Dependents
    /// that bound the destroyed entity directly keep the reference as text,
    /// then re-resolve (usually ending up with an unresolved identifier).
    pub fn destroy(&mut self, id: EntityId) -> ModelResult<()> {
        self.ensure_live(id)?;

        let mut subtree = vec![id];
        subtree.extend(self.descendants(id));
        let members: HashSet<EntityId> = subtree.iter().copied().collect();

        let mut dependents = Vec::new();
        let mut call_sites = Vec::new();
        for member in &subtree {
            let node = self.node(*member)?;
            if let Some(expression) = node.expression() {
                for dependent in &expression.outbound {
                    if !members.contains(dependent) {
                        dependents.push((*member, *dependent));
                    }
                }
            }
            if let EntityData::Executable(executable) = &node.data {
                call_sites.extend(
                    executable
                        .call_sites
                        .iter()
                        .copied()
                        .filter(|site| !members.contains(site)),
                );
            }
        }

        for (source, dependent) in &dependents {
            self.freeze_reference(*dependent, *source);
        }

        let scope = self.reshape_scope(id);
        self.detach(id);

        for member in &subtree {
            if self.contains(*member) {
                self.dispatch_record(EventRecord::new(*member, *member, Event::Destroyed));
            }
        }

        for member in subtree.iter().rev() {
            self.disconnect_all(*member);
            if member.kind() == EntityKind::Call {
                self.unregister_call_site(*member);
            }
            self.off_context(*member);
            self.mark_destroyed(*member);
        }
        if id.kind() == EntityKind::Document {
            self.forget_imported_document(id);
        }
        debug!(entity = %id, removed = subtree.len(), "destroyed subtree");

        let mut seen = HashSet::new();
        for (_, dependent) in dependents {
            if seen.insert(dependent) && self.contains(dependent) {
                self.resolve(dependent)?;
            }
        }
        for site in call_sites {
            if self.contains(site) {
                self.resolve_call_target(site)?;
            }
        }

        if scope != id && self.contains(scope) {
            self.spread_from(scope, Event::TreeChanged { source: id });
        }
        Ok(())
    }

    /// Replace a direct reference to `source` by its reference text
    fn freeze_reference(&mut self, dependent: EntityId, source: EntityId) {
        let is_reference = self
            .entities
            .get(&dependent)
            .and_then(|node| node.expression())
            .is_some_and(|expression| expression.value == ExpressionValue::Reference(source));
        if !is_reference {
            return;
        }

        let text = self.reference(source, dependent);
        if let Some(expression) = self
            .entities
            .get_mut(&dependent)
            .and_then(|node| node.expression_mut())
        {
            expression.value = ExpressionValue::Text(text);
        }
    }
}
