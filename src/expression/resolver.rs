//! Dependency resolution
//!
//! Each identifier path of an expression is matched against a
//! priority-ordered candidate list built from the expression's scope. The
//! first candidate that matches and may legally be bound wins.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::{Dependency, DependencyProblem, ExpressionValue, ExtractError};
use crate::error::ModelResult;
use crate::events::Event;
use crate::model::{EntityId, EntityKind, Model, ParameterKind};

impl Model {
    /* ===================== Resolution ===================== */

    /// Recompute dependencies and connections of `id` from its current value
    ///
    /// Dependencies that still resolve legally to the same source are kept
    /// as they are; everything else is searched again.
    pub(crate) fn resolve(&mut self, id: EntityId) -> ModelResult<()> {
        let expression = self.expression_data(id)?;
        let value = expression.value.clone();
        let previous = expression.dependencies.clone();
        let previous_error = expression.extract_error.clone();

        let (next, error) = match value {
            ExpressionValue::Undefined => (Vec::new(), None),
            ExpressionValue::Reference(source) if self.contains(source) => (
                vec![Dependency::resolved(self.reference(source, id), source)],
                None,
            ),
            ExpressionValue::Reference(_) => (Vec::new(), None),
            ExpressionValue::Text(text) => match self.extract_paths(&text) {
                Ok(paths) => (self.reconcile(id, paths, &previous), None),
                Err(err) => (Vec::new(), Some(err)),
            },
        };

        let changed = next != previous || error != previous_error;
        self.apply_dependencies(id, next, error)?;
        if changed {
            self.emit(id, Event::DependenciesChanged);
        }
        Ok(())
    }

    fn extract_paths(&self, text: &str) -> Result<Vec<String>, ExtractError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut seen = HashSet::new();
        Ok(self
            .extractor
            .extract(text)?
            .into_iter()
            .map(|identifier| identifier.path)
            .filter(|path| seen.insert(path.clone()))
            .collect())
    }

    fn reconcile(&self, id: EntityId, paths: Vec<String>, previous: &[Dependency]) -> Vec<Dependency> {
        let mut candidates = None;
        paths
            .into_iter()
            .map(|identifier| {
                match previous.iter().find(|d| d.identifier == identifier) {
                    Some(earlier) if earlier.problem == Some(DependencyProblem::Ambiguous) => {
                        earlier.clone()
                    }
                    Some(earlier)
                        if earlier
                            .source
                            .is_some_and(|source| self.still_resolves(source, &identifier, id)) =>
                    {
                        earlier.clone()
                    }
                    _ => {
                        let candidates = candidates.get_or_insert_with(|| self.candidates(id));
                        self.search(id, &identifier, candidates.as_slice())
                    }
                }
            })
            .collect()
    }

    fn still_resolves(&self, source: EntityId, identifier: &str, id: EntityId) -> bool {
        self.contains(source)
            && self.match_identifier(source, identifier, id).is_some()
            && self.check_structure(source, id).is_ok()
    }

    /// Store `next` and bring the connection sets in line with it
    fn apply_dependencies(
        &mut self,
        id: EntityId,
        next: Vec<Dependency>,
        error: Option<ExtractError>,
    ) -> ModelResult<()> {
        let old_sources = self.expression_data(id)?.inbound.clone();
        let mut new_sources: Vec<EntityId> = Vec::new();
        for source in next.iter().filter_map(|d| d.source) {
            if !new_sources.contains(&source) {
                new_sources.push(source);
            }
        }

        if let Some(expression) = self.node_mut(id)?.expression_mut() {
            expression.dependencies = next;
            expression.extract_error = error;
        }

        for source in old_sources.iter().filter(|s| !new_sources.contains(s)) {
            self.disconnect(*source, id);
        }
        for source in new_sources.iter().filter(|s| !old_sources.contains(s)) {
            self.connect(*source, id);
        }
        Ok(())
    }

    /// First legal candidate matching `identifier`
    fn search(&self, id: EntityId, identifier: &str, candidates: &[EntityId]) -> Dependency {
        let mut illegal = None;
        for &candidate in candidates {
            if self.match_identifier(candidate, identifier, id).is_none() {
                continue;
            }
            match self.check_structure(candidate, id) {
                Ok(()) => {
                    debug!(entity = %id, source = %candidate, identifier, "resolved dependency");
                    return Dependency::resolved(identifier, candidate);
                }
                Err(err) => {
                    illegal.get_or_insert(err);
                }
            }
        }

        match illegal {
            Some(err) => {
                warn!(entity = %id, identifier, error = %err, "only illegal candidates in scope");
                Dependency::unresolved(identifier, DependencyProblem::Illegal(err))
            }
            None => Dependency::unresolved(identifier, DependencyProblem::Unresolved),
        }
    }

    /// Candidate sources for `id`, highest priority first
    pub(crate) fn candidates(&self, id: EntityId) -> Vec<EntityId> {
        let Some(owner) = self.executable_of(id) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        match owner.kind() {
            EntityKind::Task => {
                found.extend(self.children_of_kind(owner, EntityKind::DECLARATION));
                found.extend(self.children_of_kind(owner, EntityKind::INPUT));
                if id.kind() == EntityKind::OUTPUT {
                    found.extend(self.children_of_kind(owner, EntityKind::OUTPUT));
                }
            }
            _ => self.workflow_candidates(id, owner, &mut found),
        }

        let mut seen = HashSet::new();
        found
            .into_iter()
            .filter(|candidate| *candidate != id && seen.insert(*candidate))
            .collect()
    }

    fn workflow_candidates(&self, id: EntityId, workflow: EntityId, found: &mut Vec<EntityId>) {
        let stack = self.stack(id);

        for action in &stack {
            if action.kind() == EntityKind::Scatter {
                found.extend(self.children_of_kind(*action, EntityKind::SCATTER_ITERATOR));
            }
        }

        // an action's own inputs/iterator/condition cannot see inside the action
        let own_action_hidden = match id.kind() {
            EntityKind::Parameter(ParameterKind::Input) => {
                self.parent(id).is_some_and(|p| p.kind() == EntityKind::Call)
            }
            EntityKind::Parameter(ParameterKind::ScatterIterator) | EntityKind::Expression => true,
            _ => false,
        };
        for (depth, action) in stack.iter().enumerate() {
            if (depth == 0 && own_action_hidden) || action.kind() == EntityKind::Call {
                continue;
            }
            found.extend(self.children_of_kind(*action, EntityKind::INPUT));
            found.extend(self.children_of_kind(*action, EntityKind::DECLARATION));
        }

        found.extend(self.find_all(workflow, |node| {
            node.kind() == EntityKind::DECLARATION
                && node.parent().is_some_and(|p| p.kind() == EntityKind::Scatter)
        }));

        found.extend(self.children_of_kind(workflow, EntityKind::INPUT));
        found.extend(self.children_of_kind(workflow, EntityKind::DECLARATION));

        if let Some(document) = self.parent(workflow) {
            for other in self.children_of_kind(document, EntityKind::Workflow) {
                if other != workflow {
                    found.extend(self.children_of_kind(other, EntityKind::OUTPUT));
                }
            }
        }

        for scope in stack.iter().filter(|a| a.kind() != EntityKind::Call) {
            for call in self.find_all(*scope, |node| node.kind() == EntityKind::Call) {
                if !self.is_within(call, id) {
                    found.extend(self.children_of_kind(call, EntityKind::OUTPUT));
                }
            }
        }
    }

    /* ===================== Connections ===================== */

    /// Install the symmetric edge `source -> target`
    pub(crate) fn connect(&mut self, source: EntityId, target: EntityId) {
        let both = self.entities.get(&source).and_then(|n| n.expression()).is_some()
            && self.entities.get(&target).and_then(|n| n.expression()).is_some();
        if !both {
            return;
        }
        if let Some(expression) = self.entities.get_mut(&source).and_then(|n| n.expression_mut()) {
            if !expression.outbound.contains(&target) {
                expression.outbound.push(target);
            }
        }
        if let Some(expression) = self.entities.get_mut(&target).and_then(|n| n.expression_mut()) {
            if !expression.inbound.contains(&source) {
                expression.inbound.push(source);
            }
        }
        self.emit(source, Event::ConnectionsChanged { peer: target, connected: true });
        self.emit(target, Event::ConnectionsChanged { peer: source, connected: true });
    }

    /// Remove the edge `source -> target` from both sides
    pub(crate) fn disconnect(&mut self, source: EntityId, target: EntityId) {
        let mut removed = false;
        if let Some(expression) = self.entities.get_mut(&source).and_then(|n| n.expression_mut()) {
            let before = expression.outbound.len();
            expression.outbound.retain(|t| *t != target);
            removed |= expression.outbound.len() != before;
        }
        if let Some(expression) = self.entities.get_mut(&target).and_then(|n| n.expression_mut()) {
            let before = expression.inbound.len();
            expression.inbound.retain(|s| *s != source);
            removed |= expression.inbound.len() != before;
        }
        if !removed {
            return;
        }
        self.emit(source, Event::ConnectionsChanged { peer: target, connected: false });
        self.emit(target, Event::ConnectionsChanged { peer: source, connected: false });
    }

    /// Drop every edge touching `id`, clearing dependencies that used it
    pub(crate) fn disconnect_all(&mut self, id: EntityId) {
        let Some(expression) = self.entities.get(&id).and_then(|n| n.expression()) else {
            return;
        };
        let inbound = expression.inbound.clone();
        let outbound = expression.outbound.clone();

        for source in inbound {
            self.disconnect(source, id);
        }
        for target in outbound {
            self.disconnect(id, target);
            if let Some(expression) = self.entities.get_mut(&target).and_then(|n| n.expression_mut()) {
                for dependency in &mut expression.dependencies {
                    if dependency.source == Some(id) {
                        dependency.source = None;
                        dependency.problem = Some(DependencyProblem::Unresolved);
                    }
                }
            }
        }
    }

    /* ===================== Rename propagation ===================== */

    /// Keep dependents of a renamed entity pointing at it
    pub(crate) fn after_rename(&mut self, id: EntityId, old_name: Option<&str>) -> ModelResult<()> {
        match id.kind() {
            EntityKind::Parameter(_) => self.propagate_rename(id),
            EntityKind::Call => {
                for parameter in self.children(id).to_vec() {
                    if parameter.kind().is_expression() {
                        self.propagate_rename(parameter)?;
                    }
                }
                if old_name.is_some() {
                    self.resolve_call_target(id)?;
                }
                Ok(())
            }
            EntityKind::Task | EntityKind::Workflow => {
                for output in self.children_of_kind(id, EntityKind::OUTPUT) {
                    self.propagate_rename(output)?;
                }
                if let (Some(old), Some(new)) = (old_name, self.name(id).map(str::to_string)) {
                    self.retarget_call_sites(id, old, &new)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Calls addressing an import by its alias follow the alias
    pub(crate) fn after_alias_change(
        &mut self,
        id: EntityId,
        old_alias: Option<&str>,
    ) -> ModelResult<()> {
        match id.kind() {
            EntityKind::Call => self.after_rename(id, None),
            EntityKind::Import => {
                let (Some(old), Some(new), Some(document)) = (
                    old_alias,
                    self.alias(id).map(str::to_string),
                    self.parent(id),
                ) else {
                    return Ok(());
                };
                let calls = self.find_all(document, |node| node.kind() == EntityKind::Call);
                for call in calls {
                    let renamed = self
                        .name(call)
                        .and_then(|target| target.strip_prefix(old))
                        .and_then(|rest| rest.strip_prefix('.'))
                        .map(|rest| format!("{new}.{rest}"));
                    if let Some(renamed) = renamed {
                        self.rename(call, &renamed)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Rewrite call targets `old` / `prefix.old` naming a renamed executable
    fn retarget_call_sites(&mut self, executable: EntityId, old: &str, new: &str) -> ModelResult<()> {
        for site in self.call_sites(executable) {
            let Some(target) = self.name(site).map(str::to_string) else {
                continue;
            };
            let renamed = match target.rsplit_once('.') {
                Some((prefix, last)) if last == old => format!("{prefix}.{new}"),
                None if target == old => new.to_string(),
                _ => continue,
            };
            self.rename(site, &renamed)?;
        }
        Ok(())
    }

    /// Rewrite every dependent's text for the new reference of `id`, then
    /// verify it still resolves to `id`
    fn propagate_rename(&mut self, id: EntityId) -> ModelResult<()> {
        let dependents = self.expression_data(id)?.outbound.clone();
        for dependent in dependents {
            self.rewrite_dependent(dependent, id)?;
        }
        Ok(())
    }

    fn rewrite_dependent(&mut self, dependent: EntityId, source: EntityId) -> ModelResult<()> {
        let reference = self.reference(source, dependent);
        let segments = reference.split('.').count();
        let expression = self.expression_data(dependent)?;

        let mut renames = Vec::new();
        for dependency in expression.dependencies.iter().filter(|d| d.source == Some(source)) {
            let rest: Vec<&str> = dependency.identifier.split('.').skip(segments).collect();
            let identifier = if rest.is_empty() {
                reference.clone()
            } else {
                format!("{reference}.{}", rest.join("."))
            };
            renames.push((dependency.identifier.clone(), identifier));
        }
        if renames.iter().all(|(old, new)| old == new) {
            return Ok(());
        }

        let text = match &expression.value {
            ExpressionValue::Text(text) => Some(self.rewrite_text(text, &renames)),
            _ => None,
        };

        let candidates = self.candidates(dependent);
        let verdicts: Vec<(String, bool)> = renames
            .iter()
            .map(|(_, new)| {
                let found = self.search(dependent, new, &candidates);
                (new.clone(), found.source == Some(source))
            })
            .collect();

        let node = self.node_mut(dependent)?;
        let Some(expression) = node.expression_mut() else {
            return Ok(());
        };
        if let Some(text) = text {
            expression.value = ExpressionValue::Text(text);
        }
        for dependency in &mut expression.dependencies {
            let Some((_, new)) = renames.iter().find(|(old, _)| *old == dependency.identifier) else {
                continue;
            };
            if dependency.source != Some(source) {
                continue;
            }
            dependency.identifier = new.clone();
            if verdicts.iter().any(|(identifier, kept)| identifier == new && !kept) {
                dependency.source = None;
                dependency.problem = Some(DependencyProblem::Ambiguous);
            }
        }
        let still_used = expression
            .dependencies
            .iter()
            .any(|d| d.source == Some(source));

        if !still_used {
            warn!(entity = %dependent, source = %source, "rename made a reference ambiguous");
            self.disconnect(source, dependent);
        }
        self.emit(dependent, Event::ValueChanged);
        self.emit(dependent, Event::DependenciesChanged);
        Ok(())
    }

    /// Replace identifier occurrences by span, back to front
    fn rewrite_text(&self, text: &str, renames: &[(String, String)]) -> String {
        let Ok(mut identifiers) = self.extractor.extract(text) else {
            return text.to_string();
        };
        identifiers.sort_by(|a, b| b.span.start.cmp(&a.span.start));

        let mut rewritten = text.to_string();
        for identifier in identifiers {
            if let Some((_, new)) = renames.iter().find(|(old, _)| *old == identifier.path) {
                rewritten.replace_range(identifier.span, new);
            }
        }
        rewritten
    }
}
