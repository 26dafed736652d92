//! Control actions: calls, scatters and conditionals

use tracing::debug;

use super::{EntityData, EntityId, EntityKind, Model, ParameterKind};
use crate::error::{ModelError, ModelResult};
use crate::events::Event;

#[derive(Debug, Clone, Default)]
pub struct CallData {
    /// Resolved target executable
    pub(crate) callee: Option<EntityId>,
}

impl CallData {
    pub fn callee(&self) -> Option<EntityId> {
        self.callee
    }
}

impl Model {
    /* ===================== Construction ===================== */

    /// Add a call to `target` (`name` or `import_alias.name`)
    pub fn add_call(
        &mut self,
        parent: EntityId,
        target: &str,
        alias: Option<&str>,
    ) -> ModelResult<EntityId> {
        self.ensure_live(parent)?;
        let call = self.create(EntityKind::Call, Some(target))?;
        self.node_mut(call)?.alias = alias.map(str::to_string);
        if let Err(err) = self.set_parent(call, Some(parent)) {
            self.mark_destroyed(call);
            return Err(err);
        }
        self.resolve_call_target(call)?;
        Ok(call)
    }

    /// Add a scatter over `collection`, exposing each element as `variable`
    pub fn add_scatter(
        &mut self,
        parent: EntityId,
        variable: &str,
        collection: &str,
    ) -> ModelResult<EntityId> {
        let scatter = self.add_child(parent, EntityKind::Scatter, None)?;
        let iterator =
            self.add_parameter(scatter, ParameterKind::ScatterIterator, variable, None)?;
        self.set_text(iterator, collection)?;
        Ok(scatter)
    }

    /// Add a conditional guarded by `condition`
    pub fn add_conditional(&mut self, parent: EntityId, condition: &str) -> ModelResult<EntityId> {
        let conditional = self.add_child(parent, EntityKind::Conditional, None)?;
        let expression = self.add_child(conditional, EntityKind::Expression, None)?;
        self.set_text(expression, condition)?;
        Ok(conditional)
    }

    pub fn scatter_iterator(&self, scatter: EntityId) -> Option<EntityId> {
        self.children_of_kind(scatter, EntityKind::SCATTER_ITERATOR)
            .first()
            .copied()
    }

    pub fn condition(&self, conditional: EntityId) -> Option<EntityId> {
        self.children_of_kind(conditional, EntityKind::Expression)
            .first()
            .copied()
    }

    /* ===================== Call targets ===================== */

    pub fn callee(&self, call: EntityId) -> Option<EntityId> {
        match &self.entities.get(&call)?.data {
            EntityData::Call(data) => data.callee,
            _ => None,
        }
    }

    /// Name used to qualify a call's parameters: the alias, or the last
    /// segment of the target name
    pub fn call_reference_name(&self, call: EntityId) -> String {
        if let Some(alias) = self.alias(call) {
            return alias.to_string();
        }
        let target = self.name(call).unwrap_or_default();
        target.rsplit('.').next().unwrap_or(target).to_string()
    }

    /// Look the call's target up again and resync its mirrors
    pub fn resolve_call_target(&mut self, call: EntityId) -> ModelResult<()> {
        if call.kind() != EntityKind::Call {
            return Err(ModelError::WrongKind {
                id: call,
                expected: "call",
            });
        }
        self.ensure_live(call)?;

        let target = self.name(call).unwrap_or_default().to_string();
        let found = self
            .document_of(call)
            .and_then(|document| self.find_executable(document, &target));
        let current = self.callee(call);

        if found != current {
            self.unregister_call_site(call);
            if let EntityData::Call(data) = &mut self.node_mut(call)?.data {
                data.callee = found;
            }
            if let Some(executable) = found {
                self.register_call_site(executable, call);
            }
            debug!(call = %call, target = %target, resolved = found.is_some(), "call target changed");
            self.emit(call, Event::CallTargetChanged { target: found });
        }
        self.sync_call(call)
    }

    /// Mirror the callee's inputs and outputs onto the call
    ///
    /// Existing call inputs are matched by mirror first, then adopted by
    /// name. Inputs that no longer mirror anything are kept while they carry
    /// a value, so the binding surfaces as an unknown call input.
    pub(crate) fn sync_call(&mut self, call: EntityId) -> ModelResult<()> {
        let callee = self.callee(call).filter(|c| self.contains(*c));
        let mut changed = false;

        for kind in [ParameterKind::Input, ParameterKind::Output] {
            let wanted = callee
                .map(|c| self.children_of_kind(c, EntityKind::Parameter(kind)))
                .unwrap_or_default();
            let mut existing = self.children_of_kind(call, EntityKind::Parameter(kind));

            for source in &wanted {
                let name = self.name(*source).unwrap_or_default().to_string();
                let ty = self.parameter_type(*source);

                let matched = existing
                    .iter()
                    .position(|p| self.parameter(*p).is_ok_and(|d| d.mirror == Some(*source)))
                    .or_else(|| {
                        existing.iter().position(|p| {
                            self.parameter(*p).is_ok_and(|d| d.mirror.is_none())
                                && self.name(*p) == Some(name.as_str())
                        })
                    });

                match matched {
                    Some(position) => {
                        let mirror = existing.remove(position);
                        self.set_mirror(mirror, Some(*source))?;
                        if self.name(mirror) != Some(name.as_str()) {
                            self.rename(mirror, &name)?;
                        }
                        self.set_type(mirror, ty)?;
                    }
                    None => {
                        let mirror = self.create(EntityKind::Parameter(kind), Some(&name))?;
                        self.set_mirror(mirror, Some(*source))?;
                        self.set_type(mirror, ty)?;
                        self.attach(mirror, call);
                        changed = true;
                    }
                }
            }

            for stale in existing {
                if kind == ParameterKind::Input && self.has_value(stale) {
                    self.set_mirror(stale, None)?;
                } else {
                    self.destroy(stale)?;
                    changed = true;
                }
            }
        }

        // mirrors may have been adopted or orphaned without an event of their own
        for parameter in self.children(call).to_vec() {
            self.revalidate(parameter);
        }
        if changed {
            let scope = self.reshape_scope(call);
            self.spread_from(scope, Event::TreeChanged { source: call });
        }
        Ok(())
    }
}
