//! Building a document from a construction payload

use tracing::{debug, warn};

use super::{EntityId, EntityKind, MetaSection, Model, ParameterKind};
use crate::error::ModelResult;
use crate::events::Event;
use crate::payload::{
    CallPayload, DeclarationPayload, DocumentPayload, TaskPayload, WorkflowElement,
    WorkflowPayload,
};
use crate::types::Type;

impl Model {
    /// Deserialize `payload` into a new document
    ///
    /// Construction runs muted so no observer sees a half-built document;
    /// one `TreeChanged` spread afterwards resolves every expression and
    /// validates every entity. On failure the partial document is destroyed.
    pub fn build_document(
        &mut self,
        payload: &DocumentPayload,
        uri: Option<&str>,
    ) -> ModelResult<EntityId> {
        let document = self.mute_action(|model| {
            model.create_document(uri, payload.version.as_deref())
        })?;

        if let Err(err) = self.mute_action(|model| model.populate(document, payload)) {
            warn!(uri = ?uri, error = %err, "discarding partially built document");
            if let Err(cleanup) = self.mute_action(|model| model.destroy(document)) {
                warn!(uri = ?uri, error = %cleanup, "failed to discard document");
            }
            return Err(err);
        }

        self.spread(document, Event::TreeChanged { source: document })?;
        debug!(uri = ?uri, document = %document, "document built");
        Ok(document)
    }

    fn populate(&mut self, document: EntityId, payload: &DocumentPayload) -> ModelResult<()> {
        for import in &payload.imports {
            let aliases = import
                .struct_aliases
                .iter()
                .map(|a| (a.name.clone(), a.alias.clone()))
                .collect();
            self.add_import(document, &import.uri, import.alias.as_deref(), aliases)?;
        }

        for structure in &payload.structs {
            let id = self.add_struct(document, &structure.name)?;
            for member in &structure.members {
                self.build_parameter(id, ParameterKind::StructProperty, member)?;
            }
        }

        for task in &payload.tasks {
            self.build_task(document, task)?;
        }
        for workflow in &payload.workflows {
            self.build_workflow(document, workflow)?;
        }

        // every executable exists now, so local targets resolve
        for call in self.find_all(document, |node| node.kind() == EntityKind::Call) {
            self.resolve_call_target(call)?;
        }
        Ok(())
    }

    fn build_parameter(
        &mut self,
        parent: EntityId,
        kind: ParameterKind,
        payload: &DeclarationPayload,
    ) -> ModelResult<EntityId> {
        let ty = payload.ty.as_deref().map(Type::parse).transpose()?;
        let id = self.add_parameter(parent, kind, &payload.name, ty)?;
        if let Some(expression) = &payload.expression {
            self.set_text(id, expression)?;
        }
        Ok(id)
    }

    fn build_task(&mut self, document: EntityId, payload: &TaskPayload) -> ModelResult<EntityId> {
        let task = self.add_task(document, &payload.name)?;
        for input in &payload.inputs {
            self.build_parameter(task, ParameterKind::Input, input)?;
        }
        for declaration in &payload.declarations {
            self.build_parameter(task, ParameterKind::Declaration, declaration)?;
        }
        for output in &payload.outputs {
            self.build_parameter(task, ParameterKind::Output, output)?;
        }
        if let Some(command) = &payload.command {
            self.set_command(task, &command.text, command.style)?;
        }

        let sections = [
            (MetaSection::Meta, &payload.meta),
            (MetaSection::ParameterMeta, &payload.parameter_meta),
            (MetaSection::Runtime, &payload.runtime),
        ];
        for (section, entries) in sections {
            for (key, value) in entries {
                self.set_meta(task, section, key, value)?;
            }
        }
        Ok(task)
    }

    fn build_workflow(
        &mut self,
        document: EntityId,
        payload: &WorkflowPayload,
    ) -> ModelResult<EntityId> {
        let workflow = self.add_workflow(document, &payload.name)?;
        for input in &payload.inputs {
            self.build_parameter(workflow, ParameterKind::Input, input)?;
        }
        self.build_body(workflow, &payload.body)?;
        for output in &payload.outputs {
            self.build_parameter(workflow, ParameterKind::Output, output)?;
        }

        for (section, entries) in [
            (MetaSection::Meta, &payload.meta),
            (MetaSection::ParameterMeta, &payload.parameter_meta),
        ] {
            for (key, value) in entries {
                self.set_meta(workflow, section, key, value)?;
            }
        }
        Ok(workflow)
    }

    fn build_body(&mut self, parent: EntityId, body: &[WorkflowElement]) -> ModelResult<()> {
        for element in body {
            match element {
                WorkflowElement::Declaration(declaration) => {
                    self.build_parameter(parent, ParameterKind::Declaration, declaration)?;
                }
                WorkflowElement::Call(call) => {
                    self.build_call(parent, call)?;
                }
                WorkflowElement::Scatter(scatter) => {
                    let id = self.add_scatter(parent, &scatter.variable, &scatter.collection)?;
                    self.build_body(id, &scatter.body)?;
                }
                WorkflowElement::Conditional(conditional) => {
                    let id = self.add_conditional(parent, &conditional.condition)?;
                    self.build_body(id, &conditional.body)?;
                }
            }
        }
        Ok(())
    }

    /// Call inputs are created unmirrored; resolving the target adopts them
    /// by name
    fn build_call(&mut self, parent: EntityId, payload: &CallPayload) -> ModelResult<EntityId> {
        let call = self.create(EntityKind::Call, Some(&payload.target))?;
        self.node_mut(call)?.alias = payload.alias.clone();
        if let Err(err) = self.set_parent(call, Some(parent)) {
            self.mark_destroyed(call);
            return Err(err);
        }
        for input in &payload.inputs {
            let id = self.add_parameter(call, ParameterKind::Input, &input.name, None)?;
            if let Some(expression) = &input.expression {
                self.set_text(id, expression)?;
            }
        }
        Ok(call)
    }
}
