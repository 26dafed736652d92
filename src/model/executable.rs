//! Tasks and workflows: meta sections, commands, call-site bookkeeping

use serde::{Deserialize, Serialize};

use super::{EntityData, EntityId, EntityKind, Model};
use crate::error::{ModelError, ModelResult};
use crate::events::Event;

/// Ordered string maps attached to an executable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaSection {
    Meta,
    ParameterMeta,
    /// Tasks only
    Runtime,
}

impl MetaSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaSection::Meta => "meta",
            MetaSection::ParameterMeta => "parameter_meta",
            MetaSection::Runtime => "runtime",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutableData {
    pub(crate) meta: Vec<(String, String)>,
    pub(crate) parameter_meta: Vec<(String, String)>,
    pub(crate) runtime: Vec<(String, String)>,
    /// Calls currently targeting this executable; not owned
    pub(crate) call_sites: Vec<EntityId>,
}

impl ExecutableData {
    fn section(&self, section: MetaSection) -> &Vec<(String, String)> {
        match section {
            MetaSection::Meta => &self.meta,
            MetaSection::ParameterMeta => &self.parameter_meta,
            MetaSection::Runtime => &self.runtime,
        }
    }

    fn section_mut(&mut self, section: MetaSection) -> &mut Vec<(String, String)> {
        match section {
            MetaSection::Meta => &mut self.meta,
            MetaSection::ParameterMeta => &mut self.parameter_meta,
            MetaSection::Runtime => &mut self.runtime,
        }
    }
}

/// Bracket style of a task command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStyle {
    /// `command { ... }`
    #[default]
    Braces,
    /// `command <<< ... >>>`
    HereDoc,
}

impl CommandStyle {
    pub fn brackets(&self) -> (&'static str, &'static str) {
        match self {
            CommandStyle::Braces => ("{", "}"),
            CommandStyle::HereDoc => ("<<<", ">>>"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandData {
    pub(crate) text: String,
    pub(crate) style: CommandStyle,
}

impl CommandData {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> CommandStyle {
        self.style
    }
}

impl Model {
    /* ===================== Construction ===================== */

    pub fn add_task(&mut self, document: EntityId, name: &str) -> ModelResult<EntityId> {
        self.add_child(document, EntityKind::Task, Some(name))
    }

    pub fn add_workflow(&mut self, document: EntityId, name: &str) -> ModelResult<EntityId> {
        self.add_child(document, EntityKind::Workflow, Some(name))
    }

    /// Create an entity and attach it, discarding it when the parent refuses
    pub(crate) fn add_child(
        &mut self,
        parent: EntityId,
        kind: EntityKind,
        name: Option<&str>,
    ) -> ModelResult<EntityId> {
        self.ensure_live(parent)?;
        let id = self.create(kind, name)?;
        if let Err(err) = self.set_parent(id, Some(parent)) {
            self.mark_destroyed(id);
            return Err(err);
        }
        Ok(id)
    }

    fn executable(&self, id: EntityId) -> ModelResult<&ExecutableData> {
        match &self.node(id)?.data {
            EntityData::Executable(executable) => Ok(executable),
            _ => Err(ModelError::WrongKind {
                id,
                expected: "task or workflow",
            }),
        }
    }

    fn executable_mut(&mut self, id: EntityId) -> ModelResult<&mut ExecutableData> {
        match &mut self.node_mut(id)?.data {
            EntityData::Executable(executable) => Ok(executable),
            _ => Err(ModelError::WrongKind {
                id,
                expected: "task or workflow",
            }),
        }
    }

    /* ===================== Meta ===================== */

    pub fn meta(&self, id: EntityId, section: MetaSection) -> ModelResult<&[(String, String)]> {
        Ok(self.executable(id)?.section(section))
    }

    pub fn meta_value(&self, id: EntityId, section: MetaSection, key: &str) -> Option<&str> {
        self.executable(id)
            .ok()?
            .section(section)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace `key`, keeping the position of an existing entry
    pub fn set_meta(
        &mut self,
        id: EntityId,
        section: MetaSection,
        key: &str,
        value: &str,
    ) -> ModelResult<()> {
        if section == MetaSection::Runtime && id.kind() != EntityKind::Task {
            return Err(ModelError::WrongKind {
                id,
                expected: "task",
            });
        }
        let entries = self.executable_mut(id)?.section_mut(section);
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) if *existing == value => return Ok(()),
            Some((_, existing)) => *existing = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
        self.emit(
            id,
            Event::MetaChanged {
                key: key.to_string(),
            },
        );
        Ok(())
    }

    pub fn remove_meta(
        &mut self,
        id: EntityId,
        section: MetaSection,
        key: &str,
    ) -> ModelResult<Option<String>> {
        let entries = self.executable_mut(id)?.section_mut(section);
        let Some(position) = entries.iter().position(|(k, _)| k == key) else {
            return Ok(None);
        };
        let (_, value) = entries.remove(position);
        self.emit(
            id,
            Event::MetaChanged {
                key: key.to_string(),
            },
        );
        Ok(Some(value))
    }

    /* ===================== Command ===================== */

    /// The task's command entity, if any
    pub fn command(&self, task: EntityId) -> Option<EntityId> {
        self.children_of_kind(task, EntityKind::Command).first().copied()
    }

    pub fn command_data(&self, task: EntityId) -> Option<&CommandData> {
        let command = self.command(task)?;
        match &self.entities.get(&command)?.data {
            EntityData::Command(data) => Some(data),
            _ => None,
        }
    }

    /// Set the command text, creating the command entity on first use
    pub fn set_command(
        &mut self,
        task: EntityId,
        text: &str,
        style: CommandStyle,
    ) -> ModelResult<EntityId> {
        if self.node(task)?.kind() != EntityKind::Task {
            return Err(ModelError::WrongKind {
                id: task,
                expected: "task",
            });
        }
        let command = match self.command(task) {
            Some(command) => command,
            None => self.add_child(task, EntityKind::Command, None)?,
        };

        if let EntityData::Command(data) = &mut self.node_mut(command)?.data {
            if data.text == text && data.style == style {
                return Ok(command);
            }
            data.text = text.to_string();
            data.style = style;
        }
        self.emit(command, Event::CommandChanged);
        Ok(command)
    }

    /* ===================== Call sites ===================== */

    /// Calls currently resolved to `executable`
    pub fn call_sites(&self, executable: EntityId) -> Vec<EntityId> {
        self.executable(executable)
            .map(|data| data.call_sites.clone())
            .unwrap_or_default()
    }

    pub(crate) fn register_call_site(&mut self, executable: EntityId, call: EntityId) {
        if let Ok(data) = self.executable_mut(executable) {
            if !data.call_sites.contains(&call) {
                data.call_sites.push(call);
            }
        }
    }

    /// Forget `call` on whichever executable it is registered with
    pub(crate) fn unregister_call_site(&mut self, call: EntityId) {
        let Some(callee) = self.callee(call) else {
            return;
        };
        if let Ok(data) = self.executable_mut(callee) {
            data.call_sites.retain(|site| *site != call);
        }
    }

    /// Bring every call targeting `executable` in line with its parameters
    pub(crate) fn sync_call_sites(&mut self, executable: EntityId) -> ModelResult<()> {
        for site in self.call_sites(executable) {
            if self.contains(site) {
                self.sync_call(site)?;
            }
        }
        Ok(())
    }
}
