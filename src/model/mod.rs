//! Entity graph
//!
//! All entities of all documents live in one arena, [`Model`], keyed by
//! [`EntityId`]. Parent pointers, child lists and expression connections are
//! id-based edges into that arena, so the (possibly cyclic) connection graph
//! never owns anything.
//!
//! # Kinds
//!
//! ```text
//! Document ─┬─ Import
//!           ├─ Struct ── StructProperty
//!           ├─ Task ──┬─ Input / Declaration / Output
//!           │         └─ Command
//!           └─ Workflow ─┬─ Input / Declaration / Output
//!                        ├─ Call ── Input / Output (mirrors of the callee)
//!                        ├─ Scatter ──┬─ ScatterIterator
//!                        │            └─ (workflow body)
//!                        └─ Conditional ─┬─ Expression
//!                                        └─ (workflow body)
//! ```
//!
//! Parameters are one struct carrying a [`ParameterKind`] tag; the tag picks
//! the validation and binding-legality rules that apply.

mod action;
mod builder;
mod document;
mod executable;
mod parameter;
mod reactions;
mod structs;
mod tree;

use std::collections::{HashMap, HashSet};
use std::fmt;

use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::events::{DispatchState, Event, EventBus};
use crate::expression::{DependencyExtractor, ExpressionData, PestExtractor};
use crate::validation::{Issue, Validator};

pub use action::CallData;
pub use document::{DocumentData, ImportData};
pub use executable::{CommandData, CommandStyle, ExecutableData, MetaSection};
pub use parameter::ParameterData;


/* ===================== Kinds ===================== */

/// Variants of [`ParameterData`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterKind {
    Input,
    Declaration,
    Output,
    StructProperty,
    ScatterIterator,
}

/// Context kind of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Document,
    Import,
    Struct,
    Task,
    Workflow,
    Call,
    Scatter,
    Conditional,
    Command,
    /// A bare expression (the condition of a Conditional)
    Expression,
    Parameter(ParameterKind),
}

impl EntityKind {
    pub const INPUT: EntityKind = EntityKind::Parameter(ParameterKind::Input);
    pub const DECLARATION: EntityKind = EntityKind::Parameter(ParameterKind::Declaration);
    pub const OUTPUT: EntityKind = EntityKind::Parameter(ParameterKind::Output);
    pub const STRUCT_PROPERTY: EntityKind = EntityKind::Parameter(ParameterKind::StructProperty);
    pub const SCATTER_ITERATOR: EntityKind =
        EntityKind::Parameter(ParameterKind::ScatterIterator);

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Document => "document",
            EntityKind::Import => "import",
            EntityKind::Struct => "struct",
            EntityKind::Task => "task",
            EntityKind::Workflow => "workflow",
            EntityKind::Call => "call",
            EntityKind::Scatter => "scatter",
            EntityKind::Conditional => "conditional",
            EntityKind::Command => "command",
            EntityKind::Expression => "expression",
            EntityKind::Parameter(ParameterKind::Input) => "input",
            EntityKind::Parameter(ParameterKind::Declaration) => "declaration",
            EntityKind::Parameter(ParameterKind::Output) => "output",
            EntityKind::Parameter(ParameterKind::StructProperty) => "struct_property",
            EntityKind::Parameter(ParameterKind::ScatterIterator) => "scatter_iterator",
        }
    }

    /// Kinds whose constructor requires a name
    pub fn requires_name(&self) -> bool {
        matches!(
            self,
            EntityKind::Struct
                | EntityKind::Task
                | EntityKind::Workflow
                | EntityKind::Call
                | EntityKind::Parameter(_)
        )
    }

    /// Task, Workflow, Call, Scatter and Conditional
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            EntityKind::Task
                | EntityKind::Workflow
                | EntityKind::Call
                | EntityKind::Scatter
                | EntityKind::Conditional
        )
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, EntityKind::Task | EntityKind::Workflow)
    }

    /// Kinds whose changes are visible to the whole document (and to every
    /// entity's struct types)
    pub fn is_document_wide(&self) -> bool {
        matches!(
            self,
            EntityKind::Document
                | EntityKind::Import
                | EntityKind::Struct
                | EntityKind::Task
                | EntityKind::Workflow
                | EntityKind::Parameter(ParameterKind::StructProperty)
        )
    }

    /// Entities carrying an [`ExpressionData`]
    pub fn is_expression(&self) -> bool {
        matches!(self, EntityKind::Expression | EntityKind::Parameter(_))
    }

    pub fn parameter_kind(&self) -> Option<ParameterKind> {
        match self {
            EntityKind::Parameter(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ===================== Identity ===================== */

/// Stable entity identifier, generated per concrete kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    kind: EntityKind,
    uuid: Uuid,
}

impl EntityId {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            uuid: Uuid::new_v4(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.uuid)
    }
}

/* ===================== Nodes ===================== */

/// Kind-specific state
#[derive(Debug, Clone)]
pub(crate) enum EntityData {
    None,
    Document(DocumentData),
    Import(ImportData),
    Executable(ExecutableData),
    Call(CallData),
    Command(CommandData),
    Expression(ExpressionData),
    Parameter(ParameterData),
}

impl EntityData {
    fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Document => EntityData::Document(DocumentData::default()),
            EntityKind::Import => EntityData::Import(ImportData::default()),
            EntityKind::Task | EntityKind::Workflow => {
                EntityData::Executable(ExecutableData::default())
            }
            EntityKind::Call => EntityData::Call(CallData::default()),
            EntityKind::Command => EntityData::Command(CommandData::default()),
            EntityKind::Expression => EntityData::Expression(ExpressionData::default()),
            EntityKind::Parameter(kind) => EntityData::Parameter(ParameterData::new(kind)),
            EntityKind::Struct | EntityKind::Scatter | EntityKind::Conditional => EntityData::None,
        }
    }
}

/// One entity in the arena
#[derive(Debug)]
pub struct EntityNode {
    pub(crate) id: EntityId,
    pub(crate) name: Option<String>,
    pub(crate) alias: Option<String>,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    /// Issues found on this entity alone
    pub(crate) issues: Vec<Issue>,
    pub(crate) bus: EventBus,
    pub(crate) muted: usize,
    pub(crate) data: EntityData,
}

impl EntityNode {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.id.kind()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn own_issues(&self) -> &[Issue] {
        &self.issues
    }

    pub(crate) fn expression(&self) -> Option<&ExpressionData> {
        match &self.data {
            EntityData::Expression(expression) => Some(expression),
            EntityData::Parameter(parameter) => Some(&parameter.expression),
            _ => None,
        }
    }

    pub(crate) fn expression_mut(&mut self) -> Option<&mut ExpressionData> {
        match &mut self.data {
            EntityData::Expression(expression) => Some(expression),
            EntityData::Parameter(parameter) => Some(&mut parameter.expression),
            _ => None,
        }
    }
}

/* ===================== Model ===================== */

/// The arena holding every entity, plus the event dispatcher and the
/// injected collaborators (dependency extractor, validator)
pub struct Model {
    pub(crate) entities: HashMap<EntityId, EntityNode>,
    destroyed: HashSet<EntityId>,
    documents: Vec<EntityId>,
    pub(crate) extractor: Box<dyn DependencyExtractor>,
    pub(crate) validator: Validator,
    pub(crate) dispatch: DispatchState,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("entities", &self.entities.len())
            .field("documents", &self.documents)
            .finish()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Create an empty model using the built-in WDL expression extractor
    pub fn new() -> Self {
        Self::with_extractor(Box::new(PestExtractor))
    }

    /// Create an empty model with an injected dependency extractor
    pub fn with_extractor(extractor: Box<dyn DependencyExtractor>) -> Self {
        Self {
            entities: HashMap::new(),
            destroyed: HashSet::new(),
            documents: Vec::new(),
            extractor,
            validator: Validator::new(),
            dispatch: DispatchState::default(),
        }
    }

    /// Typed constructor
    ///
    /// Creates a detached entity of `kind`. Name-bearing kinds require a name
    /// (which may still be empty; that is a validation issue, not a failure).
    pub fn create(&mut self, kind: EntityKind, name: Option<&str>) -> ModelResult<EntityId> {
        if kind.requires_name() && name.is_none() {
            return Err(ModelError::MissingOption {
                kind,
                option: "name",
            });
        }

        let id = EntityId::new(kind);
        self.entities.insert(
            id,
            EntityNode {
                id,
                name: name.map(str::to_string),
                alias: None,
                parent: None,
                children: Vec::new(),
                issues: Vec::new(),
                bus: EventBus::new(),
                muted: 0,
                data: EntityData::for_kind(kind),
            },
        );
        if kind == EntityKind::Document {
            self.documents.push(id);
        }
        reactions::install(self, id)?;
        Ok(id)
    }

    /* ===================== Lookup ===================== */

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn is_destroyed(&self, id: EntityId) -> bool {
        self.destroyed.contains(&id)
    }

    pub fn entity(&self, id: EntityId) -> ModelResult<&EntityNode> {
        self.entities.get(&id).ok_or_else(|| self.missing(id))
    }

    pub(crate) fn node(&self, id: EntityId) -> ModelResult<&EntityNode> {
        self.entity(id)
    }

    pub(crate) fn node_mut(&mut self, id: EntityId) -> ModelResult<&mut EntityNode> {
        let missing = self.missing(id);
        self.entities.get_mut(&id).ok_or(missing)
    }

    pub(crate) fn ensure_live(&self, id: EntityId) -> ModelResult<()> {
        self.entity(id).map(|_| ())
    }

    fn missing(&self, id: EntityId) -> ModelError {
        if self.destroyed.contains(&id) {
            ModelError::Destroyed(id)
        } else {
            ModelError::UnknownEntity(id)
        }
    }

    /// Name of an entity; `None` for unnamed or unknown entities
    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(&id).and_then(|node| node.name())
    }

    pub fn alias(&self, id: EntityId) -> Option<&str> {
        self.entities.get(&id).and_then(|node| node.alias())
    }

    /// Documents in creation order
    pub fn documents(&self) -> &[EntityId] {
        &self.documents
    }

    /// Children of `id` with the given kind, in order
    pub fn children_of_kind(&self, id: EntityId, kind: EntityKind) -> Vec<EntityId> {
        self.entities
            .get(&id)
            .map(|node| {
                node.children
                    .iter()
                    .copied()
                    .filter(|child| child.kind() == kind)
                    .collect()
            })
            .unwrap_or_default()
    }

    /* ===================== Naming ===================== */

    /// Rename an entity
    ///
    /// Dependents that reference a renamed parameter have their expression
    /// text rewritten and stay connected.
    pub fn rename(&mut self, id: EntityId, name: &str) -> ModelResult<()> {
        let node = self.node_mut(id)?;
        if node.name.as_deref() == Some(name) {
            return Ok(());
        }
        let old = node.name.replace(name.to_string());
        self.after_rename(id, old.as_deref())?;
        let new = Some(name.to_string());
        self.emit(id, Event::NameChanged { old, new });
        Ok(())
    }

    /// Set or clear the alias (calls and imports)
    pub fn set_alias(&mut self, id: EntityId, alias: Option<&str>) -> ModelResult<()> {
        let node = self.node_mut(id)?;
        if node.alias.as_deref() == alias {
            return Ok(());
        }
        let old = std::mem::replace(&mut node.alias, alias.map(str::to_string));
        self.after_alias_change(id, old.as_deref())?;
        let new = alias.map(str::to_string);
        self.emit(id, Event::AliasChanged { old, new });
        Ok(())
    }

    pub(crate) fn mark_destroyed(&mut self, id: EntityId) {
        self.entities.remove(&id);
        self.documents.retain(|doc| *doc != id);
        self.destroyed.insert(id);
    }
}
