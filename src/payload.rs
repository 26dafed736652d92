//! Construction payload
//!
//! The shape a WDL parser hands to the model: a plain nested structure that
//! mirrors the entity hierarchy. The model never parses document text
//! itself; [`DocumentParser`] is the injection point for whatever produces
//! this structure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::model::CommandStyle;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentPayload {
    pub version: Option<String>,
    pub imports: Vec<ImportPayload>,
    pub structs: Vec<StructPayload>,
    pub tasks: Vec<TaskPayload>,
    pub workflows: Vec<WorkflowPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPayload {
    pub uri: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub struct_aliases: Vec<StructAliasPayload>,
}

/// `alias Foo as Bar`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructAliasPayload {
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructPayload {
    pub name: String,
    #[serde(default)]
    pub members: Vec<DeclarationPayload>,
}

/// Any typed, named value: input, declaration, output or struct member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationPayload {
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    #[serde(default)]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<DeclarationPayload>,
    #[serde(default)]
    pub declarations: Vec<DeclarationPayload>,
    #[serde(default)]
    pub outputs: Vec<DeclarationPayload>,
    #[serde(default)]
    pub command: Option<CommandPayload>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(default)]
    pub parameter_meta: BTreeMap<String, String>,
    #[serde(default)]
    pub runtime: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub text: String,
    #[serde(default)]
    pub style: CommandStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPayload {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<DeclarationPayload>,
    #[serde(default)]
    pub outputs: Vec<DeclarationPayload>,
    /// Declarations, calls, scatters and conditionals, in source order
    #[serde(default)]
    pub body: Vec<WorkflowElement>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(default)]
    pub parameter_meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowElement {
    Declaration(DeclarationPayload),
    Call(CallPayload),
    Scatter(ScatterPayload),
    Conditional(ConditionalPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPayload {
    /// `name` or `namespace.name`
    pub target: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub inputs: Vec<CallInputPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallInputPayload {
    pub name: String,
    #[serde(default)]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPayload {
    pub variable: String,
    pub collection: String,
    #[serde(default)]
    pub body: Vec<WorkflowElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalPayload {
    pub condition: String,
    #[serde(default)]
    pub body: Vec<WorkflowElement>,
}

/// Turns document text into a construction payload
pub trait DocumentParser {
    fn parse(&self, text: &str) -> ModelResult<DocumentPayload>;
}

/// Reads payloads serialized as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentParser;

impl DocumentParser for JsonDocumentParser {
    fn parse(&self, text: &str) -> ModelResult<DocumentPayload> {
        Ok(serde_json::from_str(text)?)
    }
}
