//! Test helpers shared by the end-to-end tests

use crate::model::{EntityId, EntityKind, Model, ParameterKind};
use crate::payload::{DocumentParser, JsonDocumentParser};
use crate::types::Type;
use crate::validation::Issue;

/// Two tasks chained through a scatter, plus a conditional; validates clean
pub const PIPELINE: &str = r#"{
    "version": "1.0",
    "tasks": [
        {
            "name": "split",
            "inputs": [{"name": "data", "type": "File"}],
            "outputs": [{"name": "chunks", "type": "Array[File]", "expression": "glob(\"*.part\")"}],
            "command": {"text": "split ~{data}"}
        },
        {
            "name": "count",
            "inputs": [
                {"name": "chunk", "type": "File"},
                {"name": "verbose", "type": "Boolean?"}
            ],
            "outputs": [{"name": "lines", "type": "Int", "expression": "read_int(stdout())"}],
            "command": {"text": "wc -l < ~{chunk}", "style": "here_doc"}
        }
    ],
    "workflows": [{
        "name": "wf",
        "inputs": [
            {"name": "data", "type": "File"},
            {"name": "threshold", "type": "Int", "expression": "10"}
        ],
        "body": [
            {"kind": "call", "target": "split", "inputs": [{"name": "data", "expression": "data"}]},
            {"kind": "scatter", "variable": "chunk", "collection": "split.chunks", "body": [
                {"kind": "call", "target": "count", "inputs": [{"name": "chunk", "expression": "chunk"}]},
                {"kind": "declaration", "name": "doubled", "type": "Int", "expression": "count.lines * 2"}
            ]},
            {"kind": "conditional", "condition": "threshold > 5", "body": [
                {"kind": "declaration", "name": "note", "type": "String", "expression": "\"big\""}
            ]}
        ],
        "outputs": [
            {"name": "totals", "type": "Array[Int]", "expression": "count.lines"},
            {"name": "doubles", "type": "Array[Int]", "expression": "doubled"}
        ]
    }]
}"#;

pub struct Fixture {
    pub document: EntityId,
    pub workflow: EntityId,
}

pub fn pipeline() -> (Model, Fixture) {
    let payload = JsonDocumentParser.parse(PIPELINE).expect("fixture payload");
    let mut model = Model::new();
    let document = model
        .build_document(&payload, Some("pipeline.wdl"))
        .expect("fixture builds");
    let workflow = model.find_executable(document, "wf").expect("workflow wf");
    (model, Fixture { document, workflow })
}

pub fn param(
    model: &mut Model,
    parent: EntityId,
    kind: ParameterKind,
    name: &str,
    ty: &str,
) -> EntityId {
    model
        .add_parameter(parent, kind, name, Some(Type::parse(ty).expect("type")))
        .expect("parameter")
}

pub fn errors(issues: &[Issue]) -> Vec<&Issue> {
    issues.iter().filter(|issue| issue.is_error()).collect()
}

/// Parameters under `root` that are not call mirrors
pub fn own_parameters(model: &Model, root: EntityId) -> Vec<EntityId> {
    model.find_all(root, |node| {
        matches!(node.kind(), EntityKind::Parameter(_))
            && node.parent().is_some_and(|p| p.kind() != EntityKind::Call)
    })
}
