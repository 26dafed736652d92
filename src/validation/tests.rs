//! Tests for the validation rules and the issue API

use std::cell::Cell;
use std::rc::Rc;

use super::*;
use crate::model::ParameterKind;
use crate::types::Type;

// ============================================================================
// Helper Functions
// ============================================================================

fn param(model: &mut Model, parent: EntityId, kind: ParameterKind, name: &str, ty: &str) -> EntityId {
    let ty = (!ty.is_empty()).then(|| Type::parse(ty).unwrap());
    model.add_parameter(parent, kind, name, ty).unwrap()
}

fn setup() -> (Model, EntityId, EntityId) {
    let mut model = Model::new();
    let doc = model.create_document(Some("main.wdl"), Some("1.0")).unwrap();
    let wf = model.add_workflow(doc, "wf").unwrap();
    (model, doc, wf)
}

/// Rule ids reported on `id` alone
fn rules_on(model: &Model, id: EntityId) -> Vec<&'static str> {
    model
        .own_issues(id)
        .unwrap()
        .iter()
        .map(|issue| issue.rule_id)
        .collect()
}

fn has_rule(model: &Model, id: EntityId, rule: &str) -> bool {
    rules_on(model, id).contains(&rule)
}

/// Counts how often it runs on the kinds it is given
struct CountingRule {
    kinds: Vec<EntityKind>,
    runs: Rc<Cell<usize>>,
}

impl ValidationRule for CountingRule {
    fn id(&self) -> &'static str {
        "counting"
    }

    fn description(&self) -> &'static str {
        "Counts its runs"
    }

    fn applies_to(&self, kind: EntityKind) -> bool {
        self.kinds.contains(&kind)
    }

    fn validate(&self, _: &Model, _: EntityId) -> Vec<Issue> {
        self.runs.set(self.runs.get() + 1);
        Vec::new()
    }
}

/// Swap in a validator that only counts its runs on `kinds`
fn count_validations(model: &mut Model, kinds: &[EntityKind]) -> Rc<Cell<usize>> {
    let runs = Rc::new(Cell::new(0));
    model.set_validator(Validator::with_rules(vec![Box::new(CountingRule {
        kinds: kinds.to_vec(),
        runs: runs.clone(),
    })]));
    runs
}

// ============================================================================
// Names
// ============================================================================

#[test]
fn test_missing_name() {
    let (mut model, doc, _) = setup();
    let task = model.add_task(doc, "t").unwrap();
    assert!(!has_rule(&model, task, "missing-name"));

    model.rename(task, "").unwrap();
    assert!(has_rule(&model, task, "missing-name"));
}

#[test]
fn test_reserved_and_malformed_names() {
    let (mut model, _, wf) = setup();
    let reserved = param(&mut model, wf, ParameterKind::Declaration, "input", "Int");
    let malformed = param(&mut model, wf, ParameterKind::Declaration, "my-value", "Int");
    let fine = param(&mut model, wf, ParameterKind::Declaration, "my_value", "Int");
    model.validate(wf).unwrap();

    let issue = &model.own_issues(reserved).unwrap()[0];
    assert_eq!(issue.rule_id, "invalid-name");
    assert_eq!(issue.message, "'input' is a reserved word");
    assert!(has_rule(&model, malformed, "invalid-name"));
    assert!(!has_rule(&model, fine, "invalid-name"));
}

#[test]
fn test_call_names_are_checked_per_segment() {
    let (mut model, doc, wf) = setup();
    model.add_task(doc, "t").unwrap();
    let good = model.add_call(wf, "lib.t", None).unwrap();
    let bad_alias = model.add_call(wf, "t", Some("9lives")).unwrap();
    model.validate(wf).unwrap();

    assert!(!has_rule(&model, good, "invalid-name"));
    assert!(has_rule(&model, bad_alias, "invalid-name"));
}

// ============================================================================
// Duplicates
// ============================================================================

#[test]
fn test_duplicate_call_aliases() {
    let (mut model, doc, wf) = setup();
    model.add_task(doc, "a").unwrap();
    model.add_task(doc, "b").unwrap();
    let first = model.add_call(wf, "a", Some("step1")).unwrap();
    let second = model.add_call(wf, "b", Some("step1")).unwrap();

    assert!(has_rule(&model, first, "duplicate-name"));
    assert!(has_rule(&model, second, "duplicate-name"));

    model.set_alias(second, Some("step2")).unwrap();
    assert!(!has_rule(&model, first, "duplicate-name"));
    assert!(!has_rule(&model, second, "duplicate-name"));
}

#[test]
fn test_workflow_namespace_spans_nested_scopes() {
    let (mut model, _, wf) = setup();
    let outer = param(&mut model, wf, ParameterKind::Declaration, "x", "Int");
    let scatter = model.add_scatter(wf, "i", "[1]").unwrap();
    let inner = param(&mut model, scatter, ParameterKind::Declaration, "x", "Int");

    assert!(has_rule(&model, outer, "duplicate-name"));
    assert!(has_rule(&model, inner, "duplicate-name"));

    model.destroy(inner).unwrap();
    assert!(!has_rule(&model, outer, "duplicate-name"));
}

#[test]
fn test_outputs_have_their_own_namespace() {
    let (mut model, doc, wf) = setup();
    let input = param(&mut model, wf, ParameterKind::Input, "x", "Int");
    let output = param(&mut model, wf, ParameterKind::Output, "x", "Int");
    let task = model.add_task(doc, "t").unwrap();
    let task_input = param(&mut model, task, ParameterKind::Input, "x", "Int");
    model.validate(doc).unwrap();

    assert!(!has_rule(&model, input, "duplicate-name"));
    assert!(!has_rule(&model, output, "duplicate-name"));
    assert!(!has_rule(&model, task_input, "duplicate-name"));
}

#[test]
fn test_duplicate_executables() {
    let (mut model, doc, wf) = setup();
    let task = model.add_task(doc, "wf").unwrap();

    assert!(has_rule(&model, task, "duplicate-name"));
    assert!(has_rule(&model, wf, "duplicate-name"));
}

// ============================================================================
// Types
// ============================================================================

#[test]
fn test_missing_type_skips_derived_parameters() {
    let (mut model, doc, wf) = setup();
    let untyped = param(&mut model, wf, ParameterKind::Declaration, "d", "");
    let task = model.add_task(doc, "t").unwrap();
    param(&mut model, task, ParameterKind::Input, "a", "");
    let call = model.add_call(wf, "t", None).unwrap();
    let scatter = model.add_scatter(wf, "i", "[1]").unwrap();
    model.validate(doc).unwrap();

    assert!(has_rule(&model, untyped, "missing-type"));
    let mirror = model.children_of_kind(call, EntityKind::INPUT)[0];
    assert!(!has_rule(&model, mirror, "missing-type"));
    let iterator = model.scatter_iterator(scatter).unwrap();
    assert!(!has_rule(&model, iterator, "missing-type"));
}

#[test]
fn test_unknown_struct_clears_when_defined() {
    let (mut model, doc, wf) = setup();
    let input = param(&mut model, wf, ParameterKind::Input, "s", "Array[Sample]?");
    assert_eq!(model.own_issues(input).unwrap()[0].message, "unknown struct 'Sample'");

    model.add_struct(doc, "Sample").unwrap();
    assert!(!has_rule(&model, input, "unknown-struct"));
}

#[test]
fn test_type_mismatch_on_resolved_reference() {
    let (mut model, _, wf) = setup();
    param(&mut model, wf, ParameterKind::Input, "xs", "Array[Int]");
    let wrong = param(&mut model, wf, ParameterKind::Declaration, "y", "Int");
    model.set_text(wrong, "xs").unwrap();

    assert!(has_rule(&model, wrong, "type-mismatch"));

    model.set_type(wrong, Some(Type::parse("Array[Int]").unwrap())).unwrap();
    assert!(!has_rule(&model, wrong, "type-mismatch"));
}

#[test]
fn test_type_mismatch_ignores_compound_expressions() {
    let (mut model, _, wf) = setup();
    param(&mut model, wf, ParameterKind::Input, "xs", "Array[Int]");
    let count = param(&mut model, wf, ParameterKind::Declaration, "n", "Int");
    model.set_text(count, "length(xs)").unwrap();

    assert!(!has_rule(&model, count, "type-mismatch"));
}

// ============================================================================
// Values and Expressions
// ============================================================================

#[test]
fn test_missing_values() {
    let (mut model, doc, wf) = setup();
    let input = param(&mut model, wf, ParameterKind::Input, "n", "Int");
    let declaration = param(&mut model, wf, ParameterKind::Declaration, "d", "Int");
    let output = param(&mut model, wf, ParameterKind::Output, "o", "Int");
    model.validate(doc).unwrap();

    assert!(!has_rule(&model, input, "missing-value"));
    assert!(has_rule(&model, declaration, "missing-value"));
    assert!(has_rule(&model, output, "missing-value"));

    model.set_text(declaration, "n").unwrap();
    assert!(!has_rule(&model, declaration, "missing-value"));
}

#[test]
fn test_required_call_inputs() {
    let (mut model, doc, wf) = setup();
    let task = model.add_task(doc, "t").unwrap();
    param(&mut model, task, ParameterKind::Input, "required", "Int");
    param(&mut model, task, ParameterKind::Input, "optional", "Int?");
    let defaulted = param(&mut model, task, ParameterKind::Input, "defaulted", "Int");
    model.set_text(defaulted, "1").unwrap();
    param(&mut model, task, ParameterKind::Output, "o", "Int");
    let call = model.add_call(wf, "t", None).unwrap();
    model.validate(doc).unwrap();

    let flagged: Vec<&str> = model
        .children(call)
        .iter()
        .filter(|p| has_rule(&model, **p, "missing-value"))
        .filter_map(|p| model.name(*p))
        .collect();
    assert_eq!(flagged, vec!["required"]);
}

#[test]
fn test_scatter_without_collection() {
    let (mut model, _, wf) = setup();
    let scatter = model.add_scatter(wf, "i", "").unwrap();
    let iterator = model.scatter_iterator(scatter).unwrap();

    let issue = model
        .own_issues(iterator)
        .unwrap()
        .iter()
        .find(|issue| issue.rule_id == "missing-value")
        .cloned()
        .unwrap();
    assert_eq!(issue.message, "scatter over 'i' has no collection");
}

#[test]
fn test_invalid_expression() {
    let (mut model, _, wf) = setup();
    let d = param(&mut model, wf, ParameterKind::Declaration, "d", "Int");
    model.set_text(d, "1 +").unwrap();

    assert!(has_rule(&model, d, "invalid-expression"));
    model.set_text(d, "1 + 2").unwrap();
    assert!(!has_rule(&model, d, "invalid-expression"));
}

#[test]
fn test_unknown_identifier_message() {
    let (mut model, _, wf) = setup();
    let d = param(&mut model, wf, ParameterKind::Declaration, "d", "Int");
    model.set_text(d, "missing + 1").unwrap();

    let issues = model.own_issues(d).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].message, "unknown identifier 'missing'");
    assert_eq!(issues[0].severity, Severity::Error);
}

#[test]
fn test_illegal_reference() {
    let (mut model, _, wf) = setup();
    param(&mut model, wf, ParameterKind::Declaration, "d", "Int");
    let input = param(&mut model, wf, ParameterKind::Input, "n", "Int");
    model.set_text(input, "d").unwrap();

    assert!(has_rule(&model, input, "illegal-reference"));
    assert!(!has_rule(&model, input, "unknown-identifier"));
}

// ============================================================================
// Bodies, Calls and Imports
// ============================================================================

#[test]
fn test_empty_command_is_a_warning() {
    let (mut model, doc, _) = setup();
    let task = model.add_task(doc, "t").unwrap();
    let command = model.set_command(task, "  \n ", Default::default()).unwrap();

    let issue = &model.own_issues(command).unwrap()[0];
    assert_eq!(issue.rule_id, "empty-command");
    assert_eq!(issue.severity, Severity::Warning);

    model.set_command(task, "echo hi", Default::default()).unwrap();
    assert!(model.own_issues(command).unwrap().is_empty());
}

#[test]
fn test_empty_conditional() {
    let (mut model, _, wf) = setup();
    let conditional = model.add_conditional(wf, "").unwrap();
    assert!(has_rule(&model, conditional, "empty-conditional"));

    let condition = model.condition(conditional).unwrap();
    model.set_text(condition, "true").unwrap();
    assert!(!has_rule(&model, conditional, "empty-conditional"));
}

#[test]
fn test_unknown_call_target() {
    let (mut model, doc, wf) = setup();
    let call = model.add_call(wf, "nothing", None).unwrap();
    assert_eq!(
        model.own_issues(call).unwrap()[0].message,
        "no task or workflow named 'nothing'"
    );

    model.add_task(doc, "nothing").unwrap();
    assert!(!has_rule(&model, call, "unknown-call-target"));
}

#[test]
fn test_failed_import() {
    let (mut model, doc, _) = setup();
    let import = model.add_import(doc, "missing.wdl", None, Vec::new()).unwrap();

    model
        .set_import_document(import, Err("file not found".to_string()))
        .unwrap();
    assert!(has_rule(&model, import, "import-failed"));

    let library = model.create_document(Some("missing.wdl"), None).unwrap();
    model.set_import_document(import, Ok(library)).unwrap();
    assert!(!has_rule(&model, import, "import-failed"));
}

// ============================================================================
// Aggregation and the Gate
// ============================================================================

#[test]
fn test_issues_aggregate_the_subtree() {
    let (mut model, doc, wf) = setup();
    let d = param(&mut model, wf, ParameterKind::Declaration, "d", "Int");
    model.set_text(d, "missing").unwrap();
    let scatter = model.add_scatter(wf, "i", "[1]").unwrap();
    let e = param(&mut model, scatter, ParameterKind::Declaration, "e", "");
    model.set_text(e, "1").unwrap();

    let issues = model.validate(doc).unwrap();
    let entities: Vec<EntityId> = issues.iter().map(|issue| issue.entity).collect();
    assert!(entities.contains(&d));
    assert!(entities.contains(&e));
    assert!(!model.is_valid(doc));
    assert!(model.issues(scatter).unwrap().iter().all(|issue| issue.entity == e));
}

#[test]
fn test_ensure_valid_refuses_errors() {
    let (mut model, doc, wf) = setup();
    let d = param(&mut model, wf, ParameterKind::Declaration, "d", "Int");

    match model.ensure_valid(doc) {
        Err(ModelError::Invalid(issues)) => {
            assert!(issues.iter().any(|issue| issue.entity == d && issue.is_error()))
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    model.set_text(d, "1").unwrap();
    model.ensure_valid(doc).unwrap();
    assert!(model.is_valid(doc));
}

#[test]
fn test_warnings_do_not_block() {
    let (mut model, doc, _) = setup();
    let task = model.add_task(doc, "t").unwrap();
    model.set_command(task, "", Default::default()).unwrap();

    let issues = model.validate(doc).unwrap();
    assert_eq!(issues.len(), 1);
    assert!(!issues[0].is_error());
    model.ensure_valid(doc).unwrap();
}

#[test]
fn test_issues_changed_fires_on_transitions_only() {
    let (mut model, _, wf) = setup();
    let d = param(&mut model, wf, ParameterKind::Declaration, "d", "Int");
    let changes = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = changes.clone();
    model
        .on(d, crate::events::EventKind::IssuesChanged, move |_, _| {
            counter.set(counter.get() + 1)
        })
        .unwrap();

    model.set_text(d, "1").unwrap();
    model.set_text(d, "2").unwrap();
    model.set_text(d, "").unwrap();
    assert_eq!(changes.get(), 2);
}

#[test]
fn test_reduced_rule_set() {
    let (mut model, doc, wf) = setup();
    model.set_validator(Validator::with_rules(vec![Box::new(rules::MissingTypeRule)]));
    let d = param(&mut model, wf, ParameterKind::Declaration, "input", "");

    let issues = model.validate(doc).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rule_id, "missing-type");
    assert_eq!(issues[0].entity, d);
}

#[test]
fn test_builtin_rules_are_unique() {
    let validator = Validator::new();
    let mut ids: Vec<&str> = validator.rules().map(|(id, _)| id).collect();
    let count = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), count);
    assert!(ids.contains(&"unknown-identifier"));
}

#[test]
fn test_issue_display() {
    let (mut model, _, wf) = setup();
    let d = param(&mut model, wf, ParameterKind::Declaration, "d", "Int");
    model.validate(d).unwrap();

    let rendered = model.own_issues(d).unwrap()[0].to_string();
    assert!(rendered.starts_with("error on declaration_"));
    assert!(rendered.ends_with("[missing-value]"));
}

// ============================================================================
// Revalidation Reach
// ============================================================================

#[test]
fn test_rename_leaves_commands_and_scatters_alone() {
    let (mut model, doc, wf) = setup();
    let task = model.add_task(doc, "t").unwrap();
    model.set_command(task, "echo hi", Default::default()).unwrap();
    let x = param(&mut model, wf, ParameterKind::Input, "x", "Array[Int]");
    let scatter = model.add_scatter(wf, "i", "x").unwrap();

    let runs = count_validations(&mut model, &[EntityKind::Command, EntityKind::Scatter]);
    model.rename(x, "y").unwrap();
    assert_eq!(runs.get(), 0);

    let iterator = model.scatter_iterator(scatter).unwrap();
    assert_eq!(model.inbound(iterator).unwrap(), &[x]);

    model.validate(doc).unwrap();
    assert_eq!(runs.get(), 2);
}

#[test]
fn test_rename_into_a_taken_name() {
    let (mut model, _, wf) = setup();
    let a = param(&mut model, wf, ParameterKind::Input, "a", "Int");
    let b = param(&mut model, wf, ParameterKind::Declaration, "b", "Int");
    model.set_text(b, "1").unwrap();

    model.rename(b, "a").unwrap();
    assert!(has_rule(&model, a, "duplicate-name"));
    assert!(has_rule(&model, b, "duplicate-name"));

    model.rename(b, "c").unwrap();
    assert!(!has_rule(&model, a, "duplicate-name"));
    assert!(!has_rule(&model, b, "duplicate-name"));
}

#[test]
fn test_adding_a_declaration_stays_local() {
    let (mut model, _, wf) = setup();
    let mut previous = param(&mut model, wf, ParameterKind::Declaration, "d0", "Int");
    model.set_text(previous, "1").unwrap();
    for i in 1..50 {
        let next = param(&mut model, wf, ParameterKind::Declaration, &format!("d{i}"), "Int");
        model.set_text(next, &format!("d{} + 1", i - 1)).unwrap();
        previous = next;
    }

    let runs = count_validations(&mut model, &[EntityKind::DECLARATION]);
    let last = param(&mut model, wf, ParameterKind::Declaration, "d50", "Int");
    model.set_text(last, "d49 + 1").unwrap();

    // only the new declaration is looked at, never its 50 predecessors
    assert!(runs.get() < 20, "{} revalidations", runs.get());
    assert_eq!(model.inbound(last).unwrap(), &[previous]);
}
