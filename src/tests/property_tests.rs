//! Properties checked over every entity of the pipeline fixture

use super::helpers::{errors, own_parameters, pipeline};
use crate::expression::DependencyProblem;
use crate::model::EntityKind;
use crate::types::Type;

#[test]
fn test_outputs_never_bind_into_their_own_action() {
    let (model, fixture) = pipeline();
    let mut checked = 0;

    let actions = model.find_all(fixture.document, |node| node.kind().is_action());
    for action in actions {
        for output in model.children_of_kind(action, EntityKind::OUTPUT) {
            for target in model.descendants(action) {
                if !target.kind().is_expression() {
                    continue;
                }
                assert!(
                    model.can_bind(output, target).is_err(),
                    "{output} bound into {target} inside {action}"
                );
                checked += 1;
            }
        }
    }
    assert!(checked > 10);
}

#[test]
fn test_bind_and_unbind_are_symmetric() {
    let (mut model, fixture) = pipeline();
    let candidates = own_parameters(&model, fixture.workflow);
    let targets: Vec<_> = candidates
        .iter()
        .copied()
        .filter(|id| matches!(id.kind(), EntityKind::DECLARATION | EntityKind::OUTPUT))
        .collect();

    let mut bound = 0;
    for target in targets {
        for source in candidates.iter().copied() {
            if model.can_bind(source, target).is_err() {
                continue;
            }
            model.bind(target, source).unwrap();
            assert!(model.outbound(source).unwrap().contains(&target));
            assert!(model.inbound(target).unwrap().contains(&source));

            model.unbind(target).unwrap();
            assert!(!model.outbound(source).unwrap().contains(&target));
            assert!(!model.inbound(target).unwrap().contains(&source));
            bound += 1;
        }
    }
    assert!(bound > 0);
}

#[test]
fn test_rename_never_leaves_a_silent_dangling_link() {
    let (mut model, fixture) = pipeline();

    for parameter in own_parameters(&model, fixture.document) {
        let dependents = model.outbound(parameter).unwrap().to_vec();
        if dependents.is_empty() {
            continue;
        }
        let renamed = format!("{}_renamed", model.name(parameter).unwrap());
        model.rename(parameter, &renamed).unwrap();

        for dependent in dependents {
            let connected = model.inbound(dependent).unwrap().contains(&parameter);
            let flagged = model.dependencies(dependent).unwrap().iter().any(|d| {
                matches!(
                    d.problem,
                    Some(DependencyProblem::Unresolved | DependencyProblem::Ambiguous)
                )
            });
            assert!(
                connected || flagged,
                "{dependent} lost {parameter} after rename without an issue"
            );
        }
    }
    assert!(errors(&model.validate(fixture.document).unwrap()).is_empty());
}

#[test]
fn test_type_strings_round_trip() {
    let sources = [
        "Int",
        "File?",
        "Array[String]+",
        "Array[Array[Int]?]+?",
        "Pair[Int,Map[String,File]]",
        "Map[Int,Array[Pair[Boolean,Float]]]?",
        "Object",
        "Sample?",
    ];
    for source in sources {
        let parsed = Type::parse(source).unwrap();
        let reparsed = Type::parse(&parsed.to_string()).unwrap();
        assert_eq!(reparsed, parsed, "{source}");

        let optional = parsed.make_optional();
        assert!(parsed.is_subtype_of(&optional));
        assert_eq!(optional.is_subtype_of(&parsed), parsed.is_optional());
    }
}
