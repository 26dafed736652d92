//! Tests for subscriptions, ordering, re-entrancy and muting

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::*;
use crate::model::{EntityId, EntityKind, Model};

// ============================================================================
// Helper Functions
// ============================================================================

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// An event no internal reaction listens to
fn meta(key: &str) -> Event {
    Event::MetaChanged {
        key: key.to_string(),
    }
}

fn recorder(log: &Log, label: &'static str) -> impl Fn(&mut Model, &EventRecord) + 'static {
    let log = log.clone();
    move |_, _| log.borrow_mut().push(label.to_string())
}

/// Document with one task
fn tree(model: &mut Model) -> (EntityId, EntityId) {
    let document = model.create_document(Some("test.wdl"), Some("1.0")).unwrap();
    let task = model.add_task(document, "t").unwrap();
    (document, task)
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_priority_then_insertion_order() {
    let mut model = Model::new();
    let (document, _) = tree(&mut model);
    let seen = log();

    model
        .on_with(document, EventKind::MetaChanged, None, 0, recorder(&seen, "low"))
        .unwrap();
    model
        .on_with(document, EventKind::MetaChanged, None, 10, recorder(&seen, "high-1"))
        .unwrap();
    model
        .on_with(document, EventKind::MetaChanged, None, 5, recorder(&seen, "mid"))
        .unwrap();
    model
        .on_with(document, EventKind::MetaChanged, None, 10, recorder(&seen, "high-2"))
        .unwrap();

    model.trigger(document, meta("k")).unwrap();
    assert_eq!(*seen.borrow(), vec!["high-1", "high-2", "mid", "low"]);
}

#[test]
fn test_wildcard_and_exact_filters() {
    let mut model = Model::new();
    let (document, _) = tree(&mut model);
    let seen = log();

    model.on(document, EventFilter::Any, recorder(&seen, "any")).unwrap();
    model
        .on(document, EventKind::CommandChanged, recorder(&seen, "command"))
        .unwrap();

    model.trigger(document, meta("k")).unwrap();
    assert_eq!(*seen.borrow(), vec!["any"]);
}

// ============================================================================
// Unsubscribing
// ============================================================================

#[test]
fn test_off_by_subscription_and_event() {
    let mut model = Model::new();
    let (document, _) = tree(&mut model);
    let seen = log();

    let first = model
        .on(document, EventKind::MetaChanged, recorder(&seen, "first"))
        .unwrap();
    model
        .on(document, EventKind::MetaChanged, recorder(&seen, "second"))
        .unwrap();

    assert_eq!(model.off(document, Off::subscription(first)).unwrap(), 1);
    model.trigger(document, meta("k")).unwrap();
    assert_eq!(*seen.borrow(), vec!["second"]);

    model.off(document, Off::event(EventKind::MetaChanged)).unwrap();
    model.trigger(document, meta("k")).unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_context_subscriptions_die_with_context() {
    let mut model = Model::new();
    let (document, task) = tree(&mut model);
    let seen = log();

    model
        .on_with(
            document,
            EventKind::MetaChanged,
            Some(task),
            DEFAULT_PRIORITY,
            recorder(&seen, "owned"),
        )
        .unwrap();
    model.destroy(task).unwrap();

    model.trigger(document, meta("k")).unwrap();
    assert!(seen.borrow().is_empty());
}

// ============================================================================
// Re-entrancy
// ============================================================================

#[test]
fn test_reentrant_trigger_is_coalesced() {
    let mut model = Model::new();
    let (document, _) = tree(&mut model);
    let seen = log();
    let depth = Rc::new(Cell::new(0));
    let max_depth = Rc::new(Cell::new(0));

    let (s, d, m) = (seen.clone(), depth.clone(), max_depth.clone());
    model
        .on(document, EventKind::MetaChanged, move |model, record| {
            d.set(d.get() + 1);
            m.set(m.get().max(d.get()));
            if let Event::MetaChanged { key } = &record.event {
                s.borrow_mut().push(key.clone());
                if key == "first" {
                    model.trigger(record.sender, meta("second")).unwrap();
                    // last write wins
                    model.trigger(record.sender, meta("third")).unwrap();
                }
            }
            d.set(d.get() - 1);
        })
        .unwrap();

    model.trigger(document, meta("first")).unwrap();
    assert_eq!(*seen.borrow(), vec!["first", "third"]);
    assert_eq!(max_depth.get(), 1);
}

#[test]
fn test_self_retriggering_handler_terminates() {
    let mut model = Model::new();
    let (document, _) = tree(&mut model);
    let calls = Rc::new(Cell::new(0));

    let c = calls.clone();
    model
        .on(document, EventKind::MetaChanged, move |model, record| {
            c.set(c.get() + 1);
            if c.get() < 5 {
                model.trigger(record.sender, meta("again")).unwrap();
            }
        })
        .unwrap();

    model.trigger(document, meta("start")).unwrap();
    assert_eq!(calls.get(), 5);
}

#[test]
fn test_different_senders_do_not_coalesce() {
    let mut model = Model::new();
    let (document, task) = tree(&mut model);
    let seen = log();

    model
        .on(document, EventKind::MetaChanged, move |model, _| {
            model.trigger(task, meta("nested")).unwrap();
        })
        .unwrap();
    model.on(task, EventKind::MetaChanged, recorder(&seen, "task")).unwrap();

    model.trigger(document, meta("k")).unwrap();
    assert_eq!(*seen.borrow(), vec!["task"]);
}

// ============================================================================
// Muting
// ============================================================================

#[test]
fn test_mute_action_suppresses_everything() {
    let mut model = Model::new();
    let (document, _) = tree(&mut model);
    let seen = log();
    model.on(document, EventFilter::Any, recorder(&seen, "any")).unwrap();

    let task = model.mute_action(|model| model.add_task(document, "quiet").unwrap());
    assert!(seen.borrow().is_empty());
    assert!(model.children(document).contains(&task));

    model.trigger(document, meta("k")).unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_mute_entity_covers_descendants() {
    let mut model = Model::new();
    let (document, task) = tree(&mut model);
    let seen = log();
    model.on(task, EventKind::MetaChanged, recorder(&seen, "task")).unwrap();

    model
        .mute_entity(document, |model| {
            assert!(model.is_muted(task));
            model.trigger(task, meta("k")).unwrap();
        })
        .unwrap();
    assert!(seen.borrow().is_empty());
    assert!(!model.is_muted(task));
}

// ============================================================================
// Bubbling and Spreading
// ============================================================================

#[test]
fn test_bubble_reaches_root_with_origin() {
    let mut model = Model::new();
    let (document, task) = tree(&mut model);
    let origins = Rc::new(RefCell::new(Vec::new()));

    for id in [document, task] {
        let o = origins.clone();
        model
            .on(id, EventKind::MetaChanged, move |_, record| {
                o.borrow_mut().push((record.sender, record.origin));
            })
            .unwrap();
    }

    model.bubble(task, meta("k")).unwrap();
    assert_eq!(*origins.borrow(), vec![(task, task), (document, task)]);
}

#[test]
fn test_bubble_stops_at_muted_ancestor() {
    let mut model = Model::new();
    let (document, task) = tree(&mut model);
    let input = model
        .add_parameter(task, crate::model::ParameterKind::Input, "x", None)
        .unwrap();
    let seen = log();
    model.on(document, EventKind::MetaChanged, recorder(&seen, "document")).unwrap();

    model
        .mute_entity(task, |model| model.bubble(input, meta("k")).unwrap())
        .unwrap();
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_spread_reaches_every_descendant() {
    let mut model = Model::new();
    let (document, task) = tree(&mut model);
    let workflow = model.add_workflow(document, "wf").unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));

    for id in [document, task, workflow] {
        let s = seen.clone();
        model
            .on(id, EventKind::MetaChanged, move |_, record| {
                s.borrow_mut().push(record.sender.kind());
            })
            .unwrap();
    }

    model.spread(document, meta("k")).unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![EntityKind::Document, EntityKind::Task, EntityKind::Workflow]
    );
}

#[test]
fn test_trigger_on_destroyed_entity_fails() {
    let mut model = Model::new();
    let (_, task) = tree(&mut model);
    model.destroy(task).unwrap();
    assert!(matches!(
        model.trigger(task, meta("k")),
        Err(crate::error::ModelError::Destroyed(_))
    ));
}
