//! Sequence flow integration tests
//!
//! Exclusive choice, parallel fork and join, and incidents raised by guard
//! conditions, observed through the records the engine writes.
//!
//! Run with: cargo test -p flowline-engine --test propagation_test

use std::sync::Arc;

use serde_json::json;

use flowline_engine::prelude::*;

use Intent::*;

fn engine(model: ProcessModel) -> Engine {
    let processes = Arc::new(ProcessCache::new());
    processes.deploy(model.build().expect("valid process"));
    Engine::new(processes)
}

fn vars(value: serde_json::Value) -> Variables {
    value.as_object().cloned().expect("object")
}

fn steps(result: &ProcessingResult) -> Vec<(Intent, String)> {
    result
        .records
        .iter()
        .map(|record| (record.intent, record.element_id().to_string()))
        .collect()
}

fn expected(steps: &[(Intent, &str)]) -> Vec<(Intent, String)> {
    steps
        .iter()
        .map(|(intent, element_id)| (*intent, element_id.to_string()))
        .collect()
}

fn key_of(result: &ProcessingResult, intent: Intent, element_id: &str) -> Key {
    result
        .records
        .iter()
        .find(|record| record.intent == intent && record.element_id() == element_id)
        .map(|record| record.key)
        .unwrap_or_else(|| panic!("no {intent} record for {element_id}"))
}

// =============================================================================
// Exclusive gateway
// =============================================================================

/// start -> gw -(g1)-> a
///            -(g2)-> b
///            -(d, default)-> c
fn exclusive_model(g1: &str, g2: &str, with_default: bool) -> ProcessModel {
    let mut gateway = ElementDefinition::exclusive_gateway("gw");
    let mut model = ProcessModel::new("p");
    if with_default {
        gateway = gateway.with_default_flow("d");
        model = model.connect("d", "gw", "c");
    }
    model
        .element(ElementDefinition::start_event("start"))
        .element(gateway)
        .element(ElementDefinition::service_task("a"))
        .element(ElementDefinition::service_task("b"))
        .element(ElementDefinition::service_task("c"))
        .connect("f0", "start", "gw")
        .flow(SequenceFlow::new("g1", "gw", "a").with_condition(g1))
        .flow(SequenceFlow::new("g2", "gw", "b").with_condition(g2))
}

#[test_log::test]
fn test_first_true_condition_wins_and_later_guards_are_skipped() {
    // g2 would raise an incident if it were evaluated
    let mut engine = engine(exclusive_model("amount > 100", "'not a boolean'", true));

    let result = engine
        .process(Command::activate(1, "p", "p").with_variables(vars(json!({ "amount": 150 }))))
        .unwrap();

    assert_eq!(
        steps(&result),
        expected(&[
            (ElementActivated, "p"),
            (ElementActivated, "start"),
            (ElementCompleted, "start"),
            (ElementActivated, "gw"),
            (ElementCompleted, "gw"),
            (ElementActivated, "a"),
        ])
    );
    assert!(engine.state().incidents().is_empty());
}

#[test]
fn test_default_flow_when_no_condition_holds() {
    let mut engine = engine(exclusive_model("amount > 100", "amount > 200", true));

    let result = engine
        .process(Command::activate(1, "p", "p").with_variables(vars(json!({ "amount": 50 }))))
        .unwrap();

    let activated: Vec<_> = result
        .with_intent(ElementActivated)
        .map(|record| record.element_id().to_string())
        .collect();
    assert_eq!(activated, vec!["p", "start", "gw", "c"]);
}

#[test]
fn test_no_match_without_default_raises_one_incident() {
    let mut engine = engine(exclusive_model("amount > 100", "amount > 200", false));

    let result = engine
        .process(Command::activate(1, "p", "p").with_variables(vars(json!({ "amount": 50 }))))
        .unwrap();

    assert_eq!(
        steps(&result),
        expected(&[
            (ElementActivated, "p"),
            (ElementActivated, "start"),
            (ElementCompleted, "start"),
            (ElementActivated, "gw"),
            (IncidentCreated, "gw"),
        ])
    );
    let gateway = key_of(&result, ElementActivated, "gw");
    let incident = engine.open_incident_for(gateway).expect("incident");
    assert_eq!(incident.failure.error_type, ErrorType::ConditionError);
    assert_eq!(
        engine.element_instance(gateway).unwrap().state,
        LifecycleState::Completing
    );
}

#[test]
fn test_condition_that_is_not_boolean_raises_an_incident() {
    let mut engine = engine(exclusive_model("amount + 1", "true", true));

    let result = engine
        .process(Command::activate(1, "p", "p").with_variables(vars(json!({ "amount": 5 }))))
        .unwrap();

    let incident = result
        .with_intent(IncidentCreated)
        .next()
        .and_then(|record| record.incident_value())
        .expect("incident");
    assert_eq!(incident.element_id, "gw");
    assert_eq!(incident.error_type, ErrorType::ConditionError);
    assert_eq!(incident.expression.as_deref(), Some("amount + 1"));
    assert!(result
        .with_intent(ElementActivated)
        .all(|record| record.element_id() != "a" && record.element_id() != "b"));
}

#[test]
fn test_resolving_without_a_fix_raises_a_new_incident() {
    let mut engine = engine(exclusive_model("amount + 1", "true", true));
    let started = engine
        .process(Command::activate(1, "p", "p").with_variables(vars(json!({ "amount": 5 }))))
        .unwrap();
    let first = key_of(&started, IncidentCreated, "gw");

    let result = engine.process(Command::resolve_incident(first)).unwrap();

    assert_eq!(result.intents(), vec![IncidentResolved, IncidentCreated]);
    let second = result.records[1].key;
    assert_ne!(second, first);
    let gateway = key_of(&started, ElementActivated, "gw");
    assert_eq!(engine.open_incident_for(gateway).unwrap().key, second);
}

#[test]
fn test_conditions_on_task_flows_are_ignored() {
    let mut engine = engine(
        ProcessModel::new("p")
            .element(ElementDefinition::task("t"))
            .element(ElementDefinition::service_task("a"))
            .element(ElementDefinition::service_task("b"))
            .flow(SequenceFlow::new("fa", "t", "a").with_condition("false"))
            .flow(SequenceFlow::new("fb", "t", "b").with_condition("'not a boolean'")),
    );

    let result = engine.process(Command::activate(1, "p", "t")).unwrap();

    assert_eq!(
        steps(&result),
        expected(&[
            (ElementActivated, "t"),
            (ElementCompleted, "t"),
            (ElementActivated, "a"),
            (ElementActivated, "b"),
        ])
    );
}

// =============================================================================
// Parallel gateway
// =============================================================================

/// start -> fork -> a, b -> join -> end
fn parallel_model() -> ProcessModel {
    ProcessModel::new("p")
        .element(ElementDefinition::start_event("start"))
        .element(ElementDefinition::parallel_gateway("fork"))
        .element(ElementDefinition::service_task("a"))
        .element(ElementDefinition::service_task("b"))
        .element(ElementDefinition::parallel_gateway("join"))
        .element(ElementDefinition::end_event("end"))
        .connect("f0", "start", "fork")
        .connect("fa", "fork", "a")
        .connect("fb", "fork", "b")
        .connect("ja", "a", "join")
        .connect("jb", "b", "join")
        .connect("f1", "join", "end")
}

#[test_log::test]
fn test_fork_activates_every_branch() {
    let mut engine = engine(parallel_model());

    let result = engine.process(Command::activate(1, "p", "p")).unwrap();

    assert_eq!(
        steps(&result),
        expected(&[
            (ElementActivated, "p"),
            (ElementActivated, "start"),
            (ElementCompleted, "start"),
            (ElementActivated, "fork"),
            (ElementCompleted, "fork"),
            (ElementActivated, "a"),
            (ElementActivated, "b"),
        ])
    );
}

#[test_log::test]
fn test_join_waits_for_every_incoming_flow() {
    let mut engine = engine(parallel_model());
    let started = engine.process(Command::activate(1, "p", "p")).unwrap();
    let a = key_of(&started, ElementActivated, "a");
    let b = key_of(&started, ElementActivated, "b");

    let first = engine.process(Command::complete(a)).unwrap();
    assert_eq!(steps(&first), expected(&[(ElementCompleted, "a")]));
    assert_eq!(engine.state().joins().waiting_in(1), 1);

    let second = engine.process(Command::complete(b)).unwrap();
    assert_eq!(
        steps(&second),
        expected(&[
            (ElementCompleted, "b"),
            (ElementActivated, "join"),
            (ElementCompleted, "join"),
            (ElementActivated, "end"),
            (ElementCompleted, "end"),
            (ElementCompleted, "p"),
        ])
    );
    assert!(engine.state().instances().is_empty());
}

#[test]
fn test_terminating_the_process_drops_a_waiting_join() {
    let mut engine = engine(parallel_model());
    let started = engine.process(Command::activate(1, "p", "p")).unwrap();
    let a = key_of(&started, ElementActivated, "a");
    let b = key_of(&started, ElementActivated, "b");
    engine.process(Command::complete(a)).unwrap();

    let result = engine.process(Command::terminate(1)).unwrap();

    assert_eq!(
        result
            .records
            .iter()
            .map(|record| (record.intent, record.key))
            .collect::<Vec<_>>(),
        vec![(ElementTerminated, b), (ElementTerminated, 1)]
    );
    assert_eq!(engine.state().joins().waiting_in(1), 0);
}

// =============================================================================
// Incident resolution
// =============================================================================

/// start -> fork -> calc (needs amount) -> end_a
///               -> input -> end_b
fn retry_model() -> ProcessModel {
    ProcessModel::new("p")
        .element(ElementDefinition::start_event("start"))
        .element(ElementDefinition::parallel_gateway("fork"))
        .element(ElementDefinition::task("calc").requiring("amount"))
        .element(ElementDefinition::service_task("input"))
        .element(ElementDefinition::end_event("end_a"))
        .element(ElementDefinition::end_event("end_b"))
        .connect("f0", "start", "fork")
        .connect("f1", "fork", "calc")
        .connect("f2", "fork", "input")
        .connect("f3", "calc", "end_a")
        .connect("f4", "input", "end_b")
}

#[test_log::test]
fn test_resolving_retries_an_automatic_completion() {
    let mut engine = engine(retry_model());
    let started = engine.process(Command::activate(1, "p", "p")).unwrap();
    let calc = key_of(&started, ElementActivated, "calc");
    let input = key_of(&started, ElementActivated, "input");
    let incident_key = key_of(&started, IncidentCreated, "calc");
    assert_eq!(
        engine.element_instance(calc).unwrap().state,
        LifecycleState::Completing
    );

    let supplied = engine
        .process(Command::complete(input).with_variables(vars(json!({ "amount": 10 }))))
        .unwrap();
    assert_eq!(
        steps(&supplied),
        expected(&[
            (ElementCompleted, "input"),
            (ElementActivated, "end_b"),
            (ElementCompleted, "end_b"),
        ])
    );

    let result = engine
        .process(Command::resolve_incident(incident_key))
        .unwrap();

    assert_eq!(
        steps(&result),
        expected(&[
            (IncidentResolved, "calc"),
            (ElementCompleted, "calc"),
            (ElementActivated, "end_a"),
            (ElementCompleted, "end_a"),
            (ElementCompleted, "p"),
        ])
    );
    assert_eq!(result.records[0].key, incident_key);
    assert!(engine.state().incidents().is_empty());
    assert!(engine.state().instances().is_empty());
}

#[test]
fn test_resolving_after_an_external_completion_failure_only_unfreezes() {
    let mut engine = engine(
        ProcessModel::new("p")
            .element(ElementDefinition::service_task("review").requiring("approved"))
            .element(ElementDefinition::service_task("ship"))
            .connect("f1", "review", "ship"),
    );
    engine.process(Command::activate(7, "p", "review")).unwrap();
    let failed = engine.process(Command::complete(7)).unwrap();
    let incident_key = failed.records[0].key;

    let resolved = engine
        .process(Command::resolve_incident(incident_key))
        .unwrap();
    assert_eq!(resolved.intents(), vec![IncidentResolved]);
    assert_eq!(
        engine.element_instance(7).unwrap().state,
        LifecycleState::Activated
    );

    let completed = engine
        .process(Command::complete(7).with_variables(vars(json!({ "approved": true }))))
        .unwrap();
    assert_eq!(
        steps(&completed),
        expected(&[(ElementCompleted, "review"), (ElementActivated, "ship")])
    );
}
