//! Propagation benchmark
//!
//! Measures one ACTIVATE command driving a chain of automatically completing
//! tasks from the start event to the end event. Every task in the chain costs
//! two records and one scheduled successor.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use flowline_engine::prelude::*;

fn chain(length: usize) -> ProcessDefinition {
    let mut model = ProcessModel::new("chain")
        .element(ElementDefinition::start_event("start"))
        .element(ElementDefinition::end_event("end"));

    let mut previous = "start".to_string();
    for i in 0..length {
        let task = format!("task_{i}");
        model = model
            .element(ElementDefinition::task(task.clone()))
            .connect(format!("flow_{i}"), previous, task.clone());
        previous = task;
    }
    model.connect("flow_end", previous, "end").build().unwrap()
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation/chain");

    for length in [10, 100, 1000] {
        let processes = Arc::new(ProcessCache::new());
        processes.deploy(chain(length));

        group.throughput(Throughput::Elements(length as u64));
        group.bench_with_input(BenchmarkId::new("tasks", length), &length, |b, _| {
            b.iter_batched(
                || Engine::new(Arc::clone(&processes)),
                |mut engine| {
                    let result = engine.process(Command::activate(1, "chain", "chain")).unwrap();
                    assert_eq!(result.records.len(), 2 * (length + 3));
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_exclusive_choice(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation/exclusive");
    group.throughput(Throughput::Elements(1));

    let mut model = ProcessModel::new("choice")
        .element(ElementDefinition::exclusive_gateway("gw").with_default_flow("fallback"))
        .element(ElementDefinition::task("fallback_task"));
    for i in 0..20 {
        let task = format!("task_{i}");
        model = model
            .element(ElementDefinition::task(task.clone()))
            .flow(
                SequenceFlow::new(format!("guard_{i}"), "gw", task)
                    .with_condition(format!("amount == {i}")),
            );
    }
    let definition = model
        .connect("fallback", "gw", "fallback_task")
        .build()
        .unwrap();
    let processes = Arc::new(ProcessCache::new());
    processes.deploy(definition);

    group.bench_function("last_guard_of_20", |b| {
        b.iter_batched(
            || Engine::new(Arc::clone(&processes)),
            |mut engine| {
                let mut variables = Variables::new();
                variables.insert("amount".into(), 19.into());
                engine
                    .process(Command::activate(1, "choice", "gw").with_variables(variables))
                    .unwrap();
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_chain, bench_exclusive_choice);
criterion_main!(benches);
