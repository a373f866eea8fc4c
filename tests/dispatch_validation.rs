// tests/dispatch_validation.rs

use rand::rngs::StdRng;
use rand::SeedableRng;

use tasklab::dispatch::{bind_runtime, dispatch, ReferenceRuntime};
use tasklab::errors::TasklabError;
use tasklab::generate::{generate_with_rng, GeneratorConfig};
use tasklab::graph::{Mode, TaskGraph};
use tasklab_test_utils::{chain, diamond, ExecOrder, FakeRuntime, GraphBuilder};

#[tokio::test]
async fn reference_runtime_honours_a_chain() {
    let graph = chain(8, 50);
    let mut rt = ReferenceRuntime::new();

    let report = dispatch(&graph, &mut rt).await.expect("dispatch succeeds");
    assert!(report.passed());
    assert_eq!(report.executed, 8);
}

#[tokio::test]
async fn reference_runtime_honours_a_diamond() {
    let graph = diamond(50);
    let mut rt = ReferenceRuntime::new();

    let report = dispatch(&graph, &mut rt).await.expect("dispatch succeeds");
    assert!(report.passed());
    assert_eq!(report.executed, 4);
}

#[tokio::test]
async fn reference_runtime_honours_generated_graphs() {
    let cfg = GeneratorConfig {
        dep_range: 6,
        exec_base: 20,
        ..GeneratorConfig::new(40, 4)
    };
    let mut rng = StdRng::seed_from_u64(21);
    let graph = generate_with_rng(&cfg, &mut rng).expect("generation succeeds");

    let mut rt = bind_runtime("reference").expect("reference runtime binds");
    let report = dispatch(&graph, rt.as_mut()).await.expect("dispatch succeeds");
    assert!(report.passed());
    assert_eq!(report.executed, 40);
}

#[tokio::test]
async fn single_task_graph_dispatches_successfully() {
    let cfg = GeneratorConfig {
        exec_base: 10,
        ..GeneratorConfig::new(1, 0)
    };
    let mut rng = StdRng::seed_from_u64(1);
    let graph = generate_with_rng(&cfg, &mut rng).expect("generation succeeds");

    let mut rt = ReferenceRuntime::new();
    let report = dispatch(&graph, &mut rt).await.expect("dispatch succeeds");
    assert!(report.passed());
    assert_eq!(report.executed, 1);
}

#[tokio::test]
async fn mixed_modes_dispatch_cleanly() {
    let graph = GraphBuilder::new()
        .exec_base(20)
        .task(0.1)
        .task(-0.1)
        .task(0.0)
        .dep(0, 1, Mode::Inout)
        .dep(0, 2, Mode::In)
        .dep(1, 2, Mode::Inout)
        .build();

    let mut rt = ReferenceRuntime::new();
    let report = dispatch(&graph, &mut rt).await.expect("dispatch succeeds");
    assert!(report.passed());
}

#[tokio::test]
async fn honest_serial_scheduler_passes() {
    let graph = chain(5, 10);
    let mut rt = FakeRuntime::new(ExecOrder::Submission);

    let report = dispatch(&graph, &mut rt).await.expect("dispatch succeeds");
    assert!(report.passed());
    assert_eq!(report.executed, 5);
}

#[tokio::test]
async fn premature_consumer_is_named() {
    let graph = chain(3, 10);
    let mut rt = FakeRuntime::new(ExecOrder::VictimFirst(1));

    let report = dispatch(&graph, &mut rt).await.expect("dispatch drains");
    assert!(!report.passed());
    assert!(report.violations.contains(&1));

    // The violation does not stop the rest of the graph: every task still
    // ran before taskwait returned.
    assert_eq!(report.executed, 3);
}

#[tokio::test]
async fn reversed_execution_flags_every_consumer() {
    let graph = chain(4, 10);
    let mut rt = FakeRuntime::new(ExecOrder::Reversed);

    let report = dispatch(&graph, &mut rt).await.expect("dispatch drains");
    assert_eq!(report.violations, vec![1, 2, 3]);
    assert_eq!(report.executed, 4);
}

#[tokio::test]
async fn violations_surface_once_per_task() {
    // A task that both reads early and is read late: the diamond's sink
    // misses two producers under reversed order but is reported once.
    let graph = diamond(10);
    let mut rt = FakeRuntime::new(ExecOrder::Reversed);

    let report = dispatch(&graph, &mut rt).await.expect("dispatch drains");
    let sink_reports = report.violations.iter().filter(|&&t| t == 3).count();
    assert_eq!(sink_reports, 1);
}

#[tokio::test]
async fn one_runtime_serves_many_runs() {
    let mut rt = ReferenceRuntime::new();

    let first = dispatch(&chain(4, 10), &mut rt).await.expect("first run");
    assert!(first.passed());

    let second = dispatch(&diamond(10), &mut rt).await.expect("second run");
    assert!(second.passed());
}

#[tokio::test]
async fn unknown_runtime_is_a_bind_error() {
    let err = bind_runtime("omp").expect_err("no such runtime");
    assert!(matches!(err, TasklabError::RuntimeBind(_)));
}

#[tokio::test]
async fn empty_graph_is_not_dispatchable() {
    let mut rt = ReferenceRuntime::new();
    let err = dispatch(&TaskGraph::default(), &mut rt)
        .await
        .expect_err("nothing to dispatch");
    assert!(matches!(err, TasklabError::EmptyGraph));
}
