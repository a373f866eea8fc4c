// tests/store_roundtrip.rs

use std::fs;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

use tasklab::errors::TasklabError;
use tasklab::generate::{generate_with_rng, GeneratorConfig};
use tasklab::graph::{Mode, TaskGraph};
use tasklab::store;
use tasklab::trace::{TraceDep, TraceState, TraceTask, Tracer};

fn generated(seed: u64) -> TaskGraph {
    let cfg = GeneratorConfig {
        exec_base: 1_000,
        ..GeneratorConfig::new(20, 3)
    };
    let mut rng = StdRng::seed_from_u64(seed);
    generate_with_rng(&cfg, &mut rng).expect("generation succeeds")
}

#[test]
fn generated_graph_roundtrips() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("graph.dat");

    let graph = generated(3);
    store::save(&path, &graph, &TraceState::default()).expect("save succeeds");

    let (restored, trace) = store::load(&path).expect("load succeeds");
    assert_eq!(restored, graph);
    assert_eq!(trace, TraceState::default());
}

#[test]
fn traced_graph_roundtrips_with_hazard_maps() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("trace.dat");

    let mut tracer = Tracer::new();
    for deps in [
        vec![(0xa0u64, Mode::Out), (0xb0, Mode::Out)],
        vec![(0xa0, Mode::In)],
        vec![(0xa0, Mode::In), (0xb0, Mode::Inout)],
    ] {
        let task = TraceTask {
            deps: deps
                .into_iter()
                .map(|(varptr, mode)| TraceDep { varptr, mode })
                .collect(),
        };
        tracer.add_task(&task).expect("trace submission");
    }
    tracer.graph_mut().push_ll(0xfeed);

    let (graph, state) = tracer.into_parts();
    store::save(&path, &graph, &state).expect("save succeeds");

    let (restored_graph, restored_state) = store::load(&path).expect("load succeeds");
    assert_eq!(restored_graph, graph);
    assert_eq!(restored_state, state);

    // Tracing continues over the restored session exactly as it would
    // have in-memory: the next read still sees the recorded last writer.
    let mut resumed = Tracer::resume(restored_graph, restored_state);
    resumed
        .add_task(&TraceTask {
            deps: vec![TraceDep {
                varptr: 0xb0,
                mode: Mode::In,
            }],
        })
        .expect("resumed submission");
    assert_eq!(resumed.graph().predecessors(3)[0].task, 2);
}

#[test]
fn restored_chain_keeps_its_structure() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("chain.dat");

    let cfg = GeneratorConfig {
        dep_range: 1,
        exec_base: 1_000,
        ..GeneratorConfig::new(3, 1)
    };
    let mut rng = StdRng::seed_from_u64(5);
    let graph = generate_with_rng(&cfg, &mut rng).expect("generation succeeds");

    store::save(&path, &graph, &TraceState::default()).expect("save succeeds");
    let (restored, _) = store::load(&path).expect("load succeeds");

    assert_eq!(restored.predecessors(1)[0].task, 0);
    assert_eq!(restored.predecessors(2)[0].task, 1);
    assert_eq!(restored, graph);
}

#[test]
fn unknown_format_versions_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("future.dat");

    store::save(&path, &generated(8), &TraceState::default()).expect("save succeeds");

    // Bump the version tag in place.
    let mut doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("readable")).expect("valid json");
    doc["version"] = serde_json::json!(2);
    fs::write(&path, doc.to_string()).expect("writable");

    let err = store::load(&path).expect_err("version 2 must be rejected");
    assert!(matches!(err, TasklabError::Config(_)));
}

#[test]
fn corrupt_structure_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("corrupt.dat");

    store::save(&path, &generated(9), &TraceState::default()).expect("save succeeds");

    // Claim one dependency fewer than the records use.
    let mut doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("readable")).expect("valid json");
    let ndeps = doc["ndeps"].as_u64().expect("ndeps present");
    doc["ndeps"] = serde_json::json!(ndeps - 1);
    fs::write(&path, doc.to_string()).expect("writable");

    let err = store::load(&path).expect_err("inconsistent counts must be rejected");
    assert!(matches!(err, TasklabError::Invariant(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().expect("tempdir");
    let err = store::load(&dir.path().join("absent.dat")).expect_err("nothing to load");
    assert!(matches!(err, TasklabError::Io(_)));
}

#[test]
fn unwritable_target_leaves_the_graph_usable() {
    let dir = tempdir().expect("tempdir");
    let graph = generated(10);

    let err = store::save(
        &dir.path().join("no/such/dir/graph.dat"),
        &graph,
        &TraceState::default(),
    )
    .expect_err("missing parent directory");
    assert!(matches!(err, TasklabError::Io(_)));

    // The in-memory graph is untouched and still saves elsewhere.
    let path = dir.path().join("graph.dat");
    store::save(&path, &graph, &TraceState::default()).expect("second save succeeds");
    let (restored, _) = store::load(&path).expect("load succeeds");
    assert_eq!(restored, graph);
}

#[test]
fn empty_graphs_are_not_saved() {
    let dir = tempdir().expect("tempdir");
    let err = store::save(
        &dir.path().join("empty.dat"),
        &TaskGraph::default(),
        &TraceState::default(),
    )
    .expect_err("nothing to save");
    assert!(matches!(err, TasklabError::EmptyGraph));
}
