// tests/trace_state_machine.rs

use std::io::Cursor;

use proptest::prelude::*;

use tasklab::defaults::EVT_VAR;
use tasklab::graph::{validate_graph, Mode};
use tasklab::trace::{
    replay_events, EventKind, EventPayload, TraceDep, TraceTask, Tracer, TraceSession,
};

fn submit(tracer: &mut Tracer, deps: &[(u64, Mode)]) {
    let task = TraceTask {
        deps: deps
            .iter()
            .map(|&(varptr, mode)| TraceDep { varptr, mode })
            .collect(),
    };
    tracer.add_task(&task).expect("trace submission succeeds");
}

const A: u64 = 0x1000;
const B: u64 = 0x2000;

#[test]
fn write_read_write_creates_a_war_chain() {
    let mut tracer = Tracer::new();
    submit(&mut tracer, &[(A, Mode::Out)]);
    submit(&mut tracer, &[(A, Mode::In)]);
    submit(&mut tracer, &[(A, Mode::Out)]);

    let graph = tracer.graph();
    assert_eq!(graph.ntasks(), 3);
    assert_eq!(graph.ndeps(), 3);
    assert_eq!(graph.nvar(), 1);

    // T0 only advertises its output.
    assert!(graph.predecessors(0).is_empty());
    assert_eq!(graph.successors(0).len(), 1);
    assert_eq!(graph.successors(0)[0].var, 0);

    // T1 reads what T0 wrote.
    let raw = &graph.predecessors(1)[0];
    assert_eq!((raw.task, raw.dep, raw.var), (0, 0, 0));

    // T2 writes after the reader, not after the original writer.
    assert_eq!(graph.predecessors(2).len(), 1);
    let war = &graph.predecessors(2)[0];
    assert_eq!((war.task, war.dep, war.var), (1, 1, 0));

    validate_graph(graph).expect("traced graph validates");
}

#[test]
fn second_writer_collects_every_reader() {
    let mut tracer = Tracer::new();
    submit(&mut tracer, &[(A, Mode::Out)]);
    submit(&mut tracer, &[(A, Mode::In)]);
    submit(&mut tracer, &[(A, Mode::In)]);
    submit(&mut tracer, &[(A, Mode::Out)]);

    let graph = tracer.graph();

    // Both readers depend on the writer.
    assert_eq!(graph.predecessors(1)[0].task, 0);
    assert_eq!(graph.predecessors(2)[0].task, 0);

    // The second writer depends on both readers and not on T0.
    let pred_tasks: Vec<u32> = graph.predecessors(3).iter().map(|e| e.task).collect();
    assert_eq!(pred_tasks, vec![1, 2]);

    validate_graph(graph).expect("traced graph validates");
}

#[test]
fn reader_inherits_the_var_of_the_last_writer() {
    let mut tracer = Tracer::new();
    submit(&mut tracer, &[(A, Mode::Out)]);
    submit(&mut tracer, &[(B, Mode::Out)]);
    submit(&mut tracer, &[(A, Mode::In)]);

    let graph = tracer.graph();
    assert_eq!(graph.nvar(), 2);

    // The read on A flows var 0, the id allocated by A's writer.
    assert_eq!(graph.predecessors(2)[0].var, 0);
    assert_eq!(graph.successors(2)[0].var, 0);
}

#[test]
fn writers_chain_through_waw_hazards() {
    let mut tracer = Tracer::new();
    submit(&mut tracer, &[(A, Mode::Out)]);
    submit(&mut tracer, &[(A, Mode::Inout)]);
    submit(&mut tracer, &[(A, Mode::Out)]);

    let graph = tracer.graph();
    assert_eq!(graph.ndeps(), 3);
    assert_eq!(graph.nvar(), 1);
    assert_eq!(graph.predecessors(1)[0].task, 0);
    assert_eq!(graph.predecessors(2)[0].task, 1);
    validate_graph(graph).expect("traced graph validates");
}

#[test]
fn writer_after_untouched_readers_depends_on_each() {
    let mut tracer = Tracer::new();
    submit(&mut tracer, &[(A, Mode::In)]);
    submit(&mut tracer, &[(A, Mode::In)]);
    submit(&mut tracer, &[(A, Mode::Out)]);

    let graph = tracer.graph();

    // Readers of a never-written address have no producers but still got
    // their own lineages.
    assert!(graph.predecessors(0).is_empty());
    assert!(graph.predecessors(1).is_empty());
    assert_eq!(graph.nvar(), 2);

    // The writer orders after both reads; its own record adopts the first
    // reader's lineage.
    let pred_tasks: Vec<u32> = graph.predecessors(2).iter().map(|e| e.task).collect();
    assert_eq!(pred_tasks, vec![0, 1]);
    assert_eq!(graph.successors(2)[0].var, 0);

    validate_graph(graph).expect("traced graph validates");
}

#[test]
fn duplicate_addresses_within_one_task_do_not_self_depend() {
    let mut tracer = Tracer::new();
    submit(&mut tracer, &[(A, Mode::Out), (A, Mode::Out)]);

    let graph = tracer.graph();
    assert_eq!(graph.ntasks(), 1);
    assert_eq!(graph.ndeps(), 2);
    assert_eq!(graph.nvar(), 1);
    assert!(graph.predecessors(0).is_empty());
    validate_graph(graph).expect("traced graph validates");
}

#[test]
fn traced_tasks_carry_zero_load_factor() {
    let mut tracer = Tracer::new();
    submit(&mut tracer, &[(A, Mode::Out)]);
    assert_eq!(tracer.graph().task(0).unwrap().exec, 0.0);
}

#[test]
fn reset_drops_stale_lineage() {
    let mut tracer = Tracer::new();
    submit(&mut tracer, &[(A, Mode::Out)]);
    tracer.reset();

    assert!(tracer.graph().is_empty());

    // The reused address must not resurrect the old writer.
    submit(&mut tracer, &[(A, Mode::In)]);
    assert!(tracer.graph().predecessors(0).is_empty());
}

#[test]
fn tracing_resumes_from_saved_parts() {
    let mut tracer = Tracer::new();
    submit(&mut tracer, &[(A, Mode::Out)]);

    let (graph, state) = tracer.into_parts();
    let mut resumed = Tracer::resume(graph, state);
    submit(&mut resumed, &[(A, Mode::In)]);

    let raw = &resumed.graph().predecessors(1)[0];
    assert_eq!((raw.task, raw.var), (0, 0));
}

#[test]
fn bus_tracks_watched_kinds_and_publishes_the_mask() {
    let mut session = TraceSession::new();
    assert!(!session.bus().watching(EventKind::HighTask));

    session.bus_mut().watch(EventKind::HighTask);
    assert!(session.bus().watching(EventKind::HighTask));
    assert!(session.bus().watching_code(1));
    assert_eq!(std::env::var(EVT_VAR).as_deref(), Ok("1"));

    session.bus_mut().watch(EventKind::LowTask);
    assert_eq!(std::env::var(EVT_VAR).as_deref(), Ok("3"));

    session.reset();
    assert!(std::env::var(EVT_VAR).is_err());
    assert!(!session.bus().watching(EventKind::LowTask));
}

#[test]
fn deliver_rejects_kinds_outside_the_closed_set() {
    let mut session = TraceSession::new();
    let err = session
        .deliver(9, EventPayload::Word(1))
        .expect_err("kind 9 is not in the closed set");
    assert!(matches!(
        err,
        tasklab::errors::TasklabError::UnsupportedEvent(9)
    ));

    let err = session.bus_mut().watch_code(0).expect_err("kind 0 invalid");
    assert!(matches!(
        err,
        tasklab::errors::TasklabError::UnsupportedEvent(0)
    ));
}

#[test]
fn low_level_events_append_to_the_word_sequence() {
    let mut session = TraceSession::new();
    session
        .deliver(EventKind::LowTask.code(), EventPayload::Word(0xdead))
        .expect("ltask delivery");
    session
        .deliver(EventKind::LowTask.code(), EventPayload::Word(0xbeef))
        .expect("ltask delivery");
    assert_eq!(session.graph().ll(), &[0xdead, 0xbeef]);
}

#[test]
fn replay_rebuilds_the_graph_and_skips_unknown_kinds() {
    let stream = r#"
{"kind":1,"deps":[{"varptr":4096,"mode":"out"}]}
{"kind":1,"deps":[{"varptr":4096,"mode":"in"}]}
{"kind":7}
{"kind":2,"word":255}
{"kind":1,"deps":[{"varptr":4096,"mode":"out"}]}
"#;

    let mut session = TraceSession::new();
    let delivered =
        replay_events(Cursor::new(stream), &mut session).expect("replay succeeds");

    // The kind-7 line is reported and ignored.
    assert_eq!(delivered, 4);

    let graph = session.graph();
    assert_eq!(graph.ntasks(), 3);
    assert_eq!(graph.ll(), &[255]);
    assert_eq!(graph.predecessors(2)[0].task, 1);
}

proptest! {
    /// Arbitrary submission streams still produce graphs upholding the
    /// universal invariants: dense ids, symmetry, no self-deps.
    #[test]
    fn traced_graphs_uphold_invariants(
        stream in proptest::collection::vec(
            proptest::collection::vec((0u64..5, 0u8..3), 0..4),
            1..15,
        ),
    ) {
        let mut tracer = Tracer::new();

        for submission in &stream {
            let deps: Vec<(u64, Mode)> = submission
                .iter()
                .map(|&(ptr, mode)| {
                    let mode = match mode {
                        0 => Mode::In,
                        1 => Mode::Out,
                        _ => Mode::Inout,
                    };
                    (ptr, mode)
                })
                .collect();
            submit(&mut tracer, &deps);
        }

        let graph = tracer.graph();
        prop_assert_eq!(graph.ntasks() as usize, stream.len());
        prop_assert!(validate_graph(graph).is_ok());
        prop_assert!(graph.nvar() <= graph.ndeps());

        for task in graph.tasks() {
            for edge in &task.predecessors {
                prop_assert!(edge.task < task.id);
            }
        }
    }
}
