// src/trace/tracer.rs

//! The dependency-tracking state machine.
//!
//! Submissions arrive in program order; each carries a set of dependency
//! records `(varptr, mode)`. The tracer converts the stream into a task
//! graph whose predecessor edges encode the minimal ordering that
//! preserves all RAW, WAR and WAW hazards per variable address:
//!
//! - a writer (Out/Inout) orders after every reader that observed the
//!   previous write, or after the last writer when nobody read it;
//! - a reader (In) orders after the last writer, if any;
//! - either way the task advertises the record as a successor entry, which
//!   is the runtime-visible "I touch this variable" set used at dispatch.
//!
//! Addresses are opaque 64-bit identifiers supplied by the producer and
//! are never dereferenced. State persists across submissions and must be
//! reset explicitly between unrelated sessions, since producers are free
//! to reuse addresses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::Result;
use crate::graph::{DepEdge, Mode, Task, TaskGraph};

/// One dependency record of a traced submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceDep {
    /// Address of the dependency variable, treated as an opaque key.
    pub varptr: u64,
    pub mode: Mode,
}

/// One traced task submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceTask {
    pub deps: Vec<TraceDep>,
}

/// Where a variable lineage currently points: the task and dependency id
/// that last touched it, and the lineage's variable id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRef {
    pub task: u32,
    pub dep: u32,
    pub var: u32,
}

/// Persistent hazard maps, keyed by variable address.
///
/// `in_map` holds the readers that observed the last write without an
/// intervening writer; `out_map` holds the last writer. Both are part of
/// the persisted format so a saved session can resume tracing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceState {
    pub in_map: BTreeMap<u64, Vec<LineageRef>>,
    pub out_map: BTreeMap<u64, LineageRef>,
}

/// Online tracer: owns the graph under construction plus the hazard maps.
#[derive(Debug, Default)]
pub struct Tracer {
    graph: TaskGraph,
    state: TraceState,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume tracing over a restored graph and its hazard maps.
    pub fn resume(graph: TaskGraph, state: TraceState) -> Self {
        Self { graph, state }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut TaskGraph {
        &mut self.graph
    }

    pub fn state(&self) -> &TraceState {
        &self.state
    }

    pub fn into_parts(self) -> (TaskGraph, TraceState) {
        (self.graph, self.state)
    }

    /// Drop the graph and all lineage state. Required between unrelated
    /// sessions: producers reuse addresses.
    pub fn reset(&mut self) {
        self.graph = TaskGraph::default();
        self.state = TraceState::default();
    }

    /// Ingest one submission and append the resulting task to the graph.
    ///
    /// Every predecessor edge points at an already-appended task, so the
    /// graph stays acyclic by construction.
    pub fn add_task(&mut self, submission: &TraceTask) -> Result<()> {
        let tid = self.graph.ntasks();
        let mut task = Task {
            id: tid,
            exec: 0.0,
            predecessors: Vec::new(),
            successors: Vec::new(),
        };

        let mut deps_added: u32 = 0;
        let mut vars_added: u32 = 0;

        for record in &submission.deps {
            let cur_dep = self.graph.ndeps() + deps_added;
            let fresh_var = self.graph.nvar() + vars_added;
            let mut cur_var = fresh_var;

            if record.mode.writes() {
                let readers = self
                    .state
                    .in_map
                    .remove(&record.varptr)
                    .filter(|rs| !rs.is_empty());

                if let Some(readers) = readers {
                    // WAR: order after every reader of the previous value.
                    // The lineage id comes from the last writer when there
                    // is one, else from the first recorded reader. Each
                    // edge carries its reader's own var so it mirrors the
                    // record it points at; readers that observed a write
                    // all share the lineage var anyway.
                    cur_var = self
                        .state
                        .out_map
                        .get(&record.varptr)
                        .map(|w| w.var)
                        .unwrap_or(readers[0].var);

                    for reader in readers {
                        if reader.task != tid {
                            task.predecessors.push(DepEdge {
                                task: reader.task,
                                mode: record.mode,
                                dep: reader.dep,
                                var: reader.var,
                            });
                        }
                    }
                } else if let Some(writer) = self.state.out_map.get(&record.varptr) {
                    // WAW: order after the last writer.
                    cur_var = writer.var;
                    if writer.task != tid {
                        task.predecessors.push(DepEdge {
                            task: writer.task,
                            mode: record.mode,
                            dep: writer.dep,
                            var: cur_var,
                        });
                    }
                }

                // Become the new producer for this address.
                self.state.out_map.insert(
                    record.varptr,
                    LineageRef {
                        task: tid,
                        dep: cur_dep,
                        var: cur_var,
                    },
                );
            } else {
                if let Some(writer) = self.state.out_map.get(&record.varptr) {
                    // RAW: order after the last writer and inherit its
                    // lineage id.
                    cur_var = writer.var;
                    if writer.task != tid {
                        task.predecessors.push(DepEdge {
                            task: writer.task,
                            mode: record.mode,
                            dep: writer.dep,
                            var: cur_var,
                        });
                    }
                }

                self.state
                    .in_map
                    .entry(record.varptr)
                    .or_default()
                    .push(LineageRef {
                        task: tid,
                        dep: cur_dep,
                        var: cur_var,
                    });
            }

            // Advertise the record on the task itself; this is what the
            // dispatcher hands to the runtime as the task's variable set.
            task.successors.push(DepEdge {
                task: tid,
                mode: record.mode,
                dep: cur_dep,
                var: cur_var,
            });

            deps_added += 1;
            if cur_var == fresh_var {
                vars_added += 1;
            }

            trace!(
                task = tid,
                varptr = record.varptr,
                dep = cur_dep,
                var = cur_var,
                mode = ?record.mode,
                "traced dependency record"
            );
        }

        self.graph.push_task(task, deps_added, vars_added)
    }
}
