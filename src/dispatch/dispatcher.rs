// src/dispatch/dispatcher.rs

//! Graph dispatch and post-execution validation.
//!
//! The dispatcher hands a frozen graph to a runtime and proves the runtime
//! executed it in a legal order. Per run it owns three arenas:
//!
//! - `dep_ok`: one flag per dependency id, written by the producer's task
//!   body and read by every consumer's;
//! - `varptr`: one byte per variable id, whose *addresses* are the hazard
//!   keys the runtime dedupes on (never dereferenced by anyone);
//! - `params`: one parameter block per task, whose address doubles as the
//!   task argument the runtime echoes back into the body.
//!
//! All run-scoped state lives in a single `RunContext` behind an `Arc`
//! threaded through the task bodies; task ids are recovered from the
//! echoed parameter address by index arithmetic. `dep_ok` flags are
//! single-byte atomics accessed with relaxed ordering: the happens-before
//! edge between a producer's store and a consumer's load is exactly what
//! the runtime under test must provide, and a runtime that fails to is
//! observed as a false read either way.

use std::hint::black_box;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::errors::{Result, TasklabError};
use crate::graph::TaskGraph;

use super::runtime::{DepDescriptor, TaskBody, TaskRuntime};

/// Outcome of one dispatched run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// How many task bodies actually ran before taskwait returned.
    pub executed: u32,
    /// Ids of tasks admitted before all of their producers had completed,
    /// in ascending order.
    pub violations: Vec<u32>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Per-task parameter block; its address is the task argument.
struct TaskParam {
    id: u32,
    exec: f32,
    /// `dep_ok` indices this task reads before running.
    preds: Vec<u32>,
    /// `dep_ok` indices this task writes after running.
    succs: Vec<u32>,
}

/// Everything a run shares with the task bodies it hands out.
struct RunContext {
    params: Vec<TaskParam>,
    dep_ok: Vec<AtomicBool>,
    /// Opaque storage backing the hazard keys; only its addresses matter.
    varptr: Vec<u8>,
    exec_base: u32,
    violations: Mutex<Vec<u32>>,
    executed: AtomicU32,
}

/// Submit `graph` to `runtime` and wait for it to finish, then report
/// whether the runtime respected every declared dependency.
///
/// A violation never aborts the run: everything drains to taskwait so one
/// pass observes every offending task.
pub async fn dispatch(graph: &TaskGraph, runtime: &mut dyn TaskRuntime) -> Result<RunReport> {
    if graph.is_empty() {
        return Err(TasklabError::EmptyGraph);
    }

    let ctx = Arc::new(build_context(graph));

    runtime.fork_call()?;

    let params_base = ctx.params.as_ptr() as u64;
    let stride = mem::size_of::<TaskParam>() as u64;
    let varptr_base = ctx.varptr.as_ptr() as u64;

    info!(
        ntasks = graph.ntasks(),
        ndeps = graph.ndeps(),
        nvar = graph.nvar(),
        "dispatching task graph"
    );

    // Submission order equals task-id order; any legal execution order the
    // runtime picks must still respect the declared hazards.
    for task in graph.tasks() {
        let entry: TaskBody = {
            let ctx = Arc::clone(&ctx);
            Arc::new(move |arg| {
                let idx = ((arg - params_base) / stride) as usize;
                verify_and_propagate(&ctx, idx);
            })
        };
        let handle = runtime.task_alloc(entry)?;

        let mut deps = Vec::with_capacity(task.successors.len() + 1);
        deps.push(DepDescriptor {
            base_addr: params_base + u64::from(task.id) * stride,
            len: stride as u32,
            in_flag: true,
            out_flag: false,
        });
        for edge in &task.successors {
            deps.push(DepDescriptor {
                base_addr: varptr_base + u64::from(edge.var),
                len: 1,
                in_flag: edge.mode.reads(),
                out_flag: edge.mode.writes(),
            });
        }

        debug!(task = task.id, slots = deps.len(), "submitting task");
        runtime.task_with_deps(handle, deps)?;
    }

    runtime.taskwait().await?;

    let mut violations = ctx
        .violations
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    violations.sort_unstable();
    violations.dedup();

    let executed = ctx.executed.load(Ordering::Relaxed);
    if violations.is_empty() {
        info!(executed, "run completed; all dependencies honoured");
    } else {
        warn!(executed, tasks = ?violations, "run completed with scheduler violations");
    }

    Ok(RunReport {
        executed,
        violations,
    })
}

fn build_context(graph: &TaskGraph) -> RunContext {
    let params = graph
        .tasks()
        .iter()
        .map(|task| TaskParam {
            id: task.id,
            exec: task.exec,
            preds: task.predecessors.iter().map(|e| e.dep).collect(),
            succs: task.successors.iter().map(|e| e.dep).collect(),
        })
        .collect();

    RunContext {
        params,
        dep_ok: (0..graph.ndeps()).map(|_| AtomicBool::new(false)).collect(),
        varptr: vec![0u8; graph.nvar() as usize],
        exec_base: graph.params().exec_base,
        violations: Mutex::new(Vec::new()),
        executed: AtomicU32::new(0),
    }
}

/// The task body: burn the synthetic load, check every predecessor's
/// output flag, then propagate the verdict to this task's own flags.
fn verify_and_propagate(ctx: &RunContext, idx: usize) {
    let param = &ctx.params[idx];

    burn(param.exec, ctx.exec_base);

    let mut cur = true;
    for &dep in &param.preds {
        cur = cur && ctx.dep_ok[dep as usize].load(Ordering::Relaxed);
    }

    if !cur {
        warn!(task = param.id, "task ran before all of its producers completed");
        ctx.violations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(param.id);
    }

    for &dep in &param.succs {
        ctx.dep_ok[dep as usize].store(cur, Ordering::Relaxed);
    }

    ctx.executed.fetch_add(1, Ordering::Relaxed);
}

/// CPU-burn of `exec * exec_base + exec_base` iterations; no real work.
fn burn(exec: f32, exec_base: u32) {
    let iterations = (exec * exec_base as f32) as i64 + i64::from(exec_base);
    let mut acc: u64 = 0;
    for _ in 0..iterations.max(0) {
        acc = black_box(acc.wrapping_add(1));
    }
    black_box(acc);
}
