// src/graph/model.rs

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_DEP_RANGE, DEFAULT_EXEC_BASE, DEFAULT_EXEC_RANGE};
use crate::errors::{Result, TasklabError};

/// Access mode of a dependency record.
///
/// Wire code numbering is fixed at In = 1, Out = 2, Inout = 3 and recorded
/// as format version 1; other numberings are rejected rather than guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    In,
    Out,
    Inout,
}

impl Mode {
    /// The numeric wire code external producers use.
    pub fn code(self) -> u8 {
        match self {
            Mode::In => 1,
            Mode::Out => 2,
            Mode::Inout => 3,
        }
    }

    /// Whether a record with this mode observes the variable.
    pub fn reads(self) -> bool {
        !matches!(self, Mode::Out)
    }

    /// Whether a record with this mode produces the variable.
    pub fn writes(self) -> bool {
        !matches!(self, Mode::In)
    }
}

impl TryFrom<u8> for Mode {
    type Error = TasklabError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Mode::In),
            2 => Ok(Mode::Out),
            3 => Ok(Mode::Inout),
            other => Err(TasklabError::UnsupportedMode(other)),
        }
    }
}

/// One endpoint's view of a dependency between two tasks.
///
/// Every dependency appears once as a predecessor edge on the consumer and
/// once as a successor edge on the producer, sharing `dep` and `var`. A
/// task additionally advertises each of its own records as a successor
/// entry whose `task` field equals the task's own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepEdge {
    /// Task at the other endpoint (or the owning task for self-advertised
    /// successor records).
    pub task: u32,
    pub mode: Mode,
    /// Dense dependency id, unique per edge across the graph.
    pub dep: u32,
    /// Dense variable id: the flow identity of the value this edge guards.
    pub var: u32,
}

/// A single task: a dense id, a synthetic load factor, and its ordered
/// predecessor / successor edge lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    /// Load factor in `[-max_r, +max_r]`; the task body burns
    /// `exec * exec_base + exec_base` iterations.
    pub exec: f32,
    pub predecessors: Vec<DepEdge>,
    pub successors: Vec<DepEdge>,
}

impl Task {
    /// O(deg) membership probe: does this task advertise dependency `dep`
    /// among its successor edges?
    pub fn has_successor(&self, dep: u32) -> bool {
        self.successors.iter().any(|e| e.dep == dep)
    }

    /// Whether `edge` is one of this task's self-advertised successor
    /// records rather than an edge towards another task.
    pub fn is_self_advertised(&self, edge: &DepEdge) -> bool {
        edge.task == self.id
    }
}

/// Generation parameters carried by every graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphParams {
    /// Locality window: how far back a predecessor may be.
    pub dep_range: u32,
    /// Standard amount of burn iterations per task.
    pub exec_base: u32,
    /// Max. deviation from the standard load, in `[0, 1]`.
    pub max_r: f32,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            dep_range: DEFAULT_DEP_RANGE,
            exec_base: DEFAULT_EXEC_BASE,
            max_r: DEFAULT_EXEC_RANGE,
        }
    }
}

/// Immutable-after-build task graph.
///
/// The only mutators are `push_task` and `push_ll`, both reserved for the
/// trace path; the dispatcher and the report/store layers only borrow.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    ndeps: u32,
    nvar: u32,
    params: GraphParams,
    /// Low-level trace word sequence (trace mode only).
    ll: Vec<u64>,
}

impl Default for TaskGraph {
    fn default() -> Self {
        TaskGraph::new(GraphParams::default())
    }
}

impl TaskGraph {
    /// An empty graph with the given generation parameters.
    pub fn new(params: GraphParams) -> Self {
        Self {
            tasks: Vec::new(),
            ndeps: 0,
            nvar: 0,
            params,
            ll: Vec::new(),
        }
    }

    /// Assemble a graph from already-built parts. Callers that accept
    /// foreign input must run [`crate::graph::validate_graph`] afterwards.
    pub fn from_parts(
        params: GraphParams,
        tasks: Vec<Task>,
        ndeps: u32,
        nvar: u32,
        ll: Vec<u64>,
    ) -> Self {
        Self {
            tasks,
            ndeps,
            nvar,
            params,
            ll,
        }
    }

    /// Append a task built by the trace path.
    ///
    /// `deps_added` / `vars_added` are the fresh dependency and variable
    /// ids the task's records allocated. The task's id must be the next
    /// dense id, which is what keeps the graph acyclic by construction.
    pub fn push_task(&mut self, task: Task, deps_added: u32, vars_added: u32) -> Result<()> {
        if task.id != self.tasks.len() as u32 {
            return Err(TasklabError::Invariant(format!(
                "task id {} breaks dense id order (expected {})",
                task.id,
                self.tasks.len()
            )));
        }
        self.ndeps += deps_added;
        self.nvar += vars_added;
        self.tasks.push(task);
        Ok(())
    }

    /// Append a low-level trace word.
    pub fn push_ll(&mut self, word: u64) {
        self.ll.push(word);
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn ntasks(&self) -> u32 {
        self.tasks.len() as u32
    }

    pub fn ndeps(&self) -> u32 {
        self.ndeps
    }

    pub fn nvar(&self) -> u32 {
        self.nvar
    }

    pub fn params(&self) -> &GraphParams {
        &self.params
    }

    pub fn task(&self, id: u32) -> Option<&Task> {
        self.tasks.get(id as usize)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn predecessors(&self, id: u32) -> &[DepEdge] {
        self.task(id).map(|t| t.predecessors.as_slice()).unwrap_or(&[])
    }

    pub fn successors(&self, id: u32) -> &[DepEdge] {
        self.task(id).map(|t| t.successors.as_slice()).unwrap_or(&[])
    }

    pub fn ll(&self) -> &[u64] {
        &self.ll
    }
}
