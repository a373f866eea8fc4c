// src/graph/mod.rs

//! The task graph data model.
//!
//! A graph is an ordered sequence of tasks in topological order (every
//! predecessor of task `i` has id `< i`), plus the dependency / variable
//! counts and the generation parameters. Graphs are built either in one
//! shot by the generator or task-by-task by the tracer; everyone else
//! sees them as frozen.

pub mod model;
pub mod validate;

pub use model::{DepEdge, GraphParams, Mode, Task, TaskGraph};
pub use validate::validate_graph;
