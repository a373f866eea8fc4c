// src/store.rs

//! Versioned persistence of graphs and trace state.
//!
//! The on-disk format is a single JSON document carrying the task records
//! (with predecessor/successor order preserved), the counts, the
//! generation parameters, the low-level word sequence, and the hazard
//! maps needed to resume tracing. The document is tagged `version: 1`;
//! any other version is rejected rather than reinterpreted, which pins
//! down the dependency-mode numbering once and for all.
//!
//! Failures are non-destructive in both directions: a failed save leaves
//! the in-memory graph intact, a failed load leaves whatever the caller
//! already had untouched.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{Result, TasklabError};
use crate::graph::{validate_graph, GraphParams, Task, TaskGraph};
use crate::trace::TraceState;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Conventional extension for persisted graphs.
pub const GRAPH_EXTENSION: &str = "dat";

#[derive(Debug, Serialize, Deserialize)]
struct StoredGraph {
    version: u32,
    dep_range: u32,
    exec_base: u32,
    max_r: f32,
    ndeps: u32,
    nvar: u32,
    tasks: Vec<Task>,
    #[serde(default)]
    ll: Vec<u64>,
    #[serde(default)]
    trace: TraceState,
}

/// Serialize a graph (plus any trace state) to `path`.
pub fn save(path: &Path, graph: &TaskGraph, trace: &TraceState) -> Result<()> {
    if graph.is_empty() && graph.ll().is_empty() {
        return Err(TasklabError::EmptyGraph);
    }

    let stored = StoredGraph {
        version: FORMAT_VERSION,
        dep_range: graph.params().dep_range,
        exec_base: graph.params().exec_base,
        max_r: graph.params().max_r,
        ndeps: graph.ndeps(),
        nvar: graph.nvar(),
        tasks: graph.tasks().to_vec(),
        ll: graph.ll().to_vec(),
        trace: trace.clone(),
    };

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &stored)?;
    writer.flush()?;

    info!(path = %path.display(), ntasks = graph.ntasks(), "saved task graph");
    Ok(())
}

/// Restore a graph and its trace state from `path`.
///
/// The graph is structurally validated before being handed back, so a
/// corrupt or hand-edited file cannot smuggle an illegal graph into a
/// dispatch.
pub fn load(path: &Path) -> Result<(TaskGraph, TraceState)> {
    let file = File::open(path)?;
    let stored: StoredGraph = serde_json::from_reader(BufReader::new(file))?;

    if stored.version != FORMAT_VERSION {
        return Err(TasklabError::Config(format!(
            "unsupported graph format version {} (expected {})",
            stored.version, FORMAT_VERSION
        )));
    }

    let params = GraphParams {
        dep_range: stored.dep_range,
        exec_base: stored.exec_base,
        max_r: stored.max_r,
    };
    let graph = TaskGraph::from_parts(params, stored.tasks, stored.ndeps, stored.nvar, stored.ll);
    validate_graph(&graph)?;

    info!(path = %path.display(), ntasks = graph.ntasks(), "restored task graph");
    Ok((graph, stored.trace))
}
