// src/graph/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, TasklabError};
use crate::graph::model::TaskGraph;

/// Run structural validation against a graph.
///
/// This checks:
/// - dense task ids in topological order (every predecessor id is smaller)
/// - no self-dependencies outside the self-advertised successor records
/// - predecessor/successor symmetry: each predecessor edge matches exactly
///   one successor edge on its producer, with equal dep and var ids
/// - dep ids within `[0, ndeps)` and every id covered; same for var ids,
///   with `nvar <= ndeps`
/// - acyclicity of the edge relation as a whole (belt-and-braces via a
///   topological sort; id ordering already implies it)
///
/// Generated and traced graphs satisfy all of this by construction; this
/// is the gate for graphs restored from disk or assembled by hand.
pub fn validate_graph(g: &TaskGraph) -> Result<()> {
    check_id_order(g)?;
    check_symmetry(g)?;
    check_density(g)?;
    check_acyclic(g)?;
    Ok(())
}

fn invariant(msg: String) -> TasklabError {
    TasklabError::Invariant(msg)
}

fn check_id_order(g: &TaskGraph) -> Result<()> {
    for (idx, task) in g.tasks().iter().enumerate() {
        if task.id != idx as u32 {
            return Err(invariant(format!(
                "task at position {idx} carries id {}",
                task.id
            )));
        }
        for edge in &task.predecessors {
            if edge.task >= task.id {
                return Err(invariant(format!(
                    "task {} has predecessor {} with a non-smaller id",
                    task.id, edge.task
                )));
            }
        }
    }
    Ok(())
}

fn check_symmetry(g: &TaskGraph) -> Result<()> {
    for task in g.tasks() {
        for edge in &task.predecessors {
            let producer = g.task(edge.task).ok_or_else(|| {
                invariant(format!(
                    "task {} has predecessor edge to unknown task {}",
                    task.id, edge.task
                ))
            })?;

            let matches: Vec<_> = producer
                .successors
                .iter()
                .filter(|s| s.dep == edge.dep)
                .collect();

            match matches.as_slice() {
                [s] if s.var == edge.var => {}
                [s] => {
                    return Err(invariant(format!(
                        "dependency {} carries var {} on task {} but var {} on task {}",
                        edge.dep, edge.var, task.id, s.var, producer.id
                    )))
                }
                [] => {
                    return Err(invariant(format!(
                        "task {} depends on {} via dep {} but the producer never advertises it",
                        task.id, producer.id, edge.dep
                    )))
                }
                _ => {
                    return Err(invariant(format!(
                        "dependency {} advertised more than once by task {}",
                        edge.dep, producer.id
                    )))
                }
            }
        }
    }
    Ok(())
}

fn check_density(g: &TaskGraph) -> Result<()> {
    let ndeps = g.ndeps() as usize;
    let nvar = g.nvar() as usize;

    if nvar > ndeps {
        return Err(invariant(format!(
            "nvar {nvar} exceeds ndeps {ndeps}"
        )));
    }

    let mut dep_seen = vec![false; ndeps];
    let mut var_seen = vec![false; nvar];

    for task in g.tasks() {
        for edge in task.predecessors.iter().chain(task.successors.iter()) {
            let dep = edge.dep as usize;
            let var = edge.var as usize;
            if dep >= ndeps {
                return Err(invariant(format!(
                    "dep id {dep} out of range on task {}",
                    task.id
                )));
            }
            if var >= nvar {
                return Err(invariant(format!(
                    "var id {var} out of range on task {}",
                    task.id
                )));
            }
            dep_seen[dep] = true;
            var_seen[var] = true;
        }
    }

    if let Some(hole) = dep_seen.iter().position(|seen| !seen) {
        return Err(invariant(format!("dep id {hole} is never used")));
    }
    if let Some(hole) = var_seen.iter().position(|seen| !seen) {
        return Err(invariant(format!("var id {hole} is never used")));
    }

    Ok(())
}

fn check_acyclic(g: &TaskGraph) -> Result<()> {
    let mut graph: DiGraphMap<u32, ()> = DiGraphMap::new();

    for task in g.tasks() {
        graph.add_node(task.id);
        for edge in &task.predecessors {
            // Edge direction: producer -> consumer.
            graph.add_edge(edge.task, task.id, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(invariant(format!(
            "cycle detected involving task {}",
            cycle.node_id()
        ))),
    }
}
