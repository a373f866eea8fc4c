// src/generate.rs

//! Randomized DAG synthesis.
//!
//! Tasks are emitted in id order and predecessors are only ever picked from
//! a locality window below the current id, so generated graphs are acyclic
//! by construction. Every picked predecessor produces three edge records:
//! the consumer's predecessor edge (mode In or Inout, uniform), the
//! consumer's matching self-advertised successor record, and the
//! producer's Out successor edge. Generated graphs use one variable per
//! dependency (`nvar == ndeps`).

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::defaults::{DEFAULT_DEP_RANGE, DEFAULT_EXEC_BASE, DEFAULT_EXEC_RANGE};
use crate::errors::{Result, TasklabError};
use crate::graph::{DepEdge, GraphParams, Mode, Task, TaskGraph};

/// Inputs for one generation run.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorConfig {
    /// Number of tasks (>= 1).
    pub ntasks: u32,
    /// Max. number of predecessors per task.
    pub max_deps: u32,
    /// Locality window: predecessors of task `i` come from
    /// `[max(0, i - dep_range), i)`.
    pub dep_range: u32,
    /// Standard amount of burn iterations per task.
    pub exec_base: u32,
    /// Max. deviation from the standard load, in `[0, 1]`.
    pub max_r: f32,
}

impl GeneratorConfig {
    /// Config with the given task / fan-in counts and default tuning.
    pub fn new(ntasks: u32, max_deps: u32) -> Self {
        Self {
            ntasks,
            max_deps,
            dep_range: DEFAULT_DEP_RANGE,
            exec_base: DEFAULT_EXEC_BASE,
            max_r: DEFAULT_EXEC_RANGE,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ntasks == 0 {
            return Err(TasklabError::Config(
                "number of tasks must be >= 1".to_string(),
            ));
        }
        if self.dep_range == 0 {
            return Err(TasklabError::Config(
                "dep_range must be >= 1 (a zero-width window cannot hold a predecessor)"
                    .to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_r) {
            return Err(TasklabError::Config(format!(
                "exec range must be within [0, 1] (got {})",
                self.max_r
            )));
        }
        Ok(())
    }
}

/// Generate a graph, seeding the PRNG from wall time.
pub fn generate(cfg: &GeneratorConfig) -> Result<TaskGraph> {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let mut rng = StdRng::seed_from_u64(seed);
    generate_with_rng(cfg, &mut rng)
}

/// Generate a graph with a caller-provided PRNG (deterministic in tests).
pub fn generate_with_rng(cfg: &GeneratorConfig, rng: &mut impl Rng) -> Result<TaskGraph> {
    cfg.validate()?;

    if cfg.max_r == 0.0 {
        warn!("exec range is 0; every task will burn exactly exec_base iterations");
    }

    let n = cfg.ntasks;
    let mut tasks: Vec<Task> = (0..n)
        .map(|id| Task {
            id,
            exec: load_factor(rng, cfg.max_r),
            predecessors: Vec::new(),
            successors: Vec::new(),
        })
        .collect();

    let mut dep_id: u32 = 0;

    // Task 0 has no predecessors.
    for i in 1..n {
        let range_min = i.saturating_sub(cfg.dep_range);
        let range_max = (range_min + cfg.dep_range).min(i);
        let window = range_max - range_min;

        // Degenerate window: nothing below us to depend on. The original
        // tool fell into a modulo-by-zero here; we emit the task with no
        // predecessors instead.
        if window == 0 {
            continue;
        }

        // Max. predecessors the window and fan-in limit allow.
        let cur_dep = if i <= cfg.max_deps { i - 1 } else { cfg.max_deps };
        let cur_dep = cur_dep.min(window);

        let npred = if cur_dep == 0 {
            1
        } else {
            rng.gen_range(1..=cur_dep)
        };

        // Distinct picks from the window, rejection-free.
        let picks = index::sample(rng, window as usize, npred as usize);

        for offset in picks.iter() {
            let producer = range_min + offset as u32;
            let mode = if rng.gen_bool(0.5) { Mode::In } else { Mode::Inout };

            tasks[i as usize].predecessors.push(DepEdge {
                task: producer,
                mode,
                dep: dep_id,
                var: dep_id,
            });
            tasks[i as usize].successors.push(DepEdge {
                task: i,
                mode,
                dep: dep_id,
                var: dep_id,
            });
            tasks[producer as usize].successors.push(DepEdge {
                task: i,
                mode: Mode::Out,
                dep: dep_id,
                var: dep_id,
            });

            dep_id += 1;
        }
    }

    debug!(ntasks = n, ndeps = dep_id, "generated task graph");

    let params = GraphParams {
        dep_range: cfg.dep_range,
        exec_base: cfg.exec_base,
        max_r: cfg.max_r,
    };
    Ok(TaskGraph::from_parts(params, tasks, dep_id, dep_id, Vec::new()))
}

/// Random load factor in `[-max_r, +max_r]`, quantised to hundredths.
fn load_factor(rng: &mut impl Rng, max_r: f32) -> f32 {
    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    sign * (rng.gen_range(0..100) as f32 / 100.0) * max_r
}
