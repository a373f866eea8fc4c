// src/burnin.rs

//! Burn-in harnesses: dispatch many graphs against one runtime and
//! aggregate pass/fail statistics.
//!
//! The random harness generates fresh graphs with randomly drawn shape
//! parameters; the data harness replays every persisted graph found under
//! a directory. Either way a failing graph is evidence, so the random
//! harness persists it (data file plus plots) before moving on.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::{thread_rng, Rng};
use tracing::{info, warn};

use crate::defaults::{DEFAULT_EXEC_BASE, DEFAULT_GRAPH_NAME, TMP_DIR};
use crate::dispatch::{dispatch, TaskRuntime};
use crate::errors::{Result, TasklabError};
use crate::generate::{generate, GeneratorConfig};
use crate::report::{self, PlotFormat};
use crate::store;
use crate::trace::TraceState;

/// Options for the random burn-in harness.
#[derive(Debug, Clone)]
pub struct BurninOptions {
    /// Number of graphs to generate and dispatch.
    pub nruns: u32,
    /// Max. number of tasks a generated graph may obtain.
    pub max_tasks: u32,
    /// Where failing graphs are persisted.
    pub out_dir: PathBuf,
    /// Stem for persisted failure files: `{name}_failed_{seq:04}`.
    pub name: String,
    /// Burn iterations baseline handed to the generator.
    pub exec_base: u32,
}

impl BurninOptions {
    pub fn new(nruns: u32, max_tasks: u32) -> Self {
        Self {
            nruns,
            max_tasks,
            out_dir: PathBuf::from(TMP_DIR),
            name: DEFAULT_GRAPH_NAME.to_string(),
            exec_base: DEFAULT_EXEC_BASE,
        }
    }
}

/// Aggregate burn-in outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BurninStats {
    pub runs: u32,
    pub failures: u32,
    /// Data files persisted for failing graphs.
    pub saved: Vec<PathBuf>,
}

/// Generate `nruns` random graphs and dispatch each to `runtime`.
///
/// Per run: `n ∈ [1, max_tasks]` tasks, fan-in limit `m ∈ [1, n/2 + 1]`,
/// locality window `d ∈ [1, n]`. Every failing graph is saved as
/// `{name}_failed_{seq:04}.dat` under `out_dir`, along with its dot and
/// info plots.
pub async fn burnin_random(
    opts: &BurninOptions,
    runtime: &mut dyn TaskRuntime,
) -> Result<BurninStats> {
    if opts.nruns == 0 || opts.max_tasks == 0 {
        return Err(TasklabError::Config(
            "burn-in needs at least one run and one task".to_string(),
        ));
    }

    let mut stats = BurninStats::default();
    let mut rng = thread_rng();

    for run in 0..opts.nruns {
        let n = rng.gen_range(1..=opts.max_tasks);
        let m = rng.gen_range(0..n) / 2 + 1;
        let d = rng.gen_range(1..=n);

        info!(run, ntasks = n, max_deps = m, dep_range = d, "burn-in: generating graph");

        let cfg = GeneratorConfig {
            dep_range: d,
            exec_base: opts.exec_base,
            ..GeneratorConfig::new(n, m)
        };
        let graph = generate(&cfg)?;

        let report = dispatch(&graph, runtime).await?;
        stats.runs += 1;

        if !report.passed() {
            let stem = opts
                .out_dir
                .join(format!("{}_failed_{:04}", opts.name, stats.failures));
            let dat = stem.with_extension(store::GRAPH_EXTENSION);

            store::save(&dat, &graph, &TraceState::default())?;
            report::plot(&graph, &stem, PlotFormat::Dot)?;
            report::plot(&graph, &stem, PlotFormat::Info)?;
            if !graph.ll().is_empty() {
                report::plot(&graph, &stem, PlotFormat::Ll)?;
            }

            warn!(
                run,
                tasks = ?report.violations,
                file = %dat.display(),
                "burn-in: execution failed; graph persisted"
            );

            stats.failures += 1;
            stats.saved.push(dat);
        }
    }

    info!(
        runs = stats.runs,
        failures = stats.failures,
        "burn-in finished"
    );
    Ok(stats)
}

/// Restore every `.dat` graph under `dir` (recursively) and dispatch each
/// `repeat` times, appending per-run outcomes to `burnin_feedback.txt`.
pub async fn burnin_data(
    dir: &Path,
    repeat: u16,
    runtime: &mut dyn TaskRuntime,
) -> Result<BurninStats> {
    if !dir.is_dir() {
        return Err(TasklabError::Config(format!(
            "directory {} does not exist",
            dir.display()
        )));
    }

    let mut graphs = Vec::new();
    collect_dat_files(dir, &mut graphs)?;
    graphs.sort();

    let feedback_path = dir.join("burnin_feedback.txt");
    let mut feedback = BufWriter::new(File::create(&feedback_path)?);

    let mut stats = BurninStats::default();

    for path in graphs {
        let (graph, _trace) = store::load(&path)?;
        writeln!(feedback, "Execution of {}", path.display())?;

        for i in 1..=repeat {
            let report = dispatch(&graph, runtime).await?;
            stats.runs += 1;

            if report.passed() {
                writeln!(feedback, "\t{i}: success!")?;
            } else {
                writeln!(feedback, "\t{i}: failed.")?;
                stats.failures += 1;
            }
        }

        writeln!(feedback)?;
    }

    feedback.flush()?;

    info!(output = %feedback_path.display(), runs = stats.runs, "burn-in feedback written");
    Ok(stats)
}

fn collect_dat_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_dat_files(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(store::GRAPH_EXTENSION) {
            out.push(path);
        }
    }
    Ok(())
}
