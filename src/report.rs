// src/report.rs

//! Plot writers: Graphviz (`dot`), low-level words (`ll`), and the
//! textual summary (`info`). Everything renders through `io::Write`
//! sinks; the file-creating wrapper decides names and extensions.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::{Result, TasklabError};
use crate::graph::{Mode, TaskGraph};

/// Max. number of tasks per plotted dot file; larger graphs are chunked.
pub const MAX_DOT_TASKS: usize = 100;

/// Available plot formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotFormat {
    Dot,
    Ll,
    Info,
}

/// Plot `graph` under the given file stem; returns the files written.
pub fn plot(graph: &TaskGraph, stem: &Path, format: PlotFormat) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    match format {
        PlotFormat::Dot => {
            if graph.is_empty() {
                return Err(TasklabError::EmptyGraph);
            }
            let ntasks = graph.ntasks() as usize;
            let chunks = ntasks.div_ceil(MAX_DOT_TASKS);
            for chunk in 0..chunks {
                let start = chunk * MAX_DOT_TASKS;
                let end = (start + MAX_DOT_TASKS).min(ntasks);

                let path = stem_with_suffix(stem, &format!("_{chunk:04}.dot"));
                let mut out = BufWriter::new(File::create(&path)?);
                write_dot_chunk(graph, start..end, &mut out)?;
                out.flush()?;
                written.push(path);
            }
        }
        PlotFormat::Ll => {
            if graph.ll().is_empty() {
                return Err(TasklabError::EmptyGraph);
            }
            let path = stem.with_extension("tsk");
            let mut out = BufWriter::new(File::create(&path)?);
            write_ll(graph, &mut out)?;
            out.flush()?;
            written.push(path);
        }
        PlotFormat::Info => {
            if graph.is_empty() {
                return Err(TasklabError::EmptyGraph);
            }
            let path = stem.with_extension("info");
            let mut out = BufWriter::new(File::create(&path)?);
            write_info(graph, &mut out)?;
            out.flush()?;
            written.push(path);
        }
    }

    info!(stem = %stem.display(), ?format, files = written.len(), "plotted task graph");
    Ok(written)
}

fn stem_with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Write one dot chunk covering tasks in `range`.
pub fn write_dot_chunk(
    graph: &TaskGraph,
    range: std::ops::Range<usize>,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "digraph taskgraph {{")?;
    for task in &graph.tasks()[range] {
        writeln!(
            out,
            "\tT{} [label= \"T{}\\n load: {}\"];",
            task.id, task.id, task.exec
        )?;
        for edge in &task.predecessors {
            writeln!(out, "\tT{} -> T{} [label={}];", edge.task, task.id, edge.dep)?;
        }
    }
    writeln!(out, "}}")
}

/// Write the low-level word sequence, one hex word per line.
pub fn write_ll(graph: &TaskGraph, out: &mut impl Write) -> io::Result<()> {
    for word in graph.ll() {
        writeln!(out, "{word:x}")?;
    }
    Ok(())
}

/// Write the textual summary report.
pub fn write_info(graph: &TaskGraph, out: &mut impl Write) -> io::Result<()> {
    let mut max_exec: f32 = 0.0;
    let mut min_exec: f32 = 1.0;
    let mut mode_counts = [0u32; 3];

    for task in graph.tasks() {
        max_exec = max_exec.max(task.exec);
        min_exec = min_exec.min(task.exec);
        for edge in &task.successors {
            let slot = match edge.mode {
                Mode::In => 0,
                Mode::Inout => 1,
                Mode::Out => 2,
            };
            mode_counts[slot] += 1;
        }
    }

    let exec_base = graph.params().exec_base as f32;

    writeln!(out, "--- Task graph general information                    ---")?;
    writeln!(out, "\tTotal no. of tasks:                     {}", graph.ntasks())?;
    writeln!(out, "\tTotal no. of variables:                 {}", graph.nvar())?;
    writeln!(out, "\tTotal no. of unique dependencies:       {}", graph.ndeps())?;
    writeln!(out, "\t\tin:                                 {}", mode_counts[0])?;
    writeln!(out, "\t\tinout:                              {}", mode_counts[1])?;
    writeln!(out, "\t\tout:                                {}", mode_counts[2])?;
    writeln!(out)?;
    writeln!(out, "--- Information regarding randomly generated graphs ---")?;
    writeln!(
        out,
        "\tStandard amount of iterations per task: {}",
        graph.params().exec_base
    )?;
    writeln!(
        out,
        "\tMinimum amount of iterations is:        {:.0}",
        exec_base * min_exec + exec_base
    )?;
    writeln!(
        out,
        "\tMaximum amount of iterations is:        {:.0}",
        exec_base * max_exec + exec_base
    )?;
    Ok(())
}
