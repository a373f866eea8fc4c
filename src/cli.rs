// src/cli.rs

//! CLI argument parsing using `clap` (derive).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::defaults::{
    DEFAULT_DEP_RANGE, DEFAULT_EXEC_BASE, DEFAULT_EXEC_RANGE, DEFAULT_GRAPH_NAME, TMP_DIR,
};

/// Command-line arguments for `tasklab`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tasklab",
    version,
    about = "Generate, trace, and validate task graphs against task-parallel runtimes.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKLAB_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate a random task graph and save it.
    Generate {
        /// Number of tasks to be generated.
        #[arg(short = 'n', long)]
        tasks: u32,

        /// Maximum number of IN/INOUT dependencies per task.
        #[arg(short = 'm', long)]
        max_deps: u32,

        /// How far back a predecessor may be picked from.
        #[arg(long, default_value_t = DEFAULT_DEP_RANGE)]
        dep_range: u32,

        /// Standard amount of burn iterations per task.
        #[arg(long, default_value_t = DEFAULT_EXEC_BASE)]
        exec_base: u32,

        /// Max. deviation from the standard load time (0 to 1).
        #[arg(long, default_value_t = DEFAULT_EXEC_RANGE)]
        exec_range: f32,

        /// Where to save the generated graph.
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },

    /// Restore a saved graph and dispatch it to a runtime.
    Run {
        /// Path to a saved graph.
        graph: PathBuf,

        /// Runtime to dispatch to.
        #[arg(long, default_value = "reference")]
        runtime: String,
    },

    /// Rebuild a graph from a recorded submission stream.
    Trace {
        /// JSON-lines event stream to replay.
        #[arg(long, value_name = "PATH")]
        events: PathBuf,

        /// Event kinds to arm before replaying (htask, ltask).
        #[arg(long, value_name = "KIND")]
        watch: Vec<String>,

        /// Where to save the traced graph.
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },

    /// Plot a saved graph.
    Plot {
        /// Path to a saved graph.
        graph: PathBuf,

        /// Output format.
        #[arg(long, value_enum)]
        format: PlotFormatArg,

        /// Output file stem; defaults to the graph path without extension.
        #[arg(short, long, value_name = "STEM")]
        output: Option<PathBuf>,
    },

    /// Generate or restore many graphs and dispatch them all.
    Burnin {
        #[command(subcommand)]
        mode: BurninCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum BurninCommand {
    /// Dispatch freshly generated random graphs.
    Random {
        /// Number of graphs to generate.
        #[arg(long)]
        runs: u32,

        /// Max. number of tasks a graph may obtain.
        #[arg(long)]
        max_tasks: u32,

        /// Runtime to dispatch to.
        #[arg(long, default_value = "reference")]
        runtime: String,

        /// Where failing graphs are persisted.
        #[arg(long, default_value = TMP_DIR)]
        out_dir: PathBuf,

        /// Stem for persisted failure files.
        #[arg(long, default_value = DEFAULT_GRAPH_NAME)]
        name: String,

        /// Burn iterations baseline for generated graphs.
        #[arg(long, default_value_t = DEFAULT_EXEC_BASE)]
        exec_base: u32,
    },

    /// Dispatch every saved graph found under a directory.
    Data {
        /// Directory to scan for saved graphs.
        #[arg(long)]
        dir: PathBuf,

        /// How many times to run each graph.
        #[arg(long, default_value_t = 1)]
        repeat: u16,

        /// Runtime to dispatch to.
        #[arg(long, default_value = "reference")]
        runtime: String,
    },
}

/// Plot format as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum PlotFormatArg {
    Dot,
    Ll,
    Info,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
