// src/lib.rs

pub mod burnin;
pub mod cli;
pub mod defaults;
pub mod dispatch;
pub mod errors;
pub mod generate;
pub mod graph;
pub mod logging;
pub mod report;
pub mod store;
pub mod trace;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cli::{BurninCommand, CliArgs, Command, PlotFormatArg};
use crate::dispatch::{bind_runtime, dispatch};
use crate::errors::{Result, TasklabError};
use crate::generate::{generate, GeneratorConfig};
use crate::report::PlotFormat;
use crate::trace::{replay_events, EventKind, TraceSession, TraceState};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Generate {
            tasks,
            max_deps,
            dep_range,
            exec_base,
            exec_range,
            output,
        } => {
            let cfg = GeneratorConfig {
                ntasks: tasks,
                max_deps,
                dep_range,
                exec_base,
                max_r: exec_range,
            };
            let graph = generate(&cfg)?;
            store::save(&output, &graph, &TraceState::default())?;
            info!(
                ntasks = graph.ntasks(),
                ndeps = graph.ndeps(),
                output = %output.display(),
                "graph generated"
            );
            Ok(())
        }

        Command::Run { graph, runtime } => {
            let (graph, _trace) = store::load(&graph)?;
            let mut rt = bind_runtime(&runtime)?;
            let report = dispatch(&graph, rt.as_mut()).await?;

            if report.passed() {
                info!(executed = report.executed, "the graph executed correctly");
                Ok(())
            } else {
                Err(TasklabError::SchedulerViolation(report.violations))
            }
        }

        Command::Trace {
            events,
            watch,
            output,
        } => {
            let mut session = TraceSession::new();

            for name in &watch {
                match EventKind::from_name(name) {
                    Some(kind) => session.bus_mut().watch(kind),
                    None => {
                        return Err(TasklabError::Config(format!(
                            "unknown event kind '{name}' (expected htask or ltask)"
                        )))
                    }
                }
            }

            let reader = BufReader::new(File::open(&events)?);
            let delivered = replay_events(reader, &mut session)?;
            info!(
                delivered,
                ntasks = session.graph().ntasks(),
                "event stream replayed"
            );

            let (graph, trace) = session.into_parts();
            if graph.is_empty() && graph.ll().is_empty() {
                warn!("event stream produced an empty graph; nothing to save");
                return Err(TasklabError::EmptyGraph);
            }
            store::save(&output, &graph, &trace)?;
            Ok(())
        }

        Command::Plot {
            graph,
            format,
            output,
        } => {
            let stem = output.unwrap_or_else(|| default_stem(&graph));
            let (graph, _trace) = store::load(&graph)?;
            let format = match format {
                PlotFormatArg::Dot => PlotFormat::Dot,
                PlotFormatArg::Ll => PlotFormat::Ll,
                PlotFormatArg::Info => PlotFormat::Info,
            };
            let files = report::plot(&graph, &stem, format)?;
            for file in files {
                info!(file = %file.display(), "plot written");
            }
            Ok(())
        }

        Command::Burnin { mode } => match mode {
            BurninCommand::Random {
                runs,
                max_tasks,
                runtime,
                out_dir,
                name,
                exec_base,
            } => {
                let mut rt = bind_runtime(&runtime)?;
                let opts = burnin::BurninOptions {
                    nruns: runs,
                    max_tasks,
                    out_dir,
                    name,
                    exec_base,
                };
                let stats = burnin::burnin_random(&opts, rt.as_mut()).await?;
                report_burnin(&stats);
                Ok(())
            }
            BurninCommand::Data {
                dir,
                repeat,
                runtime,
            } => {
                let mut rt = bind_runtime(&runtime)?;
                let stats = burnin::burnin_data(&dir, repeat, rt.as_mut()).await?;
                report_burnin(&stats);
                Ok(())
            }
        },
    }
}

fn report_burnin(stats: &burnin::BurninStats) {
    if stats.failures == 0 {
        info!(runs = stats.runs, "burn-in passed");
    } else {
        warn!(
            runs = stats.runs,
            failures = stats.failures,
            "burn-in observed failures"
        );
    }
}

/// Output stem for plots: the graph path with its extension dropped.
fn default_stem(path: &Path) -> PathBuf {
    path.with_extension("")
}
