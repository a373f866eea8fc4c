// src/trace/mod.rs

//! Trace subsystem: the event bus external producers feed, and the state
//! machine that turns an ordered submission stream into a task graph.

pub mod bus;
pub mod tracer;

use std::io::BufRead;

use serde::Deserialize;
use tracing::warn;

use crate::errors::{Result, TasklabError};
use crate::graph::TaskGraph;

pub use bus::{EventBus, EventKind};
pub use tracer::{LineageRef, TraceDep, TraceState, TraceTask, Tracer};

/// Payload accompanying a delivered event.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// High-level task submission.
    Task(TraceTask),
    /// Low-level 64-bit trace word.
    Word(u64),
}

/// One tracing session: the bus plus the tracer it feeds.
#[derive(Debug, Default)]
pub struct TraceSession {
    bus: EventBus,
    tracer: Tracer,
}

impl TraceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn graph(&self) -> &TaskGraph {
        self.tracer.graph()
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Notification entry point for external producers.
    ///
    /// `deliver(HTASK, task)` feeds the tracer; `deliver(LTASK, word)`
    /// appends to the low-level sequence. Events are processed in call
    /// order regardless of what is being watched — `watching` exists so
    /// producers can avoid emitting, not so the bus can filter.
    pub fn deliver(&mut self, code: u8, payload: EventPayload) -> Result<()> {
        let kind = EventKind::try_from(code)?;
        match (kind, payload) {
            (EventKind::HighTask, EventPayload::Task(task)) => self.tracer.add_task(&task),
            (EventKind::LowTask, EventPayload::Word(word)) => {
                self.tracer.graph_mut().push_ll(word);
                Ok(())
            }
            (kind, payload) => Err(TasklabError::Config(format!(
                "event payload {payload:?} does not match kind {kind:?}"
            ))),
        }
    }

    /// Clear the bus, the graph, and all lineage state.
    pub fn reset(&mut self) {
        self.bus.clear();
        self.tracer.reset();
    }

    pub fn into_parts(self) -> (TaskGraph, TraceState) {
        self.tracer.into_parts()
    }
}

/// One line of a recorded event stream (JSON lines).
#[derive(Debug, Deserialize)]
struct EventLine {
    kind: u8,
    #[serde(default)]
    deps: Vec<TraceDep>,
    #[serde(default)]
    word: Option<u64>,
}

/// Replay a recorded event stream through a session.
///
/// Unsupported event kinds are reported and skipped, matching the bus
/// contract; malformed lines abort the replay. Returns the number of
/// events delivered.
pub fn replay_events<R: BufRead>(reader: R, session: &mut TraceSession) -> Result<u64> {
    let mut delivered = 0u64;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event: EventLine = serde_json::from_str(&line)?;
        let payload = match EventKind::try_from(event.kind) {
            Ok(EventKind::HighTask) => EventPayload::Task(TraceTask { deps: event.deps }),
            Ok(EventKind::LowTask) => EventPayload::Word(event.word.ok_or_else(|| {
                TasklabError::Config("low-level event line is missing its word".to_string())
            })?),
            Err(TasklabError::UnsupportedEvent(code)) => {
                warn!(code, "skipping event with unsupported kind");
                continue;
            }
            Err(err) => return Err(err),
        };

        session.deliver(event.kind, payload)?;
        delivered += 1;
    }

    Ok(delivered)
}
