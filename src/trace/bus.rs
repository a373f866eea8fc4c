// src/trace/bus.rs

//! The event bus: a registry of interest in named event kinds.
//!
//! External producers poll [`EventBus::watching`] (or the `TL_EVT`
//! environment bitmask) to decide whether to emit, then hand events to
//! [`crate::trace::TraceSession::deliver`]. The kind set is closed; raw
//! codes outside it decode to an `UnsupportedEvent` error, which callers
//! report and ignore. There is no callback registration and no ordering
//! guarantee beyond delivery-call order.

use tracing::debug;

use crate::defaults::EVT_VAR;
use crate::errors::{Result, TasklabError};

/// The closed set of watchable event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A high-level task submission (forwarded to the tracer).
    HighTask,
    /// A low-level 64-bit trace word.
    LowTask,
}

pub const EVENT_KINDS: usize = 2;

impl EventKind {
    /// Numeric wire code external producers use.
    pub fn code(self) -> u8 {
        match self {
            EventKind::HighTask => 1,
            EventKind::LowTask => 2,
        }
    }

    /// Bit position inside the `TL_EVT` mask.
    fn bit(self) -> u32 {
        match self {
            EventKind::HighTask => 1 << 0,
            EventKind::LowTask => 1 << 1,
        }
    }

    fn index(self) -> usize {
        match self {
            EventKind::HighTask => 0,
            EventKind::LowTask => 1,
        }
    }

    /// Parse a human-readable kind name (CLI `--watch` values).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "htask" | "high task" | "high" => Some(EventKind::HighTask),
            "ltask" | "low task" | "low" => Some(EventKind::LowTask),
            _ => None,
        }
    }
}

impl TryFrom<u8> for EventKind {
    type Error = TasklabError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(EventKind::HighTask),
            2 => Ok(EventKind::LowTask),
            other => Err(TasklabError::UnsupportedEvent(other)),
        }
    }
}

/// Registry of armed event kinds for one session.
#[derive(Debug, Default)]
pub struct EventBus {
    watched: [bool; EVENT_KINDS],
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a kind and republish the `TL_EVT` mask for external producers.
    pub fn watch(&mut self, kind: EventKind) {
        self.watched[kind.index()] = true;
        self.export();
        debug!(kind = ?kind, "watching event kind");
    }

    /// Arm a kind given its raw wire code.
    pub fn watch_code(&mut self, code: u8) -> Result<()> {
        self.watch(EventKind::try_from(code)?);
        Ok(())
    }

    pub fn watching(&self, kind: EventKind) -> bool {
        self.watched[kind.index()]
    }

    /// Raw-code probe; unknown codes are simply not watched.
    pub fn watching_code(&self, code: u8) -> bool {
        EventKind::try_from(code)
            .map(|k| self.watching(k))
            .unwrap_or(false)
    }

    /// Disarm everything and clear the environment mask. Called between
    /// sessions.
    pub fn clear(&mut self) {
        self.watched = [false; EVENT_KINDS];
        std::env::remove_var(EVT_VAR);
    }

    fn export(&self) {
        let mask = [EventKind::HighTask, EventKind::LowTask]
            .into_iter()
            .filter(|k| self.watching(*k))
            .fold(0u32, |acc, k| acc | k.bit());
        std::env::set_var(EVT_VAR, mask.to_string());
    }
}
