// src/dispatch/runtime.rs

//! The task-submission API the dispatcher consumes from a runtime.
//!
//! The runtime under test is opaque: it receives task bodies and
//! dependency descriptors whose `base_addr` fields are hazard keys it must
//! dedupe on (and never dereference), and it promises to echo slot 0's
//! address back as the task argument. The dispatcher talks to a
//! `TaskRuntime` instead of concrete symbols, so tests can swap in a fake
//! scheduler while the production path binds the in-tree reference
//! runtime by name.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::{Result, TasklabError};

use super::reference::ReferenceRuntime;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One dependency descriptor of a submitted task.
///
/// Slot 0 of every submission is a private in-only reference to the task's
/// parameter block; the remaining slots carry the task's variable set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepDescriptor {
    pub base_addr: u64,
    pub len: u32,
    pub in_flag: bool,
    pub out_flag: bool,
}

/// Opaque handle for an allocated-but-unsubmitted task descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub u64);

/// A task body. The argument is slot 0's `base_addr`, passed back by the
/// runtime per the submission contract.
pub type TaskBody = Arc<dyn Fn(u64) + Send + Sync>;

/// The four entry points of the runtime task-submission API.
impl std::fmt::Debug for dyn TaskRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dyn TaskRuntime")
    }
}

pub trait TaskRuntime: Send {
    /// Enter a parallel region for one graph run. Resets any state left
    /// over from a previous run so one runtime can serve many dispatches.
    fn fork_call(&mut self) -> Result<()>;

    /// Allocate a task descriptor whose body is `entry`.
    fn task_alloc(&mut self, entry: TaskBody) -> Result<TaskHandle>;

    /// Submit an allocated task with its dependency descriptors.
    fn task_with_deps(&mut self, handle: TaskHandle, deps: Vec<DepDescriptor>) -> Result<()>;

    /// Block until every submitted task has completed. The only suspension
    /// point in a dispatch; a hanging runtime hangs here by design.
    fn taskwait(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Resolve a runtime by name at dispatch time.
///
/// The in-process analogue of looking the entry points up in a symbol
/// table: an unknown name is a binding failure, fatal for the current run
/// but nothing else.
pub fn bind_runtime(name: &str) -> Result<Box<dyn TaskRuntime>> {
    match name.trim().to_lowercase().as_str() {
        "reference" => Ok(Box::new(ReferenceRuntime::new())),
        other => Err(TasklabError::RuntimeBind(format!(
            "unknown runtime '{other}' (available: reference)"
        ))),
    }
}
