// src/dispatch/mod.rs

//! Dispatch subsystem: the runtime task-submission API, an in-tree
//! reference runtime, and the dispatcher that submits a graph and audits
//! the execution.

pub mod dispatcher;
pub mod reference;
pub mod runtime;

pub use dispatcher::{dispatch, RunReport};
pub use reference::ReferenceRuntime;
pub use runtime::{bind_runtime, BoxFuture, DepDescriptor, TaskBody, TaskHandle, TaskRuntime};
