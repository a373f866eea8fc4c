// src/dispatch/reference.rs

//! In-tree reference runtime.
//!
//! A small dependency-honouring scheduler used as the production dispatch
//! backend: it hazard-tracks submissions by descriptor address (writers
//! order after the readers of the previous value and after the previous
//! writer; readers order after the last writer) and executes each task
//! body on the blocking pool once all of its hazard predecessors have
//! completed. Completion is signalled through per-task watch channels, so
//! independent tasks genuinely run in parallel.

use std::collections::{BTreeSet, HashMap};

use anyhow::anyhow;
use tokio::sync::watch;
use tracing::debug;

use crate::errors::Result;

use super::runtime::{BoxFuture, DepDescriptor, TaskBody, TaskHandle, TaskRuntime};

struct Submission {
    body: TaskBody,
    arg: u64,
    /// Indices of earlier submissions this one must wait for.
    preds: Vec<usize>,
}

/// Reference implementation of the task-submission API.
#[derive(Default)]
pub struct ReferenceRuntime {
    allocated: HashMap<u64, TaskBody>,
    next_handle: u64,
    submissions: Vec<Submission>,
    last_writer: HashMap<u64, usize>,
    readers: HashMap<u64, Vec<usize>>,
}

impl ReferenceRuntime {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskRuntime for ReferenceRuntime {
    fn fork_call(&mut self) -> Result<()> {
        self.allocated.clear();
        self.submissions.clear();
        self.last_writer.clear();
        self.readers.clear();
        Ok(())
    }

    fn task_alloc(&mut self, entry: TaskBody) -> Result<TaskHandle> {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.allocated.insert(handle.0, entry);
        Ok(handle)
    }

    fn task_with_deps(&mut self, handle: TaskHandle, deps: Vec<DepDescriptor>) -> Result<()> {
        let body = self
            .allocated
            .remove(&handle.0)
            .ok_or_else(|| anyhow!("task handle {} was never allocated", handle.0))?;
        let arg = deps
            .first()
            .ok_or_else(|| anyhow!("submission carries no parameter slot"))?
            .base_addr;

        let idx = self.submissions.len();
        let mut preds: BTreeSet<usize> = BTreeSet::new();

        // Slot 0 is the private parameter reference; hazards start at 1.
        // A task may carry several slots for one address; it never waits
        // on itself.
        for dep in &deps[1..] {
            if dep.out_flag {
                match self.readers.remove(&dep.base_addr) {
                    Some(observed) => preds.extend(observed.into_iter().filter(|&p| p != idx)),
                    None => {
                        if let Some(&writer) = self.last_writer.get(&dep.base_addr) {
                            if writer != idx {
                                preds.insert(writer);
                            }
                        }
                    }
                }
                self.last_writer.insert(dep.base_addr, idx);
            } else if dep.in_flag {
                if let Some(&writer) = self.last_writer.get(&dep.base_addr) {
                    if writer != idx {
                        preds.insert(writer);
                    }
                }
                self.readers.entry(dep.base_addr).or_default().push(idx);
            }
        }

        debug!(submission = idx, preds = ?preds, "reference runtime accepted task");

        self.submissions.push(Submission {
            body,
            arg,
            preds: preds.into_iter().collect(),
        });
        Ok(())
    }

    fn taskwait(&mut self) -> BoxFuture<'_, Result<()>> {
        let submissions = std::mem::take(&mut self.submissions);
        self.last_writer.clear();
        self.readers.clear();

        Box::pin(async move {
            let (senders, receivers): (Vec<_>, Vec<_>) = (0..submissions.len())
                .map(|_| watch::channel(false))
                .unzip();

            let mut handles = Vec::with_capacity(submissions.len());
            for (sub, done_tx) in submissions.into_iter().zip(senders) {
                // Hazard predecessors always have smaller indices, so the
                // wait graph mirrors the submission DAG and cannot cycle.
                let pred_rxs: Vec<watch::Receiver<bool>> =
                    sub.preds.iter().map(|&p| receivers[p].clone()).collect();

                handles.push(tokio::spawn(async move {
                    for mut rx in pred_rxs {
                        let _ = rx.wait_for(|done| *done).await;
                    }
                    let Submission { body, arg, .. } = sub;
                    let _ = tokio::task::spawn_blocking(move || body(arg)).await;
                    let _ = done_tx.send(true);
                }));
            }

            for handle in handles {
                handle
                    .await
                    .map_err(|err| anyhow!("runtime worker failed: {err}"))?;
            }
            Ok(())
        })
    }
}
