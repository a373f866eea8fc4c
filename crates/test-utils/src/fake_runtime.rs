use std::collections::HashMap;

use anyhow::anyhow;
use tasklab::dispatch::{BoxFuture, DepDescriptor, TaskBody, TaskHandle, TaskRuntime};
use tasklab::errors::Result;

/// Execution order of the fake scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOrder {
    /// Run tasks serially in submission order (always legal, since
    /// submission order is topological).
    Submission,
    /// Run tasks serially in reverse submission order (violates every
    /// dependency the graph has).
    Reversed,
    /// Run the given submission first, then the rest in submission order
    /// (violates exactly that task's dependencies, if it has any).
    VictimFirst(usize),
}

/// A fake runtime that ignores dependency descriptors entirely and runs
/// every task body serially at `taskwait`, in a controllable order.
///
/// The honest order is the positive fixture for dispatch soundness; the
/// other orders are deliberate scheduler bugs the dispatcher must detect.
pub struct FakeRuntime {
    order: ExecOrder,
    allocated: HashMap<u64, TaskBody>,
    next_handle: u64,
    submissions: Vec<(TaskBody, u64)>,
}

impl FakeRuntime {
    pub fn new(order: ExecOrder) -> Self {
        Self {
            order,
            allocated: HashMap::new(),
            next_handle: 0,
            submissions: Vec::new(),
        }
    }

    /// How many tasks were submitted in the current region.
    pub fn submitted(&self) -> usize {
        self.submissions.len()
    }
}

impl TaskRuntime for FakeRuntime {
    fn fork_call(&mut self) -> Result<()> {
        self.allocated.clear();
        self.submissions.clear();
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
        self.submissions.push((body, arg));
        Ok(())
    }

    fn taskwait(&mut self) -> BoxFuture<'_, Result<()>> {
        let submissions = std::mem::take(&mut self.submissions);
        let order = self.order;

        Box::pin(async move {
            let mut indices: Vec<usize> = (0..submissions.len()).collect();
            match order {
                ExecOrder::Submission => {}
                ExecOrder::Reversed => indices.reverse(),
                ExecOrder::VictimFirst(victim) => {
                    if victim < indices.len() {
                        indices.remove(victim);
                        indices.insert(0, victim);
                    }
                }
            }

            for idx in indices {
                let (body, arg) = &submissions[idx];
                body(*arg);
            }
            Ok(())
        })
    }
}
