#![allow(dead_code)]

use tasklab::graph::{DepEdge, GraphParams, Mode, Task, TaskGraph};

/// Builder for hand-made generator-shaped graphs: every dependency gets
/// its own variable and shows up as the consumer's predecessor edge, the
/// consumer's self-advertised successor record, and the producer's Out
/// successor edge.
pub struct GraphBuilder {
    params: GraphParams,
    tasks: Vec<Task>,
    ndeps: u32,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            params: GraphParams::default(),
            tasks: Vec::new(),
            ndeps: 0,
        }
    }

    pub fn exec_base(mut self, exec_base: u32) -> Self {
        self.params.exec_base = exec_base;
        self
    }

    pub fn dep_range(mut self, dep_range: u32) -> Self {
        self.params.dep_range = dep_range;
        self
    }

    /// Append a task with the given load factor and no edges yet.
    pub fn task(mut self, exec: f32) -> Self {
        let id = self.tasks.len() as u32;
        self.tasks.push(Task {
            id,
            exec,
            predecessors: Vec::new(),
            successors: Vec::new(),
        });
        self
    }

    /// Add a dependency `producer -> consumer` with the given consumer-side
    /// mode. Allocates the next dense dep/var id pair.
    pub fn dep(mut self, producer: u32, consumer: u32, mode: Mode) -> Self {
        let dep = self.ndeps;
        self.ndeps += 1;

        self.tasks[consumer as usize].predecessors.push(DepEdge {
            task: producer,
            mode,
            dep,
            var: dep,
        });
        self.tasks[consumer as usize].successors.push(DepEdge {
            task: consumer,
            mode,
            dep,
            var: dep,
        });
        self.tasks[producer as usize].successors.push(DepEdge {
            task: consumer,
            mode: Mode::Out,
            dep,
            var: dep,
        });
        self
    }

    pub fn build(self) -> TaskGraph {
        TaskGraph::from_parts(self.params, self.tasks, self.ndeps, self.ndeps, Vec::new())
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A straight chain `T0 -> T1 -> ... -> T(n-1)`.
pub fn chain(n: u32, exec_base: u32) -> TaskGraph {
    let mut builder = GraphBuilder::new().exec_base(exec_base);
    for _ in 0..n {
        builder = builder.task(0.0);
    }
    for i in 1..n {
        builder = builder.dep(i - 1, i, Mode::In);
    }
    builder.build()
}

/// A diamond: `T0 -> {T1, T2} -> T3`.
pub fn diamond(exec_base: u32) -> TaskGraph {
    GraphBuilder::new()
        .exec_base(exec_base)
        .task(0.0)
        .task(0.0)
        .task(0.0)
        .task(0.0)
        .dep(0, 1, Mode::In)
        .dep(0, 2, Mode::In)
        .dep(1, 3, Mode::In)
        .dep(2, 3, Mode::In)
        .build()
}
