pub mod builders;
pub mod fake_runtime;

pub use builders::{chain, diamond, GraphBuilder};
pub use fake_runtime::{ExecOrder, FakeRuntime};
