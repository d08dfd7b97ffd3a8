//! Specialist runtime for the financial analyst
//!
//! [`AgentExecutor`] is the ReAct loop (model call, tool calls, repeat until a
//! plain answer) that runs one specialist turn. The workflow only sees it
//! through the [`AgentWrapper`] trait.

pub mod executor;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod wrapper;

pub use executor::{AgentExecutor, AgentExecutorBuilder, ExecutorConfig, ExecutorEventHandler};
pub use wrapper::{AgentOutcome, AgentTask, AgentWrapper};
