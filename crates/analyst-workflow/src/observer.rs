//! Step notifications for callers that want to show progress

use analyst_llm::Message;

use crate::route::Route;

/// Receives a callback after each workflow step
///
/// Every method has a no-op default.
pub trait WorkflowObserver: Send + Sync {
    /// The supervisor decided where to go next
    fn on_route(&self, _route: Route) {}

    /// A node finished; `node` is `supervisor` or a specialist label
    fn on_step(&self, _node: &str, _last_message: Option<&Message>) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}
