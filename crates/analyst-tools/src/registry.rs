//! Tool registry and per-specialist subsets

use crate::Tool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of available tools, keyed by name
///
/// Iteration order is by name, so tool lists sent to the model are stable
/// between runs.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "Replaced previously registered tool");
        }
    }

    /// Builder-style [`ToolRegistry::register`]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All registered tools
    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.values().cloned().collect()
    }

    /// Names of all registered tools
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Tools whose name contains any of `patterns`
    ///
    /// This is how specialists get their tool subset: the data analyst takes
    /// everything matching `stock_price`, `historical_data` or `stock_info`,
    /// whichever server the tool came from.
    pub fn subset<S: AsRef<str>>(&self, patterns: &[S]) -> ToolRegistry {
        let tools = self
            .tools
            .iter()
            .filter(|(name, _)| patterns.iter().any(|p| name.contains(p.as_ref())))
            .map(|(name, tool)| (name.clone(), Arc::clone(tool)))
            .collect();
        ToolRegistry { tools }
    }

    /// Merge another registry into this one (other's tools win on conflict)
    pub fn extend(&mut self, other: ToolRegistry) {
        for tool in other.tools.into_values() {
            self.register(tool);
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
