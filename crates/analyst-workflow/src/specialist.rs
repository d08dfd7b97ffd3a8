//! The four specialists and their tool subsets

use analyst_core::{Error, Result};
use analyst_runtime::{AgentTask, AgentWrapper};
use analyst_tools::ToolRegistry;
use std::collections::BTreeMap;
use tracing::info;

use crate::prompts::specialist_prompt;
use crate::route::Route;
use crate::state::WorkflowState;

/// Tool-name fragments that select a specialist's tools from the full registry
pub fn tool_patterns(route: Route) -> &'static [&'static str] {
    match route {
        Route::DataAnalyst => &["stock_price", "historical_data", "stock_info"],
        Route::ChartSpecialist => &["create_chart", "create_comparison"],
        Route::NewsAnalyst => &["news"],
        Route::ReportWriter => &["report"],
        Route::Finish => &[],
    }
}

/// A role prompt plus the tools that role may call
#[derive(Debug)]
pub struct Specialist {
    route: Route,
    system_prompt: String,
    tools: ToolRegistry,
}

impl Specialist {
    /// Build a specialist around an explicit tool set
    ///
    /// An empty tool set is a configuration error: the role prompt tells the
    /// model to call a tool immediately.
    pub fn new(route: Route, tools: ToolRegistry) -> Result<Self> {
        if route.is_finish() {
            return Err(Error::Configuration(
                "finish is not a specialist".to_string(),
            ));
        }
        if tools.is_empty() {
            return Err(Error::Configuration(format!(
                "No tools available for {route} (expected names containing {})",
                tool_patterns(route).join(", ")
            )));
        }

        Ok(Self {
            route,
            system_prompt: specialist_prompt(route, &tools)?,
            tools,
        })
    }

    /// Build a specialist from the tools in `registry` matching its patterns
    pub fn from_registry(route: Route, registry: &ToolRegistry) -> Result<Self> {
        Self::new(route, registry.subset(tool_patterns(route)))
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn label(&self) -> &'static str {
        self.route.as_str()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one turn and append it to `state`; returns the number of messages added
    pub async fn run(&self, agent: &dyn AgentWrapper, state: &mut WorkflowState) -> Result<usize> {
        let task = AgentTask {
            label: self.label(),
            system_prompt: &self.system_prompt,
            history: state.history(),
            tools: &self.tools,
        };
        let outcome = agent.invoke(task).await?;

        info!(
            agent = self.label(),
            iterations = outcome.iterations,
            tool_calls = outcome.tool_results().count(),
            tokens = outcome.usage.total(),
            "Specialist turn complete"
        );

        state.append_turn(self.label(), outcome.messages)
    }
}

/// One specialist per non-finish route
#[derive(Debug)]
pub struct SpecialistTeam {
    members: BTreeMap<Route, Specialist>,
}

impl SpecialistTeam {
    /// Build every specialist from a shared registry
    pub fn from_registry(registry: &ToolRegistry) -> Result<Self> {
        let members = Route::SPECIALISTS
            .into_iter()
            .map(|route| Specialist::from_registry(route, registry).map(|s| (route, s)))
            .collect::<Result<_>>()?;
        Ok(Self { members })
    }

    /// Replace one member, e.g. with a tool set assembled per specialist
    pub fn insert(&mut self, specialist: Specialist) {
        self.members.insert(specialist.route(), specialist);
    }

    pub fn get(&self, route: Route) -> Option<&Specialist> {
        self.members.get(&route)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Specialist> {
        self.members.values()
    }
}
