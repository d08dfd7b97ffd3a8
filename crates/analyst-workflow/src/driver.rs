//! Workflow driver
//!
//! Alternates between the supervisor and the specialist it picks:
//!
//! ```text
//! Routing --finish--> Done
//!    |  ^
//!    v  |
//! RunningSpecialist(route)
//! ```
//!
//! A specialist always hands control back to the supervisor. Any error from
//! either side ends the run; tool failures never get this far because the
//! agent wrapper turns them into tool-error results.

use analyst_core::{Error, Result};
use analyst_llm::LLMProvider;
use analyst_runtime::{AgentExecutor, AgentWrapper, ExecutorConfig, ExecutorEventHandler};
use analyst_tools::ToolRegistry;
use analyst_utils::{AnalystConfig, LlmConfig, WorkflowConfig};
use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::observer::{NoopObserver, WorkflowObserver};
use crate::route::Route;
use crate::router::SupervisorRouter;
use crate::specialist::SpecialistTeam;
use crate::state::{SUPERVISOR, WorkflowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Routing,
    RunningSpecialist(Route),
    Done,
}

pub struct WorkflowDriver {
    router: SupervisorRouter,
    team: SpecialistTeam,
    agent: Arc<dyn AgentWrapper>,
    observer: Arc<dyn WorkflowObserver>,
    max_steps: usize,
}

impl WorkflowDriver {
    pub fn builder() -> WorkflowDriverBuilder {
        WorkflowDriverBuilder::new()
    }

    pub fn team(&self) -> &SpecialistTeam {
        &self.team
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run one query from a fresh state until the supervisor finishes
    pub async fn run(&self, query: impl Into<String>) -> Result<WorkflowState> {
        self.run_state(WorkflowState::new(query)).await
    }

    /// Drive an existing state to completion
    pub async fn run_state(&self, state: WorkflowState) -> Result<WorkflowState> {
        let run_id = Uuid::new_v4();
        self.drive(state)
            .instrument(info_span!("workflow", %run_id))
            .await
    }

    async fn drive(&self, mut state: WorkflowState) -> Result<WorkflowState> {
        let mut phase = Phase::Routing;
        let mut steps = 0;

        loop {
            phase = match phase {
                Phase::Done => break,
                Phase::Routing => {
                    self.take_step(&mut steps)?;
                    let route = self.router.route(&mut state).await?;
                    self.observer.on_route(route);
                    self.observer.on_step(SUPERVISOR, state.last_message());

                    if route.is_finish() {
                        Phase::Done
                    } else {
                        Phase::RunningSpecialist(route)
                    }
                }
                Phase::RunningSpecialist(route) => {
                    self.take_step(&mut steps)?;
                    let specialist = self.team.get(route).ok_or_else(|| {
                        Error::ProcessingFailed(format!("No specialist registered for {route}"))
                    })?;
                    specialist.run(self.agent.as_ref(), &mut state).await?;
                    self.observer.on_step(specialist.label(), state.last_message());

                    Phase::Routing
                }
            };
        }

        info!(steps, history_len = state.history().len(), "Workflow finished");
        Ok(state)
    }

    fn take_step(&self, steps: &mut usize) -> Result<()> {
        if *steps >= self.max_steps {
            return Err(Error::ProcessingFailed(format!(
                "step limit of {} reached before the supervisor finished",
                self.max_steps
            )));
        }
        *steps += 1;
        Ok(())
    }
}

impl std::fmt::Debug for WorkflowDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowDriver")
            .field("router", &self.router)
            .field("team", &self.team)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}

pub struct WorkflowDriverBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    agent: Option<Arc<dyn AgentWrapper>>,
    tools: Option<ToolRegistry>,
    team: Option<SpecialistTeam>,
    observer: Arc<dyn WorkflowObserver>,
    event_handler: Option<Arc<dyn ExecutorEventHandler>>,
    llm: LlmConfig,
    workflow: WorkflowConfig,
}

impl WorkflowDriverBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            agent: None,
            tools: None,
            team: None,
            observer: Arc::new(NoopObserver),
            event_handler: None,
            llm: LlmConfig::default(),
            workflow: WorkflowConfig::default(),
        }
    }

    /// Model settings and limits from the analyst config
    #[must_use]
    pub fn config(mut self, config: &AnalystConfig) -> Self {
        self.llm = config.llm.clone();
        self.workflow = config.workflow.clone();
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Run specialists with this wrapper instead of an [`AgentExecutor`]
    #[must_use]
    pub fn agent(mut self, agent: Arc<dyn AgentWrapper>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Full tool registry; each specialist takes the tools matching its patterns
    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Prepared team; takes precedence over [`Self::tools`]
    #[must_use]
    pub fn team(mut self, team: SpecialistTeam) -> Self {
        self.team = Some(team);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Tool callbacks for the default executor
    #[must_use]
    pub fn event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.llm.model = model.into();
        self
    }

    #[must_use]
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.workflow.max_steps = max_steps;
        self
    }

    pub fn build(self) -> Result<WorkflowDriver> {
        let provider = self
            .provider
            .ok_or_else(|| Error::InitializationFailed("Provider not set".to_string()))?;

        if self.workflow.max_steps == 0 {
            return Err(Error::Configuration(
                "workflow.max_steps must be greater than zero".to_string(),
            ));
        }

        let team = match (self.team, self.tools) {
            (Some(team), _) => team,
            (None, Some(tools)) => SpecialistTeam::from_registry(&tools)?,
            (None, None) => {
                return Err(Error::Configuration("No tools registered".to_string()));
            }
        };

        let agent = match self.agent {
            Some(agent) => agent,
            None => {
                let config = ExecutorConfig {
                    max_iterations: self.workflow.max_agent_iterations,
                    model: self.llm.model.clone(),
                    max_tokens: self.llm.max_tokens,
                    temperature: self.llm.agent_temperature,
                };
                let mut executor = AgentExecutor::new(Arc::clone(&provider), config);
                if let Some(handler) = self.event_handler {
                    executor = executor.with_event_handler(handler);
                }
                Arc::new(executor)
            }
        };

        let router = SupervisorRouter::new(provider, self.llm.model)?
            .with_temperature(self.llm.router_temperature);

        Ok(WorkflowDriver {
            router,
            team,
            agent,
            observer: self.observer,
            max_steps: self.workflow.max_steps,
        })
    }
}

impl Default for WorkflowDriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_llm::testing::{ScriptedProvider, ScriptedReply};
    use analyst_llm::{Message, Role};
    use analyst_runtime::testing::{ScriptedAgent, ScriptedTurn};
    use analyst_tools::Tool;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        async fn execute(&self, params: Value) -> Result<Value> {
            Ok(json!({"tool": self.0, "input": params}))
        }

        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "echo"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
    }

    fn tools() -> ToolRegistry {
        [
            "get_stock_price",
            "get_historical_data",
            "get_stock_info",
            "create_chart",
            "create_comparison",
            "get_stock_news",
            "save_report",
        ]
        .into_iter()
        .fold(ToolRegistry::new(), |r, n| r.with_tool(Arc::new(Echo(n))))
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl WorkflowObserver for Recorder {
        fn on_route(&self, route: Route) {
            self.events.lock().unwrap().push(format!("route {route}"));
        }

        fn on_step(&self, node: &str, _last_message: Option<&Message>) {
            self.events.lock().unwrap().push(format!("step {node}"));
        }
    }

    fn driver(
        router_replies: Vec<ScriptedReply>,
        agent: Arc<ScriptedAgent>,
        observer: Arc<Recorder>,
    ) -> WorkflowDriver {
        WorkflowDriver::builder()
            .provider(Arc::new(ScriptedProvider::new(router_replies)))
            .agent(agent)
            .tools(tools())
            .observer(observer)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_every_specialist_returns_to_supervisor() {
        let agent = Arc::new(ScriptedAgent::new([
            ScriptedTurn::tool("get_stock_price", json!({"ticker": "TSLA"}), "Ready for next step"),
            ScriptedTurn::tool("create_chart", json!({"ticker": "TSLA"}), "Chart saved successfully"),
        ]));
        let observer = Arc::new(Recorder::default());
        let driver = driver(
            vec![
                ScriptedReply::text("data_analyst"),
                ScriptedReply::text("chart_specialist"),
                ScriptedReply::text("FINISH"),
            ],
            agent.clone(),
            observer.clone(),
        );

        let state = driver.run("Show me a 3-month chart for TSLA").await.unwrap();

        assert_eq!(
            *observer.events.lock().unwrap(),
            vec![
                "route data_analyst",
                "step supervisor",
                "step data_analyst",
                "route chart_specialist",
                "step supervisor",
                "step chart_specialist",
                "route finish",
                "step supervisor",
            ]
        );
        // user + 3 routing notes + 2 turns of (call, result, answer)
        assert_eq!(state.history().len(), 10);
        assert_eq!(state.next_route(), Some(Route::Finish));
        assert_eq!(
            state.final_answer().and_then(Message::text),
            Some("Chart saved successfully")
        );

        let labels: Vec<_> = agent.invocations().into_iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["data_analyst", "chart_specialist"]);
    }

    #[tokio::test]
    async fn test_specialist_sees_routing_note() {
        let agent = Arc::new(ScriptedAgent::new([ScriptedTurn::answer("No news today")]));
        let driver = driver(
            vec![
                ScriptedReply::text("news_analyst"),
                ScriptedReply::text("finish"),
            ],
            agent.clone(),
            Arc::new(Recorder::default()),
        );

        let state = driver.run("Get the latest news for NVDA").await.unwrap();

        assert_eq!(agent.invocations()[0].history_len, 2);
        assert_eq!(state.history().len(), 4);
        assert!(state.history().iter().skip(1).all(|m| m.role == Role::Assistant));
    }

    #[tokio::test]
    async fn test_step_limit() {
        let agent = Arc::new(ScriptedAgent::new([ScriptedTurn::answer("again")]));
        let driver = WorkflowDriver::builder()
            .provider(Arc::new(ScriptedProvider::new([
                ScriptedReply::text("data_analyst"),
                ScriptedReply::text("data_analyst"),
            ])))
            .agent(agent.clone())
            .tools(tools())
            .max_steps(3)
            .build()
            .unwrap();

        let err = driver.run("loop forever").await.unwrap_err();
        assert!(matches!(err, Error::ProcessingFailed(ref m) if m.contains("step limit of 3")));
        assert_eq!(agent.invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_specialist_backend_failure_aborts() {
        let agent = Arc::new(ScriptedAgent::new([ScriptedTurn::Fail("timeout".into())]));
        let driver = driver(
            vec![ScriptedReply::text("report_writer")],
            agent,
            Arc::new(Recorder::default()),
        );

        let err = driver.run("Write a report").await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_default_executor_runs_tools() {
        let provider = Arc::new(ScriptedProvider::new([
            ScriptedReply::text("data_analyst"),
            ScriptedReply::tool_call("get_stock_info", json!({"ticker": "AAPL"})),
            ScriptedReply::text("Apple Inc., technology. Ready for next step"),
            ScriptedReply::text("finish"),
        ]));
        let driver = WorkflowDriver::builder()
            .config(&AnalystConfig::default())
            .provider(provider.clone())
            .tools(tools())
            .build()
            .unwrap();

        let state = driver.run("Tell me about Apple").await.unwrap();

        assert_eq!(provider.remaining(), 0);
        let requests = provider.requests();
        assert_eq!(requests[0].temperature, Some(0.0));
        assert_eq!(requests[1].temperature, Some(0.1));
        assert_eq!(requests[1].tools.as_ref().map(Vec::len), Some(3));
        assert!(state.analysis_context().contains_key("get_stock_info:AAPL"));
    }

    #[test]
    fn test_builder_validation() {
        assert!(matches!(
            WorkflowDriver::builder().tools(tools()).build(),
            Err(Error::InitializationFailed(_))
        ));

        let provider: Arc<dyn LLMProvider> = Arc::new(ScriptedProvider::default());
        assert!(matches!(
            WorkflowDriver::builder().provider(provider.clone()).build(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            WorkflowDriver::builder()
                .provider(provider)
                .tools(tools())
                .max_steps(0)
                .build(),
            Err(Error::Configuration(_))
        ));
    }
}
