//! Supervisor router
//!
//! One classification call per routing step. The reply is free text from a
//! small local model, so it is mapped onto [`Route`] with [`parse_route`]
//! rather than trusted verbatim.

use analyst_core::{Error, Result};
use analyst_llm::{CompletionRequest, LLMProvider};
use std::sync::Arc;
use tracing::{debug, info};

use crate::prompts::supervisor_prompt;
use crate::route::{Route, parse_route};
use crate::state::WorkflowState;

const DEFAULT_MAX_TOKENS: usize = 256;

pub struct SupervisorRouter {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    max_tokens: usize,
    system_prompt: String,
}

impl SupervisorRouter {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: supervisor_prompt()?,
        })
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Decide the next step and record it in `state`
    ///
    /// Appends exactly one message attributed to the supervisor. Backend
    /// failures are returned as errors; an unreadable reply routes to
    /// [`Route::Finish`].
    pub async fn route(&self, state: &mut WorkflowState) -> Result<Route> {
        if state.history().is_empty() {
            return Err(Error::ProcessingFailed(
                "Cannot route an empty conversation".to_string(),
            ));
        }

        let request = CompletionRequest::builder(&self.model)
            .messages(state.history().to_vec())
            .system(&self.system_prompt)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build();

        let response = self.provider.complete(request).await?;
        let reply = response.message.text().unwrap_or_default();
        let route = parse_route(reply);

        debug!(reply = %reply, "Supervisor reply");
        info!(route = %route, history_len = state.history().len(), "Supervisor decision");

        state.record_route(route);
        Ok(route)
    }
}

impl std::fmt::Debug for SupervisorRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorRouter")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SUPERVISOR;
    use analyst_llm::{
        CompletionResponse, LLMError, Message, MockLLMProvider, StopReason, TokenUsage,
    };

    fn reply(text: &'static str) -> MockLLMProvider {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete().times(1).returning(move |_| {
            Ok(CompletionResponse {
                message: Message::assistant(text),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        });
        mock
    }

    fn router(mock: MockLLMProvider) -> SupervisorRouter {
        SupervisorRouter::new(Arc::new(mock), "granite4:3b").unwrap()
    }

    #[tokio::test]
    async fn test_exact_reply() {
        let mut state = WorkflowState::new("What's the current price of Apple?");
        let route = router(reply("data_analyst")).route(&mut state).await.unwrap();

        assert_eq!(route, Route::DataAnalyst);
        assert_eq!(state.next_route(), Some(Route::DataAnalyst));
        assert_eq!(state.history().len(), 2);

        let note = state.last_message().unwrap();
        assert_eq!(note.text(), Some("Routing to data_analyst"));
        assert_eq!(note.name(), Some(SUPERVISOR));
    }

    #[tokio::test]
    async fn test_chatty_reply() {
        let mut state = WorkflowState::new("Show me a 6-month chart for TSLA");
        let route = router(reply("The chart_specialist should handle this."))
            .route(&mut state)
            .await
            .unwrap();
        assert_eq!(route, Route::ChartSpecialist);
    }

    #[tokio::test]
    async fn test_unrecognized_reply_finishes() {
        let mut state = WorkflowState::new("Thanks!");
        let route = router(reply("I think we should finish now"))
            .route(&mut state)
            .await
            .unwrap();
        assert_eq!(route, Route::Finish);
        assert_eq!(
            state.last_message().and_then(Message::text),
            Some("Routing to finish")
        );
    }

    #[tokio::test]
    async fn test_request_shape() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .withf(|req| {
                req.temperature == Some(0.0)
                    && req.tools.is_none()
                    && req.messages.len() == 1
                    && req
                        .system
                        .as_deref()
                        .is_some_and(|s| s.contains("report_writer"))
            })
            .times(1)
            .returning(|_| {
                Ok(CompletionResponse {
                    message: Message::assistant("FINISH"),
                    stop_reason: StopReason::EndTurn,
                    usage: TokenUsage::default(),
                })
            });

        let mut state = WorkflowState::new("hello");
        assert_eq!(router(mock).route(&mut state).await.unwrap(), Route::Finish);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .returning(|_| Err(LLMError::RequestFailed("connection refused".to_string())));

        let mut state = WorkflowState::new("q");
        let err = router(mock).route(&mut state).await.unwrap_err();

        assert!(matches!(err, Error::BackendUnavailable(_)));
        assert!(err.is_fatal());
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.next_route(), None);
    }

    #[tokio::test]
    async fn test_empty_history_is_an_error() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete().never();

        let mut state = WorkflowState::default();
        let err = router(mock).route(&mut state).await.unwrap_err();
        assert!(matches!(err, Error::ProcessingFailed(_)));
    }
}
