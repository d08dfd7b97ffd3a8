//! Per-run workflow state

use analyst_core::context::{keys, tool_result_key};
use analyst_core::{AnalysisContext, Error, Result};
use analyst_llm::{ContentBlock, Message, MessageContent};
use serde_json::Value;
use std::collections::HashMap;

use crate::route::Route;

/// Label on every message the router appends
pub const SUPERVISOR: &str = "supervisor";

/// Everything one run knows
///
/// Created from the user's query, moved into the driver and handed back when
/// the supervisor finishes. History only ever grows.
#[derive(Debug, Default)]
pub struct WorkflowState {
    history: Vec<Message>,
    next_route: Option<Route>,
    analysis_context: AnalysisContext,
}

impl WorkflowState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            history: vec![Message::user(query)],
            next_route: None,
            analysis_context: AnalysisContext::new(),
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// The supervisor's latest decision
    pub fn next_route(&self) -> Option<Route> {
        self.next_route
    }

    pub fn analysis_context(&self) -> &AnalysisContext {
        &self.analysis_context
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    /// Most recent specialist answer, skipping routing notes
    pub fn final_answer(&self) -> Option<&Message> {
        self.history
            .iter()
            .rev()
            .find(|m| m.is_final_answer() && m.name() != Some(SUPERVISOR))
    }

    /// Record a routing decision as a supervisor message
    pub(crate) fn record_route(&mut self, route: Route) {
        self.history
            .push(Message::assistant(format!("Routing to {route}")).with_name(SUPERVISOR));
        self.next_route = Some(route);
    }

    /// Append one specialist turn
    ///
    /// The turn must end with a plain answer; it is attributed to `label`.
    /// Successful tool results are copied into the analysis context.
    pub(crate) fn append_turn(&mut self, label: &str, mut messages: Vec<Message>) -> Result<usize> {
        let Some(last) = messages.pop().filter(Message::is_final_answer) else {
            return Err(Error::ProcessingFailed(format!(
                "{label} returned without a final answer"
            )));
        };
        messages.push(last.with_name(label));

        self.record_tool_results(&messages);
        let added = messages.len();
        self.history.extend(messages);
        Ok(added)
    }

    fn record_tool_results(&mut self, messages: &[Message]) {
        let mut calls: HashMap<&str, (&str, &Value)> = HashMap::new();

        for block in messages.iter().flat_map(blocks) {
            match block {
                ContentBlock::ToolUse { id, name, input } => {
                    calls.insert(id.as_str(), (name.as_str(), input));
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } if *is_error != Some(true) => {
                    let Some(&(tool, input)) = calls.get(tool_use_id.as_str()) else {
                        continue;
                    };
                    let Ok(result) = serde_json::from_str::<Value>(content) else {
                        continue;
                    };
                    self.record_result(tool, input, result);
                }
                _ => {}
            }
        }
    }

    fn record_result(&mut self, tool: &str, input: &Value, result: Value) {
        let ctx = &mut self.analysis_context;

        if let Some(filename) = result.get("filename").and_then(Value::as_str) {
            if tool.contains("create_chart") || tool.contains("create_comparison") {
                ctx.insert(keys::LAST_CHART, Value::from(filename));
            } else if tool.contains("report") {
                ctx.insert(keys::LAST_REPORT, Value::from(filename));
            }
        }

        if let Some(subject) = subject(input, &result) {
            if !subject.contains(',') {
                ctx.insert(keys::LAST_TICKER, Value::from(subject.clone()));
            }
            ctx.insert(tool_result_key(tool, &subject), result);
        }
    }
}

fn blocks(message: &Message) -> &[ContentBlock] {
    match &message.content {
        Some(MessageContent::Blocks(blocks)) => blocks,
        _ => &[],
    }
}

/// Ticker a tool call was about, or the comma-joined list for comparisons
fn subject(input: &Value, result: &Value) -> Option<String> {
    let single = ["ticker", "symbol"]
        .into_iter()
        .find_map(|k| input.get(k).or_else(|| result.get(k)))
        .and_then(Value::as_str);
    if let Some(ticker) = single {
        return Some(ticker.trim().to_uppercase());
    }

    match input.get("tickers").or_else(|| input.get("symbols"))? {
        Value::String(joined) => Some(joined.replace(' ', "").to_uppercase()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|t| t.trim().to_uppercase())
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str, name: &str, input: Value) -> Message {
        Message::tool_calls(vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }])
    }

    #[test]
    fn test_new_state() {
        let state = WorkflowState::new("What's the current price of Apple?");
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.next_route(), None);
        assert!(state.analysis_context().is_empty());
        assert!(state.final_answer().is_none());
    }

    #[test]
    fn test_record_route() {
        let mut state = WorkflowState::new("q");
        state.record_route(Route::NewsAnalyst);

        let last = state.last_message().unwrap();
        assert_eq!(last.text(), Some("Routing to news_analyst"));
        assert_eq!(last.name(), Some(SUPERVISOR));
        assert_eq!(state.next_route(), Some(Route::NewsAnalyst));
        assert!(state.final_answer().is_none());
    }

    #[test]
    fn test_append_turn_labels_answer_and_records_context() {
        let mut state = WorkflowState::new("Price of Apple?");
        let added = state
            .append_turn(
                "data_analyst",
                vec![
                    call("c1", "get_stock_price", json!({"ticker": "aapl"})),
                    Message::tool_result(
                        "c1".into(),
                        json!({"ticker": "AAPL", "current_price": 189.84}).to_string(),
                    ),
                    Message::assistant("AAPL is $189.84. Ready for next step"),
                ],
            )
            .unwrap();

        assert_eq!(added, 3);
        assert_eq!(state.history().len(), 4);
        assert_eq!(state.final_answer().and_then(Message::name), Some("data_analyst"));

        let ctx = state.analysis_context();
        assert_eq!(ctx.last_ticker(), Some("AAPL"));
        assert_eq!(
            ctx.get("get_stock_price:AAPL").unwrap()["current_price"],
            189.84
        );
    }

    #[test]
    fn test_artifacts_recorded() {
        let mut state = WorkflowState::new("q");
        state
            .append_turn(
                "chart_specialist",
                vec![
                    call("c1", "create_comparison", json!({"tickers": ["aapl", "msft"]})),
                    Message::tool_result(
                        "c1".into(),
                        json!({"success": true, "filename": "charts/comparison_AAPL_MSFT_1y.svg"})
                            .to_string(),
                    ),
                    Message::assistant("Chart saved successfully"),
                ],
            )
            .unwrap();
        state
            .append_turn(
                "report_writer",
                vec![
                    call("c2", "save_report", json!({"content": "x", "filename": "r.md"})),
                    Message::tool_result(
                        "c2".into(),
                        json!({"success": true, "filename": "reports/r.md"}).to_string(),
                    ),
                    Message::assistant("Report saved successfully"),
                ],
            )
            .unwrap();

        let ctx = state.analysis_context();
        assert_eq!(ctx.last_chart(), Some("charts/comparison_AAPL_MSFT_1y.svg"));
        assert_eq!(ctx.last_report(), Some("reports/r.md"));
        assert!(ctx.contains_key("create_comparison:AAPL,MSFT"));
        assert_eq!(ctx.last_ticker(), None);
    }

    #[test]
    fn test_tool_server_chart_recorded() {
        // tool-server results arrive as the server's own JSON object
        let mut state = WorkflowState::new("Show me a 6-month chart for TSLA");
        state
            .append_turn(
                "chart_specialist",
                vec![
                    call("c1", "create_chart", json!({"ticker": "TSLA", "period": "6mo"})),
                    Message::tool_result(
                        "c1".into(),
                        r#"{"success": true, "filename": "outputs/charts/TSLA_6mo.png", "message": "Chart saved to outputs/charts/TSLA_6mo.png"}"#
                            .into(),
                    )
                    .with_name("chart_specialist"),
                    Message::assistant("Chart saved successfully"),
                ],
            )
            .unwrap();

        let ctx = state.analysis_context();
        assert_eq!(ctx.last_chart(), Some("outputs/charts/TSLA_6mo.png"));
        assert_eq!(ctx.last_ticker(), Some("TSLA"));
    }

    #[test]
    fn test_tool_errors_not_recorded() {
        let mut state = WorkflowState::new("q");
        state
            .append_turn(
                "data_analyst",
                vec![
                    call("c1", "get_stock_price", json!({"ticker": "ZZZZ"})),
                    Message::tool_error("c1".into(), "Error: no data".into()),
                    Message::assistant("Could not find ZZZZ"),
                ],
            )
            .unwrap();
        assert!(state.analysis_context().is_empty());
    }

    #[test]
    fn test_turn_without_answer_rejected() {
        let mut state = WorkflowState::new("q");
        let err = state
            .append_turn("news_analyst", vec![call("c1", "get_stock_news", json!({}))])
            .unwrap_err();
        assert!(matches!(err, Error::ProcessingFailed(_)));
        assert!(state.append_turn("news_analyst", Vec::new()).is_err());
        assert_eq!(state.history().len(), 1);
    }
}
