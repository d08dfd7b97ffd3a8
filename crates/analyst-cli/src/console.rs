//! Terminal output: step echo, tool activity and the run transcript

use analyst_llm::{ContentBlock, Message, MessageContent, Role};
use analyst_runtime::ExecutorEventHandler;
use analyst_workflow::{Route, WorkflowObserver, WorkflowState};
use async_trait::async_trait;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde_json::Value;

const RULE_WIDTH: usize = 80;
const STEP_PREVIEW: usize = 200;
const TRANSCRIPT_PREVIEW: usize = 160;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// First `max` characters, with an ellipsis when cut
pub fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Prints each node as it finishes
#[derive(Debug, Default)]
pub struct StepPrinter;

impl WorkflowObserver for StepPrinter {
    fn on_route(&self, route: Route) {
        println!("\nSupervisor Decision: {route}");
    }

    fn on_step(&self, node: &str, last_message: Option<&Message>) {
        println!("\nNode: {node}");
        if let Some(text) = last_message.and_then(Message::text).filter(|t| !t.is_empty()) {
            println!("  {}", preview(text, STEP_PREVIEW));
        }
    }
}

/// Prints tool calls made by specialists
#[derive(Debug, Default)]
pub struct ToolPrinter;

#[async_trait]
impl ExecutorEventHandler for ToolPrinter {
    async fn on_tool_start(&self, agent: &str, tool: &str, input: &Value) {
        println!("  [{agent}] -> {tool} {input}");
    }

    async fn on_tool_done(
        &self,
        _agent: &str,
        tool: &str,
        result: Result<&Value, &str>,
        duration_ms: u64,
    ) {
        match result {
            Ok(_) => println!("  <- {tool} ok ({duration_ms} ms)"),
            Err(e) => println!("  <- {tool} failed ({duration_ms} ms): {}", preview(e, STEP_PREVIEW)),
        }
    }
}

fn describe(message: &Message) -> String {
    match &message.content {
        Some(MessageContent::Text(text)) => text.clone(),
        Some(MessageContent::Blocks(blocks)) => blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.clone(),
                ContentBlock::ToolUse { name, input, .. } => format!("call {name}({input})"),
                ContentBlock::ToolResult {
                    content, is_error, ..
                } => {
                    if *is_error == Some(true) {
                        format!("[error] {content}")
                    } else {
                        content.clone()
                    }
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        None => String::new(),
    }
}

/// Attributed history as a table
pub fn transcript(state: &WorkflowState) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Role", "Agent", "Content"]);

    for (index, message) in state.history().iter().enumerate() {
        let agent = match (message.name(), message.role) {
            (Some(name), _) => name,
            (None, Role::User) => "user",
            (None, _) => "-",
        };
        table.add_row(vec![
            (index + 1).to_string(),
            message.role.to_string(),
            agent.to_string(),
            preview(&describe(message), TRANSCRIPT_PREVIEW),
        ]);
    }

    table
}

/// Saved chart and report paths, if any
pub fn artifacts(state: &WorkflowState) -> Vec<String> {
    let ctx = state.analysis_context();
    [("Chart", ctx.last_chart()), ("Report", ctx.last_report())]
        .into_iter()
        .filter_map(|(kind, path)| path.map(|p| format!("{kind}: {p}")))
        .collect()
}
