//! System prompts for the supervisor and the specialists
//!
//! Templates are rendered once when the router and the team are built, with
//! the labels and tool names that are actually wired up.

use analyst_core::{Error, Result};
use analyst_tools::ToolRegistry;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::route::Route;

const SUPERVISOR_TEMPLATE: &str = "\
You are a Financial Analysis Supervisor coordinating a team of specialized agents.
Your goal is to complete the USER'S REQUEST in its entirety, including any files it asks for.

Your team and the labels you may answer with:
{% for member in team -%}
- **{{ member.label }}**: {{ member.duty }}
{% endfor %}
**CURRENT STATE ANALYSIS:**
Check the conversation history.
1. Has the requested data been retrieved?
2. Has a chart been created? (Look for \"Chart saved to...\")
3. Has a report been saved? (Look for \"Report saved to...\")

**ROUTING RULES:**
1. If data is needed but not retrieved -> `data_analyst`
2. If the user wants news that has not been fetched -> `news_analyst`
3. If the user wants a chart and no chart exists -> `chart_specialist`
4. If the user wants a report and no report exists -> `report_writer`
5. If every part of the request is done -> `finish`

Never send the same specialist the same work twice.
Respond with ONLY the agent name or finish.";

const SPECIALIST_TEMPLATE: &str = "\
You are a {{ role }}.
Your goal: {{ goal }}
DO NOT PLAN. DO NOT EXPLAIN.
IMMEDIATELY call the appropriate tool for the user's request.
{% for tool in tools -%}
- `{{ tool.name }}`: {{ tool.description }}
{% endfor -%}
{% if guidance %}{{ guidance }}
{% endif -%}
After the tool runs, {{ closing }}";

#[derive(Serialize)]
struct TeamMember {
    label: &'static str,
    duty: &'static str,
}

#[derive(Serialize)]
struct ToolLine {
    name: String,
    description: String,
}

struct RoleText {
    role: &'static str,
    goal: &'static str,
    guidance: Option<&'static str>,
    closing: &'static str,
}

fn duty(route: Route) -> &'static str {
    match route {
        Route::DataAnalyst => "Gets current prices, price history and company information.",
        Route::ChartSpecialist => "Creates price and comparison charts (saves .svg files).",
        Route::NewsAnalyst => "Gets recent news headlines.",
        Route::ReportWriter => "Saves written reports (saves .md files).",
        Route::Finish => "Ends the analysis once every part of the request is done.",
    }
}

fn role_text(route: Route) -> RoleText {
    match route {
        Route::DataAnalyst => RoleText {
            role: "Data Analyst",
            goal: "Retrieve financial data using your tools.",
            guidance: None,
            closing: "give a VERY BRIEF summary and say \"Ready for next step\".",
        },
        Route::ChartSpecialist => RoleText {
            role: "Chart Specialist",
            goal: "Create visualizations using your tools.",
            guidance: Some("Use one chart per stock, or a comparison when several stocks are named."),
            closing: "say \"Chart saved successfully\".",
        },
        Route::NewsAnalyst => RoleText {
            role: "News Analyst",
            goal: "Get news using your tools.",
            guidance: None,
            closing: "summarize the key points.",
        },
        Route::ReportWriter | Route::Finish => RoleText {
            role: "Report Writer",
            goal: "Save a report using your tools.",
            guidance: Some(
                "Use the data provided in the conversation history to write the report content.",
            ),
            closing: "say \"Report saved successfully\".",
        },
    }
}

fn render(name: &str, template: &str, vars: minijinja::Value) -> Result<String> {
    let env = Environment::new();
    env.render_str(template, vars)
        .map_err(|e| Error::InitializationFailed(format!("Failed to render {name} prompt: {e}")))
}

/// Instruction for the routing call
pub fn supervisor_prompt() -> Result<String> {
    let team: Vec<TeamMember> = Route::PRIORITY
        .into_iter()
        .map(|route| TeamMember {
            label: route.as_str(),
            duty: duty(route),
        })
        .collect();

    render("supervisor", SUPERVISOR_TEMPLATE, context! { team => team })
}

/// Role prompt for a specialist, listing the tools it was given
pub fn specialist_prompt(route: Route, tools: &ToolRegistry) -> Result<String> {
    let text = role_text(route);
    let tools: Vec<ToolLine> = tools
        .list_tools()
        .iter()
        .map(|tool| ToolLine {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
        })
        .collect();

    render(
        route.as_str(),
        SPECIALIST_TEMPLATE,
        context! {
            role => text.role,
            goal => text.goal,
            guidance => text.guidance,
            closing => text.closing,
            tools => tools,
        },
    )
}
