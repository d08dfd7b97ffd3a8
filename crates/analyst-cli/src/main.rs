//! Financial analyst command-line interface
//!
//! ```bash
//! # Local Ollama with the default model
//! financial-analyst
//!
//! # One query, then exit
//! financial-analyst --query "What's the current price of Apple (AAPL)?"
//!
//! # Offline demo data and the full attributed history
//! ANALYST_CONFIG=analyst.json financial-analyst --transcript
//! ```

mod console;

use analyst_utils::{AnalystConfig, LogFormat, init_tracing_with};
use analyst_workflow::{WorkflowDriver, toolkit};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use console::{StepPrinter, ToolPrinter, artifacts, rule, transcript};

const DEFAULT_LOG_DIRECTIVE: &str = "warn,analyst=info";

const EXAMPLE_QUERIES: [&str; 6] = [
    "What's the current price of Apple stock?",
    "Show me a 6-month chart for TSLA",
    "Compare AAPL, GOOGL, and MSFT over the last year",
    "Get the latest news for NVDA",
    "Analyze Microsoft's historical performance over 3 months and create a chart",
    "Create a comprehensive report on Tesla's recent performance",
];

#[derive(Parser, Debug)]
#[command(name = "financial-analyst")]
#[command(about = "Multi-agent financial analysis over a local LLM", long_about = None)]
struct Args {
    /// JSON config file (defaults to $ANALYST_CONFIG, then built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single query and exit
    #[arg(short, long)]
    query: Option<String>,

    /// Print the full attributed history after each run
    #[arg(short, long)]
    transcript: bool,

    /// Log output format: text or json
    #[arg(long, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing_with(DEFAULT_LOG_DIRECTIVE, args.log_format);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = AnalystConfig::load(args.config.as_deref())?;
    println!("Initializing Financial Analyst Multi-Agent System...");
    println!("  Endpoint: {}", config.llm.api_base);
    println!("  Model:    {}", config.llm.model);

    let provider = toolkit::build_provider(&config.llm)?;
    let toolkit = toolkit::assemble(&config).await?;
    for specialist in toolkit.team.iter() {
        println!("  - {}: {}", specialist.label(), specialist.tools().names().join(", "));
    }

    let driver = WorkflowDriver::builder()
        .config(&config)
        .provider(provider)
        .team(toolkit.team)
        .observer(Arc::new(StepPrinter))
        .event_handler(Arc::new(ToolPrinter))
        .build()?;
    info!(model = %config.llm.model, max_steps = driver.max_steps(), "Workflow ready");

    let code = match &args.query {
        Some(query) => {
            if analyze(&driver, query, args.transcript).await {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        None => {
            interactive(&driver, args.transcript).await?;
            ExitCode::SUCCESS
        }
    };

    if let Some(manager) = &toolkit.mcp {
        manager.shutdown().await;
    }
    Ok(code)
}

/// Run one query to completion; returns whether it succeeded
async fn analyze(driver: &WorkflowDriver, query: &str, show_transcript: bool) -> bool {
    println!("\n{}", rule());
    println!("QUERY: {query}");
    println!("{}", rule());

    match driver.run(query).await {
        Ok(state) => {
            println!("\n{}", rule());
            println!("Analysis Complete!");
            println!("{}", rule());

            match state.final_answer().and_then(|m| m.text()) {
                Some(answer) => println!("\n{answer}"),
                None => println!("\n(no specialist was needed for this request)"),
            }
            for line in artifacts(&state) {
                println!("{line}");
            }
            if show_transcript {
                println!("\n{}", transcript(&state));
            }
            true
        }
        Err(e) => {
            eprintln!("\nError: {e}");
            false
        }
    }
}

async fn interactive(driver: &WorkflowDriver, show_transcript: bool) -> io::Result<()> {
    println!("\n{}", rule());
    println!("Financial Analyst Multi-Agent System - Interactive Mode");
    println!("{}", rule());
    println!("\nCommands:");
    println!("  - Enter your financial query");
    println!("  - Type 'examples' to see example queries");
    println!("  - Type 'quit' or 'exit' to stop");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("\nYour query: ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        let query = input.trim();
        match query.to_lowercase().as_str() {
            "" => {}
            "quit" | "exit" | "q" => {
                println!("\nGoodbye!");
                break;
            }
            "examples" => {
                println!("\nExample Queries:");
                for (i, example) in EXAMPLE_QUERIES.iter().enumerate() {
                    println!("  {}. {example}", i + 1);
                }
            }
            _ => {
                analyze(driver, query, show_transcript).await;
            }
        }
    }

    Ok(())
}
