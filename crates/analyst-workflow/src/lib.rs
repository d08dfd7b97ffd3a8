//! Supervisor routing and the specialist loop for the financial analyst
//!
//! A [`WorkflowDriver`] takes a user query and alternates between the
//! [`SupervisorRouter`], which picks the next [`Route`], and the specialist
//! for that route, until the supervisor answers `finish`. The finished
//! [`WorkflowState`] holds the attributed conversation and the artifacts the
//! tools produced.
//!
//! # Example
//!
//! ```no_run
//! use analyst_utils::AnalystConfig;
//! use analyst_workflow::{WorkflowDriver, toolkit};
//!
//! # async fn example() -> analyst_core::Result<()> {
//! let config = AnalystConfig::load(None)?;
//! let toolkit = toolkit::assemble(&config).await?;
//!
//! let driver = WorkflowDriver::builder()
//!     .config(&config)
//!     .provider(toolkit::build_provider(&config.llm)?)
//!     .team(toolkit.team)
//!     .build()?;
//!
//! let state = driver.run("What's the current price of Apple stock?").await?;
//! if let Some(answer) = state.final_answer().and_then(|m| m.text()) {
//!     println!("{answer}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod observer;
pub mod prompts;
pub mod route;
pub mod router;
pub mod specialist;
pub mod state;
pub mod toolkit;

pub use driver::{WorkflowDriver, WorkflowDriverBuilder};
pub use observer::{NoopObserver, WorkflowObserver};
pub use route::{Route, parse_route};
pub use router::SupervisorRouter;
pub use specialist::{Specialist, SpecialistTeam, tool_patterns};
pub use state::{SUPERVISOR, WorkflowState};
pub use toolkit::{Toolkit, build_provider};
