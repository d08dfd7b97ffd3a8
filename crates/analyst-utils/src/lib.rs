//! Shared utilities for the financial analyst
//!
//! Tracing setup and the [`AnalystConfig`] that every binary builds once at
//! startup and passes down explicitly.

pub mod config;
pub mod logging;

pub use config::{
    AnalystConfig, LlmConfig, MarketConfig, MarketProvider, OutputConfig, WorkflowConfig,
};
pub use logging::{LogFormat, init_tracing, init_tracing_json, init_tracing_with};
