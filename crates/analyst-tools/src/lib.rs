//! Tool framework for the financial analyst
//!
//! Tools are the named operations specialists may call (`get_stock_price`,
//! `create_chart`, `save_report`, ...). This crate defines the [`Tool`]
//! trait, the [`ToolRegistry`] holding every available tool, and the
//! name-pattern selection that gives each specialist its subset.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::{Tool, parse_params};
