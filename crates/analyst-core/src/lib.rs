//! Core types for the financial analyst workspace
//!
//! This crate defines the error taxonomy and the shared analysis context
//! used throughout the workspace.

pub mod context;
pub mod error;

pub use context::AnalysisContext;
pub use error::{Error, Result};
