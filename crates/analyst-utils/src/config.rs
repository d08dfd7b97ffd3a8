//! Analyst configuration
//!
//! Built once at startup from an optional JSON file plus environment
//! overrides, validated, then passed to every component that needs it.
//!
//! ```json
//! {
//!   "llm": { "model": "granite4:3b", "api_base": "http://localhost:11434/v1" },
//!   "workflow": { "max_steps": 30 },
//!   "output": { "charts_dir": "outputs/charts" },
//!   "market": { "provider": "sample" },
//!   "mcp_config": "mcp.json"
//! }
//! ```
//!
//! Every field is optional; missing ones take the defaults below.

use analyst_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "ANALYST_CONFIG";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystConfig {
    pub llm: LlmConfig,
    pub workflow: WorkflowConfig,
    pub output: OutputConfig,
    pub market: MarketConfig,
    /// Tool-server (MCP) config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_config: Option<PathBuf>,
}

/// OpenAI-compatible completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    /// Sampling temperature for specialists
    pub agent_temperature: f32,
    /// Sampling temperature for the supervisor
    pub router_temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:11434/v1".to_string(),
            api_key: "ollama".to_string(),
            model: "granite4:3b".to_string(),
            agent_temperature: 0.1,
            router_temperature: 0.0,
            max_tokens: 2048,
            timeout_secs: 180,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Router plus specialist steps allowed per run
    pub max_steps: usize,
    /// Model calls allowed per specialist turn
    pub max_agent_iterations: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_steps: 30,
            max_agent_iterations: 8,
        }
    }
}

/// Where generated artifacts are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub charts_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            charts_dir: PathBuf::from("outputs/charts"),
            reports_dir: PathBuf::from("outputs/reports"),
        }
    }
}

/// Source of quotes, history and company data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketProvider {
    /// Yahoo Finance, with Alpha Vantage for fundamentals and news when keyed
    #[default]
    Yahoo,
    /// Deterministic offline figures
    Sample,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub provider: MarketProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_vantage_api_key: Option<String>,
    /// Requests per minute (free tier allows 5)
    pub alpha_vantage_rate_limit: u32,
    pub cache_ttl_secs: u64,
    /// Default article count for news lookups
    pub news_limit: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            provider: MarketProvider::Yahoo,
            alpha_vantage_api_key: None,
            alpha_vantage_rate_limit: 5,
            cache_ttl_secs: 60,
            news_limit: 10,
        }
    }
}

impl AnalystConfig {
    /// Load from `path`, else from `$ANALYST_CONFIG`, else defaults; then
    /// apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Configuration(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Apply `OPENAI_API_BASE`, `OPENAI_API_KEY`, `ANALYST_MODEL` and
    /// `ALPHA_VANTAGE_API_KEY` as returned by `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base) = lookup("OPENAI_API_BASE") {
            self.llm.api_base = base;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(model) = lookup("ANALYST_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = lookup("ALPHA_VANTAGE_API_KEY") {
            self.market.alpha_vantage_api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::Configuration(msg));

        if self.llm.model.trim().is_empty() {
            return invalid("llm.model must not be empty".to_string());
        }
        match url::Url::parse(&self.llm.api_base) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return invalid(format!(
                    "llm.api_base must be http(s), got scheme '{}'",
                    url.scheme()
                ));
            }
            Err(e) => return invalid(format!("llm.api_base '{}': {e}", self.llm.api_base)),
        }
        for (name, value) in [
            ("llm.agent_temperature", self.llm.agent_temperature),
            ("llm.router_temperature", self.llm.router_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return invalid(format!("{name} must be within 0.0..=2.0, got {value}"));
            }
        }
        if self.llm.max_tokens == 0 {
            return invalid("llm.max_tokens must be greater than 0".to_string());
        }
        if self.workflow.max_steps == 0 {
            return invalid("workflow.max_steps must be greater than 0".to_string());
        }
        if self.workflow.max_agent_iterations == 0 {
            return invalid("workflow.max_agent_iterations must be greater than 0".to_string());
        }
        if self.market.news_limit == 0 {
            return invalid("market.news_limit must be greater than 0".to_string());
        }
        if self.market.alpha_vantage_rate_limit == 0 {
            return invalid("market.alpha_vantage_rate_limit must be greater than 0".to_string());
        }
        Ok(())
    }
}
