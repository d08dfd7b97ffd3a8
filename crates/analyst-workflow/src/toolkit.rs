//! Startup wiring: completion backend, market tools and tool servers

use analyst_core::Result;
use analyst_llm::LLMProvider;
use analyst_llm::providers::{OpenAIConfig, OpenAIProvider};
use analyst_mcp::{MCPClientManager, MCPConfig, discovery};
use analyst_tools::ToolRegistry;
use analyst_utils::{AnalystConfig, LlmConfig};
use std::sync::Arc;
use tracing::{info, warn};

use crate::route::Route;
use crate::specialist::{Specialist, SpecialistTeam, tool_patterns};

/// OpenAI-compatible provider for the configured endpoint
pub fn build_provider(llm: &LlmConfig) -> Result<Arc<dyn LLMProvider>> {
    let config = OpenAIConfig::ollama()
        .with_api_base(&llm.api_base)
        .with_api_key(&llm.api_key)
        .with_timeout(llm.timeout_secs);
    Ok(Arc::new(OpenAIProvider::with_config(config)?))
}

/// The specialist team plus the tool-server connections backing it
pub struct Toolkit {
    pub team: SpecialistTeam,
    pub mcp: Option<Arc<MCPClientManager>>,
}

impl Toolkit {
    /// Stop any tool-server processes
    pub async fn shutdown(&self) {
        if let Some(manager) = &self.mcp {
            manager.shutdown().await;
        }
    }
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit")
            .field("team", &self.team)
            .field("mcp", &self.mcp.is_some())
            .finish()
    }
}

/// Build every specialist's tool set
///
/// The market tools are always present. When `mcp_config` is set, tool
/// servers are started and their tools added: without a `specialists`
/// section they join the shared registry and are sorted by name like the
/// built-ins; with one, each listed specialist also receives the tools of
/// its assigned servers. Servers that fail to start are skipped.
pub async fn assemble(config: &AnalystConfig) -> Result<Toolkit> {
    let mut registry = analyst_market::register_all(config);

    let Some(path) = &config.mcp_config else {
        return Ok(Toolkit {
            team: SpecialistTeam::from_registry(&registry)?,
            mcp: None,
        });
    };

    let mcp_config = MCPConfig::from_file(path)?;
    let per_specialist = !mcp_config.specialists.is_empty();
    let manager = Arc::new(MCPClientManager::new(Arc::new(mcp_config)));
    manager.initialize().await?;

    if !manager.has_connections().await {
        warn!(config = %path.display(), "No tool servers connected; using built-in tools only");
    }

    let team = if per_specialist {
        team_per_specialist(&manager, &registry).await?
    } else {
        let added = discovery::register_tools(&manager, &mut registry, None).await;
        info!(added, total = registry.len(), "Tool servers merged into shared registry");
        SpecialistTeam::from_registry(&registry)?
    };

    Ok(Toolkit {
        team,
        mcp: Some(manager),
    })
}

async fn team_per_specialist(
    manager: &Arc<MCPClientManager>,
    registry: &ToolRegistry,
) -> Result<SpecialistTeam> {
    let mut team = SpecialistTeam::from_registry(registry)?;

    for route in Route::SPECIALISTS {
        let Some(assigned) = manager.config().get_specialist_config(route.as_str()) else {
            continue;
        };

        let mut tools = registry.subset(tool_patterns(route));
        let added = discovery::register_tools(manager, &mut tools, Some(assigned)).await;
        info!(agent = %route, added, total = tools.len(), "Tool servers assigned to specialist");
        team.insert(Specialist::new(route, tools)?);
    }

    Ok(team)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_core::Error;
    use analyst_utils::MarketProvider;

    fn sample_config() -> AnalystConfig {
        let mut config = AnalystConfig::default();
        config.market.provider = MarketProvider::Sample;
        config
    }

    #[tokio::test]
    async fn test_builtin_team() {
        let toolkit = assemble(&sample_config()).await.unwrap();
        assert!(toolkit.mcp.is_none());

        let chart = toolkit.team.get(Route::ChartSpecialist).unwrap();
        assert_eq!(chart.tools().names(), vec!["create_chart", "create_comparison"]);
        assert!(chart.system_prompt().contains("`create_comparison`"));
    }

    #[tokio::test]
    async fn test_missing_tool_server_config() {
        let mut config = sample_config();
        config.mcp_config = Some("/nonexistent/mcp.json".into());

        let err = assemble(&config).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_empty_tool_server_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp.json");
        std::fs::write(&path, r#"{"mcpServers": {}}"#).unwrap();

        let mut config = sample_config();
        config.mcp_config = Some(path);

        let toolkit = assemble(&config).await.unwrap();
        assert!(toolkit.mcp.is_some());
        assert_eq!(toolkit.team.iter().count(), 4);
        toolkit.shutdown().await;
    }

    #[test]
    fn test_build_provider() {
        assert!(build_provider(&LlmConfig::default()).is_ok());
    }
}
