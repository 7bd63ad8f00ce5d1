//! Application state wiring all services together.
//!
//! The pipeline is generic over repositories and templates; AppState pins
//! it to the configured store backend and the built-in flex templates.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use parley_core::agent::engine::AgentEngine;
use parley_core::agent::prompt::PromptBuilder;
use parley_core::agent::summarizer::Summarizer;
use parley_core::llm::box_provider::BoxLlmProvider;
use parley_core::reply::{ReplyPipeline, TemplateDispatcher};
use parley_core::session::SessionService;
use parley_core::tool::remote::discover_remote_tools;
use parley_core::tool::{BoxTool, ToolSet};
use parley_core::vault::TokenVault;
use parley_infra::config::{LLM_API_KEY_VAR, WEATHER_API_KEY_VAR, env_secret, load_config};
use parley_infra::llm::GatewayProvider;
use parley_infra::store::{SessionStore, UserStore, open_stores};
use parley_infra::templates::FlexTemplates;
use parley_infra::tools::{McpHttpSource, WeatherTool};
use parley_types::config::{AppConfig, RemoteServerConfig};

pub type ConcretePipeline = ReplyPipeline<SessionStore, UserStore, FlexTemplates>;

pub struct AppState {
    pub config: AppConfig,
    pub vault: Arc<TokenVault>,
    pub pipeline: ConcretePipeline,
}

impl AppState {
    /// Load config, open storage and assemble the reply pipeline.
    pub async fn init(config_path: &Path) -> anyhow::Result<Self> {
        let config = load_config(config_path).await;

        let (sessions, users) = open_stores(&config.storage)
            .await
            .context("failed to open session storage")?;

        let gateway = GatewayProvider::new(&config.llm.base_url, env_secret(LLM_API_KEY_VAR))
            .context("failed to create model gateway client")?;
        let provider = BoxLlmProvider::new(gateway);

        let mut tools = ToolSet::new();
        match env_secret(WEATHER_API_KEY_VAR) {
            Some(key) => {
                let weather = WeatherTool::new(&config.weather, key)
                    .context("failed to create weather client")?;
                tools.insert(BoxTool::new(weather));
            }
            None => tracing::warn!("{WEATHER_API_KEY_VAR} not set, weather tool disabled"),
        }

        for server in &config.tools.remote_servers {
            for tool in register_remote_server(server)
                .await
                .with_context(|| format!("failed to register tool server '{}'", server.name))?
            {
                if tools.get(tool.name()).is_some() {
                    tracing::warn!(
                        tool = tool.name(),
                        server = %server.name,
                        "tool name already registered, replacing"
                    );
                }
                tools.insert(tool);
            }
        }

        let content = AgentEngine::new(provider.clone(), &config.llm.model)
            .with_tools(tools)
            .with_max_rounds(config.llm.max_rounds)
            .with_tool_execution(config.llm.tool_execution);
        let format = AgentEngine::new(provider.clone(), &config.llm.format.model);

        let prompts = PromptBuilder::new()
            .with_content_template(config.llm.prompt.clone())
            .with_format_template(config.llm.format.prompt.clone())
            .with_history_window(config.llm.history_window);

        let summarizer = Summarizer::new(provider, &config.llm.summary.model);
        let session_service = SessionService::new(Arc::new(sessions), Arc::new(users), summarizer);

        let vault = Arc::new(TokenVault::new(
            Duration::from_secs(config.vault.ttl_secs),
            Duration::from_secs(config.vault.sweep_interval_secs),
        ));
        let dispatcher = TemplateDispatcher::new(
            Arc::new(FlexTemplates::builtin(&config.login)),
            vault.clone(),
            config.base_url.clone(),
        );

        let pipeline = ReplyPipeline::new(content, format, prompts, session_service, dispatcher);

        tracing::info!(
            backend = ?config.storage.backend,
            token_ttl = ?vault.ttl(),
            model = %config.llm.model,
            gateway = %config.llm.base_url,
            "parley ready"
        );

        Ok(Self {
            config,
            vault,
            pipeline,
        })
    }
}

/// Connect to one MCP server and list every tool it offers.
async fn register_remote_server(server: &RemoteServerConfig) -> anyhow::Result<Vec<BoxTool>> {
    let source = McpHttpSource::new(server).context("failed to create MCP client")?;
    source.initialize().await?;

    let tools = discover_remote_tools(Arc::new(source)).await?;
    tracing::info!(server = %server.name, count = tools.len(), "remote tools registered");
    Ok(tools)
}
