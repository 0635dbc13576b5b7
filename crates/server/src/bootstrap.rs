use std::sync::Arc;

use apex_agent::{AgentRuntime, LlmError};
use apex_core::config::AppConfig;
use apex_core::workflows::NodeRegistry;
use thiserror::Error;
use tracing::info;

/// Shared handler state. Everything behind it is immutable after startup
/// except the runtime's conversation store.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<AgentRuntime>,
    pub nodes: Arc<NodeRegistry>,
}

impl AppState {
    pub fn new(runtime: AgentRuntime, nodes: NodeRegistry) -> Self {
        Self { runtime: Arc::new(runtime), nodes: Arc::new(nodes) }
    }
}

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("model client initialization failed: {0}")]
    ModelClient(#[source] LlmError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let runtime = AgentRuntime::from_config(&config).map_err(BootstrapError::ModelClient)?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        routing_mode = runtime.router().mode(),
        model = %config.llm.model,
        history_window = config.agents.history_window,
        max_conversations = config.agents.max_conversations,
        "agent runtime initialized"
    );

    let nodes = NodeRegistry::standard(config.llm.model.clone());
    info!(
        event_name = "system.bootstrap.complete",
        correlation_id = "bootstrap",
        node_types = nodes.len(),
        "application bootstrap complete"
    );

    Ok(Application { state: AppState::new(runtime, nodes), config })
}

#[cfg(test)]
mod tests {
    use apex_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use super::bootstrap_with_config;

    #[tokio::test]
    async fn bootstrap_without_credential_uses_keyword_routing() {
        let options = LoadOptions {
            config_path: Some("/nonexistent/apex.toml".into()),
            overrides: ConfigOverrides { llm_api_key: Some(String::new()), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        };

        let config = AppConfig::load(options).expect("config");
        let app = bootstrap_with_config(config).await.expect("bootstrap");

        assert_eq!(app.state.runtime.router().mode(), "keyword");
        assert!(!app.state.runtime.model_configured());
        assert_eq!(app.state.nodes.len(), 8);
    }

    #[tokio::test]
    async fn bootstrap_with_credential_routes_through_the_model() {
        let options = LoadOptions {
            config_path: Some("/nonexistent/apex.toml".into()),
            overrides: ConfigOverrides {
                llm_api_key: Some("test-key".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        };
        let config = AppConfig::load(options).expect("config");

        let app = bootstrap_with_config(config).await.expect("bootstrap");

        assert_eq!(app.state.runtime.router().mode(), "model");
        assert!(app.state.runtime.model_configured());
    }
}
