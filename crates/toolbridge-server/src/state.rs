//! Server state.

use std::sync::Arc;
use toolbridge_core::{Config, LoopConfig, Orchestrator};
use toolbridge_provider::BoxedLanguageModel;
use toolbridge_tools::ToolRegistry;

/// Shared, immutable state for all requests.
#[derive(Clone)]
pub struct AppState {
    /// Configuration loaded at startup.
    pub config: Arc<Config>,
    /// The loop every chat request runs.
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Create state with the built-in tools.
    pub fn new(config: Config, provider: BoxedLanguageModel) -> Self {
        Self::with_registry(config, provider, ToolRegistry::with_builtins())
    }

    /// Create state with a custom tool registry.
    pub fn with_registry(
        config: Config,
        provider: BoxedLanguageModel,
        registry: ToolRegistry,
    ) -> Self {
        let loop_config = LoopConfig::from(&config);
        let orchestrator = Orchestrator::new(provider, Arc::new(registry), loop_config);
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Model name reported by the health route.
    pub fn model(&self) -> &str {
        self.orchestrator.provider().model_id()
    }

    /// Provider name reported by the health route.
    pub fn provider(&self) -> &str {
        self.orchestrator.provider().provider_id()
    }
}
