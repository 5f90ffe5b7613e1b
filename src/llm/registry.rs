//! Provider configuration and construction

use super::{GeminiService, LlmService, LoggingService, UnconfiguredService};
use std::sync::Arc;

/// Model used when `TUTOR_MODEL` is not set
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the LLM provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    /// LLM gateway URL (e.g., `http://169.254.169.254/gateway/llm`)
    pub gateway: Option<String>,
    /// Model name; falls back to [`DEFAULT_MODEL`]
    pub model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gateway: non_empty_var("LLM_GATEWAY"),
            model: non_empty_var("TUTOR_MODEL"),
        }
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Whether any credential source is configured
    pub fn has_credentials(&self) -> bool {
        self.gateway.is_some() || self.gemini_api_key.is_some()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build the LLM service described by `config`, wrapped with request logging.
///
/// Without credentials an [`UnconfiguredService`] is returned so the server can
/// still start; every gateway call then fails with an auth error.
pub fn build_service(config: &LlmConfig) -> Arc<dyn LlmService> {
    // In gateway mode, use "implicit" as the API key
    let api_key = if config.gateway.is_some() {
        "implicit".to_string()
    } else if let Some(key) = &config.gemini_api_key {
        key.clone()
    } else {
        return Arc::new(UnconfiguredService);
    };

    match GeminiService::new(api_key, config.model(), config.gateway.as_deref()) {
        Ok(service) => Arc::new(LoggingService::new(Arc::new(service))),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create Gemini client");
            Arc::new(UnconfiguredService)
        }
    }
}
