// src/oracle/mod.rs — Completion oracle layer

pub mod offline;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::tokens::estimate_tokens;
use crate::infra::config::OracleConfig;
use crate::infra::errors::BamotError;

/// Core trait that every completion backend implements.
///
/// Implementations are stateless per call; timeouts are their responsibility.
#[async_trait]
pub trait Oracle: Send + Sync {
    fn id(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, BamotError>;
}

#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Local estimate of the prompt cost, used for pre-call budget checks.
    pub fn estimated_prompt_tokens(&self) -> u32 {
        estimate_tokens(&self.system) + estimate_tokens(&self.user)
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    /// `None` when the backend did not report usage.
    pub usage: Option<TokenUsage>,
    pub latency: Option<Duration>,
}

impl Completion {
    /// Reported usage, or a local estimate over the submitted and returned text.
    pub fn usage_or_estimate(&self, request: &CompletionRequest) -> TokenUsage {
        self.usage.clone().unwrap_or_else(|| TokenUsage {
            prompt_tokens: request.estimated_prompt_tokens(),
            completion_tokens: estimate_tokens(&self.text),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Build the oracle named in the config.
pub fn from_config(config: &OracleConfig) -> Result<Arc<dyn Oracle>, BamotError> {
    match config.provider.as_str() {
        "offline" => Ok(Arc::new(offline::OfflineOracle::new())),
        "openai" => {
            let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
            if api_key.is_empty() && config.base_url.is_none() {
                return Err(BamotError::Config(format!(
                    "{} is not set. Export it, point oracle.base_url at a local server, \
                     or use the offline oracle.",
                    config.api_key_env
                )));
            }
            let oracle = openai::OpenAIOracle::new(api_key, config.model.clone())
                .with_timeout(Duration::from_secs(config.timeout_seconds));
            let oracle = match &config.base_url {
                Some(url) => oracle.with_base_url(url.clone()),
                None => oracle,
            };
            Ok(Arc::new(oracle))
        }
        other => Err(BamotError::Config(format!("Unknown oracle provider '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total() {
        let u = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
        };
        assert_eq!(u.total(), 150);
        assert_eq!(TokenUsage::default().total(), 0);

        let huge = TokenUsage {
            prompt_tokens: u32::MAX,
            completion_tokens: 10,
        };
        assert_eq!(huge.total(), u32::MAX);
    }

    #[test]
    fn test_usage_falls_back_to_estimate() {
        let request = CompletionRequest {
            system: "abcd".into(),
            user: "abcdefgh".into(),
            temperature: 0.2,
            max_tokens: 10,
        };
        let completion = Completion {
            text: "ANSWER: 4".into(),
            usage: None,
            latency: None,
        };
        let u = completion.usage_or_estimate(&request);
        assert_eq!(u.prompt_tokens, 3);
        assert_eq!(u.completion_tokens, 3);
    }

    #[test]
    fn test_reported_usage_wins() {
        let request = CompletionRequest::default();
        let completion = Completion {
            text: "x".repeat(400),
            usage: Some(TokenUsage {
                prompt_tokens: 7,
                completion_tokens: 9,
            }),
            latency: None,
        };
        assert_eq!(completion.usage_or_estimate(&request).total(), 16);
    }

    #[test]
    fn test_from_config_offline() {
        let config = OracleConfig {
            provider: "offline".into(),
            ..Default::default()
        };
        let oracle = from_config(&config).unwrap();
        assert_eq!(oracle.id(), "offline");
    }

    #[test]
    fn test_from_config_unknown_provider() {
        let config = OracleConfig {
            provider: "carrier-pigeon".into(),
            ..Default::default()
        };
        assert!(matches!(from_config(&config), Err(BamotError::Config(_))));
    }
}
