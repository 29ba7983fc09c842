// src/oracle/openai.rs — OpenAI-compatible Chat Completions oracle
//
// Also serves local OpenAI-compatible servers (llama.cpp server, Ollama /v1,
// vLLM) through `with_base_url`.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{Completion, CompletionRequest, Oracle, TokenUsage};
use crate::infra::errors::BamotError;

pub struct OpenAIOracle {
    api_key: String,
    model: String,
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAIOracle {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com/v1".into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_body(&self, request: &CompletionRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
        })
    }

    fn unavailable(&self, message: String) -> BamotError {
        BamotError::OracleUnavailable {
            oracle: "openai".into(),
            message,
        }
    }
}

/// Pull the generated text and (if fully reported) the usage out of a response body.
fn parse_response(resp: &serde_json::Value) -> (String, Option<TokenUsage>) {
    let text = resp["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    let usage = match (
        resp["usage"]["prompt_tokens"].as_u64(),
        resp["usage"]["completion_tokens"].as_u64(),
    ) {
        (Some(p), Some(c)) => Some(TokenUsage {
            prompt_tokens: u32::try_from(p).unwrap_or(u32::MAX),
            completion_tokens: u32::try_from(c).unwrap_or(u32::MAX),
        }),
        _ => None,
    };

    (text, usage)
}

#[async_trait]
impl Oracle for OpenAIOracle {
    fn id(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, BamotError> {
        let body = self.build_body(&request);
        let start = Instant::now();

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(self.timeout)
            .json(&body);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let error_body = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!(
                "authentication failed (HTTP {}): {}",
                status, error_body
            )));
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BamotError::Oracle {
                oracle: "openai".into(),
                message: format!("HTTP {}: {}", status, error_body),
            });
        }

        let resp: serde_json::Value = response.json().await.map_err(|e| BamotError::Oracle {
            oracle: "openai".into(),
            message: format!("Failed to parse response: {}", e),
        })?;
        let latency = start.elapsed();

        let (text, usage) = parse_response(&resp);
        tracing::trace!(
            latency_ms = latency.as_millis() as u64,
            reported_usage = usage.is_some(),
            "openai completion"
        );

        Ok(Completion {
            text,
            usage,
            latency: Some(latency),
        })
    }
}
