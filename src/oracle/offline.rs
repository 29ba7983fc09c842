// src/oracle/offline.rs — Canned oracle for dry runs without network access

use async_trait::async_trait;

use super::{Completion, CompletionRequest, Oracle, TokenUsage};
use crate::core::tokens::estimate_tokens;
use crate::infra::errors::BamotError;
use crate::util::truncate_str;

/// Usage charged for every canned reply, capped by the request's output ceiling.
const OFFLINE_COMPLETION_TOKENS: u32 = 30;

/// Echoes the head of the prompt and a fixed answer line, charging estimated usage.
pub struct OfflineOracle {
    answer: String,
}

impl OfflineOracle {
    pub fn new() -> Self {
        Self {
            answer: "42".into(),
        }
    }

    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}

impl Default for OfflineOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Oracle for OfflineOracle {
    fn id(&self) -> &str {
        "offline"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, BamotError> {
        let text = format!(
            "(offline) {} ... ANSWER: {}",
            truncate_str(&request.user, 80),
            self.answer
        );
        let usage = TokenUsage {
            prompt_tokens: estimate_tokens(&request.system) + estimate_tokens(&request.user),
            completion_tokens: OFFLINE_COMPLETION_TOKENS.min(request.max_tokens),
        };
        Ok(Completion {
            text,
            usage: Some(usage),
            latency: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_reply() {
        let oracle = OfflineOracle::with_answer("24");
        let out = oracle
            .complete(CompletionRequest {
                system: "sys".into(),
                user: "Use 4 6 1 1 to make 24".into(),
                temperature: 0.2,
                max_tokens: 80,
            })
            .await
            .unwrap();
        assert!(out.text.starts_with("(offline) Use 4 6 1 1"));
        assert!(out.text.ends_with("ANSWER: 24"));
        let usage = out.usage.unwrap();
        assert_eq!(usage.completion_tokens, 30);
        assert!(usage.prompt_tokens > 0);
    }

    #[tokio::test]
    async fn test_offline_respects_output_ceiling() {
        let oracle = OfflineOracle::new();
        let out = oracle
            .complete(CompletionRequest {
                max_tokens: 5,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(out.usage.unwrap().completion_tokens, 5);
    }
}
