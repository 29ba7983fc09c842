// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::evaluator::scoring::ScoringConfig;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub consensus: ConsensusConfig,
}

/// Which completion service to talk to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// "openai" (any OpenAI-compatible endpoint) or "offline" (canned dry run).
    pub provider: String,
    pub model: String,
    /// Override for local servers, e.g. "http://localhost:8080/v1".
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub budget_tokens: u32,
    pub seeds: usize,
    pub seed_budget_fraction: f64,
    pub refine_top_k: usize,
    pub seed_tokens: u32,
    pub refine_tokens: u32,
    pub safety_margin: u32,
    pub shrink_to_fit: bool,
    pub seed_concurrency: usize,
    pub max_refine_rounds: usize,
    pub seed_temperature: SeedTemperature,
    pub refine_temperatures: Vec<f32>,
    pub system_prompt: String,
    pub arithmetic_target: f64,
    pub arithmetic_input_count: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            budget_tokens: 1400,
            seeds: 6,
            seed_budget_fraction: 0.30,
            refine_top_k: 2,
            seed_tokens: 80,
            refine_tokens: 320,
            safety_margin: 16,
            shrink_to_fit: true,
            seed_concurrency: 1,
            max_refine_rounds: 64,
            seed_temperature: SeedTemperature::default(),
            refine_temperatures: vec![0.2, 0.4, 0.6, 0.8],
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            arithmetic_target: 24.0,
            arithmetic_input_count: 4,
        }
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a careful problem solver. Reason step by step, \
keep your work short, and always finish with a line of the form `ANSWER: <answer>`.";

/// Seed i is sampled at `min(max, base + step * i)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTemperature {
    pub base: f32,
    pub step: f32,
    pub max: f32,
}

impl Default for SeedTemperature {
    fn default() -> Self {
        Self {
            base: 0.2,
            step: 0.2,
            max: 1.0,
        }
    }
}

impl SeedTemperature {
    pub fn for_seed(&self, index: usize) -> f32 {
        (self.base + self.step * index as f32).min(self.max)
    }
}

/// How many top-scored pool entries take part in the final vote, per mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub numeric_window: usize,
    pub boolean_window: usize,
    pub arithmetic_window: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            numeric_window: 3,
            boolean_window: 5,
            arithmetic_window: 5,
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the controller cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let c = &self.controller;
        if !(0.0..=1.0).contains(&c.seed_budget_fraction) {
            anyhow::bail!(
                "controller.seed_budget_fraction must be within [0, 1], got {}",
                c.seed_budget_fraction
            );
        }
        if c.refine_temperatures.is_empty() {
            anyhow::bail!("controller.refine_temperatures must not be empty");
        }
        if c.arithmetic_input_count == 0 {
            anyhow::bail!("controller.arithmetic_input_count must be at least 1");
        }
        Ok(())
    }
}
