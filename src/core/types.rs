// src/core/types.rs — Core domain types

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::evaluator::extract::numbers_from_question;
use crate::infra::config::{ControllerConfig, SeedTemperature};
use crate::infra::errors::BamotError;
use crate::oracle::TokenUsage;

// ─── Task mode ──────────────────────────────────────────────────

/// The shape of answer a question expects. Fixed for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    Numeric,
    Boolean,
    ArithmeticTarget,
}

static TARGET_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:make|reach|obtain|get|equals?)\s+(?:exactly\s+)?(-?\d+)\b")
        .expect("static pattern")
});

static GAME_OF_24: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:game\s+of\s+24|24\s+game)\b").expect("static pattern")
});

impl TaskMode {
    /// Guess the mode from the question wording.
    pub fn infer(question: &str) -> Self {
        let lower = question.to_lowercase();
        let mentions_ops = ["+", "*", "/", "arithmetic", "operations"]
            .iter()
            .any(|op| lower.contains(op));
        if GAME_OF_24.is_match(question) || (TARGET_PHRASE.is_match(question) && mentions_ops) {
            TaskMode::ArithmeticTarget
        } else if lower.contains("yes or no") || lower.contains("yes/no") {
            TaskMode::Boolean
        } else {
            TaskMode::Numeric
        }
    }
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskMode::Numeric => write!(f, "numeric"),
            TaskMode::Boolean => write!(f, "boolean"),
            TaskMode::ArithmeticTarget => write!(f, "arithmetic"),
        }
    }
}

impl FromStr for TaskMode {
    type Err = BamotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" | "number" => Ok(TaskMode::Numeric),
            "boolean" | "bool" | "yesno" => Ok(TaskMode::Boolean),
            "arithmetic" | "arithmetic_target" | "game24" => Ok(TaskMode::ArithmeticTarget),
            other => Err(BamotError::Config(format!("Unknown task mode '{}'", other))),
        }
    }
}

// ─── Answers ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Yes,
    No,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Yes => write!(f, "yes"),
            Verdict::No => write!(f, "no"),
        }
    }
}

/// A value extracted from oracle text; its variant follows the task mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Number(f64),
    Verdict(Verdict),
    Expression(String),
}

impl Answer {
    /// Canonical key used for dedup and voting.
    pub fn key(&self) -> String {
        match self {
            // -0 and 0 share a key
            Answer::Number(v) if *v == 0.0 => "0".into(),
            Answer::Number(v) => v.to_string(),
            Answer::Verdict(v) => v.to_string(),
            Answer::Expression(e) => crate::evaluator::extract::compact(e),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Answer::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_expression(&self) -> Option<&str> {
        match self {
            Answer::Expression(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Number(v) => write!(f, "{}", v),
            Answer::Verdict(v) => write!(f, "{}", v),
            Answer::Expression(e) => write!(f, "{}", e.trim()),
        }
    }
}

// ─── Candidates ─────────────────────────────────────────────────

/// One oracle attempt. Never mutated after creation; refinement produces new ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    text: String,
    answer: Option<Answer>,
    score: f64,
}

impl Candidate {
    pub fn new(text: impl Into<String>, answer: Option<Answer>, score: f64) -> Self {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        };
        Self {
            text: text.into(),
            answer,
            score,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn answer(&self) -> Option<&Answer> {
        self.answer.as_ref()
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Value key when an answer was extracted, otherwise the trimmed raw text.
    pub fn dedup_key(&self) -> String {
        match &self.answer {
            Some(a) => format!("value:{}", a.key()),
            None => format!("text:{}", self.text.trim()),
        }
    }
}

// ─── Items & targets ────────────────────────────────────────────

/// Target value plus the exact multiset of numbers an expression must use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub target: f64,
    pub numbers: Vec<u64>,
}

impl TargetSpec {
    pub fn new(target: f64, numbers: Vec<u64>) -> Self {
        Self { target, numbers }
    }

    /// Read the target ("make 24") and input numbers out of the question.
    pub fn infer(question: &str, default_target: f64, count: usize) -> Result<Self, BamotError> {
        let target = TARGET_PHRASE
            .captures_iter(question)
            .last()
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(default_target);
        Self::numbers_for(question, question, target, count)
    }

    /// Explicit target that overrides any "make N" phrase; numbers named by
    /// such a phrase are not taken as inputs.
    pub fn for_target(question: &str, target: f64, count: usize) -> Result<Self, BamotError> {
        let stripped = TARGET_PHRASE.replace_all(question, "");
        Self::numbers_for(question, &stripped, target, count)
    }

    fn numbers_for(
        question: &str,
        scan: &str,
        target: f64,
        count: usize,
    ) -> Result<Self, BamotError> {
        let numbers = numbers_from_question(scan, target, count);
        if numbers.is_empty() {
            return Err(BamotError::InvalidItem(format!(
                "no input numbers found in question: {}",
                crate::util::truncate_str(question, 80)
            )));
        }
        Ok(Self { target, numbers })
    }

    pub fn numbers_display(&self) -> String {
        self.numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A single question handed to the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub question: String,
    /// Gold answer, if known. Only consulted when peek early-stop is enabled.
    pub answer: Option<String>,
    /// Explicit target for arithmetic mode; inferred from the question when absent.
    pub target: Option<TargetSpec>,
}

impl Item {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            question: question.into(),
            answer: None,
            target: None,
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self
    }

    pub fn with_target(mut self, target: TargetSpec) -> Self {
        self.target = Some(target);
        self
    }
}

// ─── Run options ────────────────────────────────────────────────

/// Per-run knobs for the controller.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub budget_total: u32,
    pub seeds: usize,
    pub seed_budget_fraction: f64,
    pub refine_top_k: usize,
    pub seed_token_cap: u32,
    pub refine_token_cap: u32,
    /// Research ablation: lets the controller consult the answer mid-search.
    pub enable_peek_early_stop: bool,
    pub peek_target: Option<String>,
    pub enable_no_triage: bool,
    pub enable_no_consensus: bool,
    pub safety_margin: u32,
    pub shrink_to_fit: bool,
    pub seed_concurrency: usize,
    pub max_refine_rounds: usize,
    pub seed_temperature: SeedTemperature,
    pub refine_temperatures: Vec<f32>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from(&ControllerConfig::default())
    }
}

impl From<&ControllerConfig> for RunOptions {
    fn from(cfg: &ControllerConfig) -> Self {
        Self {
            budget_total: cfg.budget_tokens,
            seeds: cfg.seeds,
            seed_budget_fraction: cfg.seed_budget_fraction,
            refine_top_k: cfg.refine_top_k,
            seed_token_cap: cfg.seed_tokens,
            refine_token_cap: cfg.refine_tokens,
            enable_peek_early_stop: false,
            peek_target: None,
            enable_no_triage: false,
            enable_no_consensus: false,
            safety_margin: cfg.safety_margin,
            shrink_to_fit: cfg.shrink_to_fit,
            seed_concurrency: cfg.seed_concurrency,
            max_refine_rounds: cfg.max_refine_rounds,
            seed_temperature: cfg.seed_temperature.clone(),
            refine_temperatures: cfg.refine_temperatures.clone(),
        }
    }
}

// ─── Run lifecycle ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Seeding,
    Refining,
    Consensus,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Seeding => write!(f, "seeding"),
            Phase::Refining => write!(f, "refining"),
            Phase::Consensus => write!(f, "consensus"),
            Phase::Done => write!(f, "done"),
        }
    }
}

/// Why the run stopped searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A seed matched the peek target.
    EarlyStopSeeding,
    /// The top candidate matched the peek target (or is fully valid) after a refinement.
    EarlyStopRefining,
    /// Spend reached the total budget, or the next step would overrun it.
    BudgetExhausted,
    /// The remaining budget could not cover the next prompt plus the safety margin.
    InsufficientBudget,
    /// The refinement round guard was hit.
    RoundLimit,
    /// An oracle call failed.
    OracleError,
}

/// Final output of one item-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub prediction: Option<Answer>,
    /// Winning candidates' text, for inspection.
    pub text: String,
    pub usage: TokenUsage,
    /// Mean latency of oracle calls that reported one, in seconds.
    pub latency_secs: Option<f64>,
    pub oracle_calls: u32,
    pub stop: StopReason,
    /// Last phase entered before `Done`.
    pub phase: Phase,
    pub pool_size: usize,
    /// Set when the run failed; the prediction is then absent.
    pub error: Option<String>,
}

impl RunResult {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn prediction_text(&self) -> Option<String> {
        self.prediction.as_ref().map(|a| a.to_string())
    }
}

/// Real-time progress notifications emitted by the controller.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    SeedsReady {
        candidates: usize,
        spent: u32,
    },
    Refined {
        round: usize,
        top_score: f64,
        spent: u32,
    },
    EarlyStop {
        phase: Phase,
        calls: u32,
    },
    Complete {
        calls: u32,
        spent: u32,
        prediction: Option<String>,
    },
}
