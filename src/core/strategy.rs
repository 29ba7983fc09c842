// src/core/strategy.rs — Per-mode behaviour, selected once per run

use super::consensus;
use super::pool::Pool;
use super::prompts;
use super::types::{Answer, Candidate, Item, TargetSpec, TaskMode};
use crate::evaluator::extract;
use crate::evaluator::grading;
use crate::evaluator::scoring::{self, ArithmeticWeights, BooleanWeights, NumericWeights};
use crate::infra::config::{Config, ConsensusConfig};
use crate::infra::errors::BamotError;

/// Prompts, extraction, scoring, feedback and voting for one task mode.
#[derive(Debug, Clone)]
pub enum TaskStrategy {
    Numeric(NumericWeights),
    Boolean(BooleanWeights),
    Arithmetic {
        spec: TargetSpec,
        weights: ArithmeticWeights,
    },
}

impl TaskStrategy {
    pub fn for_item(mode: TaskMode, item: &Item, config: &Config) -> Result<Self, BamotError> {
        Ok(match mode {
            TaskMode::Numeric => TaskStrategy::Numeric(config.scoring.numeric.clone()),
            TaskMode::Boolean => TaskStrategy::Boolean(config.scoring.boolean.clone()),
            TaskMode::ArithmeticTarget => {
                let spec = match &item.target {
                    Some(t) => t.clone(),
                    None => TargetSpec::infer(
                        &item.question,
                        config.controller.arithmetic_target,
                        config.controller.arithmetic_input_count,
                    )?,
                };
                if spec.numbers.is_empty() {
                    return Err(BamotError::InvalidItem(format!(
                        "item {} has an empty input multiset",
                        item.id
                    )));
                }
                TaskStrategy::Arithmetic {
                    spec,
                    weights: config.scoring.arithmetic.clone(),
                }
            }
        })
    }

    pub fn seed_prompt(&self, question: &str) -> String {
        match self {
            TaskStrategy::Numeric(_) => prompts::numeric_seed(question),
            TaskStrategy::Boolean(_) => prompts::boolean_seed(question),
            TaskStrategy::Arithmetic { spec, .. } => prompts::arithmetic_seed(question, spec),
        }
    }

    pub fn refine_prompt(&self, question: &str, base: &Candidate) -> String {
        let tail = match self {
            TaskStrategy::Numeric(_) => prompts::NUMERIC_TAIL,
            TaskStrategy::Boolean(_) => prompts::BOOLEAN_TAIL,
            TaskStrategy::Arithmetic { .. } => prompts::ARITHMETIC_TAIL,
        };
        prompts::refine(question, base.text(), &self.feedback(base), tail)
    }

    /// What the next refinement should fix about `base`.
    pub fn feedback(&self, base: &Candidate) -> String {
        let TaskStrategy::Arithmetic { spec, weights } = self else {
            return "Verify every step and correct any mistake.".into();
        };
        let nums = spec.numbers_display();

        let Some(expr) = base.answer().and_then(Answer::as_expression) else {
            return format!(
                "No arithmetic expression was found. Write a single expression that uses \
                 each of {} exactly once.",
                nums
            );
        };

        let check = scoring::check_expression(expr, spec, weights);
        if check.valid {
            return format!(
                "The expression reaches {} using every number once. Re-check it and restate it.",
                spec.target
            );
        }
        if !check.multiset_ok {
            let mut msg = format!("The expression must use exactly {}.", nums);
            if check.oversized {
                msg.push_str(" It contains a number far larger than any input.");
            }
            if !check.missing.is_empty() {
                msg.push_str(&format!(" Missing: {}.", join(&check.missing)));
            }
            if !check.extra.is_empty() {
                msg.push_str(&format!(" Not allowed or used too often: {}.", join(&check.extra)));
            }
            return msg;
        }
        match check.distance(spec.target) {
            None => "The expression could not be evaluated. Check the parentheses and use only \
                     + - * /."
                .into(),
            Some(d) => format!(
                "It evaluates to {}, which is {:+} from the target {}.",
                check.value.unwrap_or_default(),
                d,
                spec.target
            ),
        }
    }

    pub fn extract(&self, text: &str) -> Option<Answer> {
        match self {
            TaskStrategy::Numeric(_) => extract::extract_numeric(text).map(Answer::Number),
            TaskStrategy::Boolean(_) => extract::extract_boolean(text).map(Answer::Verdict),
            TaskStrategy::Arithmetic { spec, weights } => {
                scoring::best_expression(text, spec, weights).map(|c| Answer::Expression(c.expr))
            }
        }
    }

    pub fn score(&self, text: &str) -> f64 {
        match self {
            TaskStrategy::Numeric(w) => scoring::score_numeric(text, w),
            TaskStrategy::Boolean(w) => scoring::score_boolean(text, w),
            TaskStrategy::Arithmetic { spec, weights } => {
                scoring::score_arithmetic(text, spec, weights)
            }
        }
    }

    /// Turn raw oracle text into a candidate. `no_triage` flattens every score to 1.0.
    pub fn assess(&self, text: String, no_triage: bool) -> Candidate {
        let (answer, score) = match self {
            TaskStrategy::Arithmetic { spec, weights } => {
                match scoring::best_expression(&text, spec, weights) {
                    Some(c) => (Some(Answer::Expression(c.expr)), c.score),
                    None => (None, weights.no_expression),
                }
            }
            _ => (self.extract(&text), self.score(&text)),
        };
        Candidate::new(text, answer, if no_triage { 1.0 } else { score })
    }

    /// Peek early-stop test: the value matches `peek`, or (arithmetic) the
    /// expression is fully valid.
    pub fn is_hit(&self, candidate: &Candidate, peek: Option<&str>) -> bool {
        let Some(answer) = candidate.answer() else {
            return false;
        };
        match (self, answer) {
            (TaskStrategy::Numeric(_), Answer::Number(v)) => {
                peek.is_some_and(|p| grading::is_correct(&v.to_string(), p))
            }
            (TaskStrategy::Boolean(_), Answer::Verdict(v)) => {
                peek.is_some_and(|p| grading::bool_match(&v.to_string(), p))
            }
            (TaskStrategy::Arithmetic { spec, weights }, Answer::Expression(e)) => {
                let check = scoring::check_expression(e, spec, weights);
                if check.valid {
                    return true;
                }
                let wanted = peek.and_then(|p| p.trim().parse::<f64>().ok());
                match (wanted, check.value) {
                    (Some(t), Some(v)) => check.multiset_ok && (v - t).abs() <= weights.tolerance,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    pub fn window(&self, cfg: &ConsensusConfig) -> usize {
        match self {
            TaskStrategy::Numeric(_) => cfg.numeric_window,
            TaskStrategy::Boolean(_) => cfg.boolean_window,
            TaskStrategy::Arithmetic { .. } => cfg.arithmetic_window,
        }
    }

    /// Final answer from a score-sorted pool.
    pub fn consensus(&self, pool: &Pool, window: usize, no_consensus: bool) -> Option<Answer> {
        if no_consensus {
            return pool.best()?.answer().cloned();
        }
        match self {
            TaskStrategy::Numeric(_) => {
                let values: Vec<f64> = pool
                    .top(window)
                    .iter()
                    .filter_map(|c| c.answer()?.as_number())
                    .collect();
                consensus::numeric_vote(&values)
                    .or_else(|| pool.iter().find_map(|c| c.answer()?.as_number()))
                    .map(Answer::Number)
            }
            TaskStrategy::Boolean(_) => {
                let voters: Vec<_> = pool
                    .top(window)
                    .iter()
                    .filter_map(|c| match c.answer() {
                        Some(Answer::Verdict(v)) => Some(*v),
                        _ => None,
                    })
                    .collect();
                consensus::boolean_vote(&voters).map(Answer::Verdict)
            }
            TaskStrategy::Arithmetic { spec, weights } => {
                consensus::arithmetic_pick(pool, window, spec, weights).map(Answer::Expression)
            }
        }
    }
}

fn join(nums: &[u64]) -> String {
    nums.iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
