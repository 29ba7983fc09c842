// src/evaluator/scoring.rs — Triage scores for candidate texts
//
// Scores only order the search; they never decide correctness on their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::arith;
use super::extract::{self, expression_candidates, numbers_in};
use crate::core::types::TargetSpec;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub numeric: NumericWeights,
    pub boolean: BooleanWeights,
    pub arithmetic: ArithmeticWeights,
}

/// `tag * has_tag + digit * has_digit + concision * concision_bonus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericWeights {
    pub tag_weight: f64,
    pub digit_weight: f64,
    pub concision_weight: f64,
    /// Texts up to this many characters get the full concision bonus.
    pub concision_threshold: usize,
}

impl Default for NumericWeights {
    fn default() -> Self {
        Self {
            tag_weight: 0.5,
            digit_weight: 0.25,
            concision_weight: 0.25,
            concision_threshold: 400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanWeights {
    pub decisive: f64,
    pub indeterminate: f64,
}

impl Default for BooleanWeights {
    fn default() -> Self {
        Self {
            decisive: 1.0,
            indeterminate: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArithmeticWeights {
    pub distance_weight: f64,
    pub multiset_weight: f64,
    /// Score for an expression that was found but could not be evaluated.
    pub unevaluable_floor: f64,
    /// Score for text with no expression at all.
    pub no_expression: f64,
    /// Maximum |value - target| still counted as hitting the target.
    pub tolerance: f64,
}

impl Default for ArithmeticWeights {
    fn default() -> Self {
        Self {
            distance_weight: 0.6,
            multiset_weight: 0.3,
            unevaluable_floor: 0.05,
            no_expression: 0.0,
            tolerance: 1e-6,
        }
    }
}

// ─── Numeric ────────────────────────────────────────────────────

pub fn score_numeric(text: &str, w: &NumericWeights) -> f64 {
    let has_tag = if extract::has_numeric_tag(text) { 1.0 } else { 0.0 };
    let has_digit = if text.bytes().any(|b| b.is_ascii_digit()) {
        1.0
    } else {
        0.0
    };
    let len = text.chars().count();
    let concision = if len <= w.concision_threshold {
        1.0
    } else {
        w.concision_threshold as f64 / len as f64
    };
    w.tag_weight * has_tag + w.digit_weight * has_digit + w.concision_weight * concision
}

// ─── Boolean ────────────────────────────────────────────────────

pub fn score_boolean(text: &str, w: &BooleanWeights) -> f64 {
    if extract::extract_boolean(text).is_some() {
        w.decisive
    } else {
        w.indeterminate
    }
}

// ─── Arithmetic ─────────────────────────────────────────────────

/// Everything known about one candidate expression against a target.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionCheck {
    pub expr: String,
    pub value: Option<f64>,
    pub multiset_ok: bool,
    pub missing: Vec<u64>,
    pub extra: Vec<u64>,
    /// A literal too large to read, so the multiset cannot match.
    pub oversized: bool,
    pub valid: bool,
    pub score: f64,
}

impl ExpressionCheck {
    /// Signed distance from the target, when the expression evaluates.
    pub fn distance(&self, target: f64) -> Option<f64> {
        self.value.map(|v| v - target)
    }
}

/// Numbers the expression should have used but did not, and numbers it used in excess.
pub fn multiset_diff(used: &[u64], want: &[u64]) -> (Vec<u64>, Vec<u64>) {
    let mut counts: BTreeMap<u64, i64> = BTreeMap::new();
    for n in want {
        *counts.entry(*n).or_default() += 1;
    }
    for n in used {
        *counts.entry(*n).or_default() -= 1;
    }
    let mut missing = Vec::new();
    let mut extra = Vec::new();
    for (n, c) in counts {
        if c > 0 {
            missing.extend(std::iter::repeat(n).take(c as usize));
        } else if c < 0 {
            extra.extend(std::iter::repeat(n).take((-c) as usize));
        }
    }
    (missing, extra)
}

pub fn check_expression(expr: &str, spec: &TargetSpec, w: &ArithmeticWeights) -> ExpressionCheck {
    let (missing, extra, oversized) = match numbers_in(expr) {
        Some(used) => {
            let (missing, extra) = multiset_diff(&used, &spec.numbers);
            (missing, extra, false)
        }
        None => (Vec::new(), Vec::new(), true),
    };
    let multiset_ok = !oversized && missing.is_empty() && extra.is_empty();
    let value = arith::evaluate(expr);

    let hits_target = value.is_some_and(|v| (v - spec.target).abs() <= w.tolerance);
    let valid = hits_target && multiset_ok;

    let score = if valid {
        1.0
    } else {
        match value {
            Some(v) => {
                let closeness = 1.0 / (1.0 + (v - spec.target).abs());
                let ms = if multiset_ok { 1.0 } else { 0.0 };
                (w.distance_weight * closeness + w.multiset_weight * ms).max(w.unevaluable_floor)
            }
            None => w.unevaluable_floor,
        }
    };

    ExpressionCheck {
        expr: expr.trim().to_string(),
        value,
        multiset_ok,
        missing,
        extra,
        oversized,
        valid,
        score,
    }
}

/// Best-scoring expression in the text; ties keep the higher-priority match.
pub fn best_expression(
    text: &str,
    spec: &TargetSpec,
    w: &ArithmeticWeights,
) -> Option<ExpressionCheck> {
    let mut best: Option<ExpressionCheck> = None;
    for expr in expression_candidates(text) {
        let check = check_expression(&expr, spec, w);
        if best.as_ref().is_none_or(|b| check.score > b.score) {
            best = Some(check);
        }
    }
    best
}

pub fn score_arithmetic(text: &str, spec: &TargetSpec, w: &ArithmeticWeights) -> f64 {
    best_expression(text, spec, w)
        .map(|c| c.score)
        .unwrap_or(w.no_expression)
}
