// src/core/consensus.rs — Final answer selection over the top of the pool

use std::collections::HashMap;

use super::pool::Pool;
use super::types::{Answer, TargetSpec, Verdict};
use crate::evaluator::scoring::{check_expression, ArithmeticWeights};

/// Most frequent value; ties go to the lower median of the tied values.
pub fn numeric_vote(values: &[f64]) -> Option<f64> {
    let mut counts: HashMap<String, (f64, usize)> = HashMap::new();
    for v in values {
        let key = Answer::Number(*v).key();
        counts.entry(key).or_insert((*v, 0)).1 += 1;
    }
    let max = counts.values().map(|(_, n)| *n).max()?;
    let mut tied: Vec<f64> = counts
        .into_values()
        .filter(|(_, n)| *n == max)
        .map(|(v, _)| v)
        .collect();
    tied.sort_by(f64::total_cmp);
    Some(tied[(tied.len() - 1) / 2])
}

/// Majority verdict. `voters` must be in descending score order; a tie goes
/// to the first voter.
pub fn boolean_vote(voters: &[Verdict]) -> Option<Verdict> {
    let first = *voters.first()?;
    let yes = voters.iter().filter(|v| **v == Verdict::Yes).count();
    let no = voters.len() - yes;
    Some(match yes.cmp(&no) {
        std::cmp::Ordering::Greater => Verdict::Yes,
        std::cmp::Ordering::Less => Verdict::No,
        std::cmp::Ordering::Equal => first,
    })
}

/// Pick an expression: first fully valid in the window, else the closest to
/// target among multiset matches, else the top-scored expression in the pool.
pub fn arithmetic_pick(
    pool: &Pool,
    window: usize,
    spec: &TargetSpec,
    weights: &ArithmeticWeights,
) -> Option<String> {
    let checks: Vec<_> = pool
        .top(window)
        .iter()
        .filter_map(|c| c.answer()?.as_expression())
        .map(|e| check_expression(e, spec, weights))
        .collect();

    if let Some(valid) = checks.iter().find(|c| c.valid) {
        return Some(valid.expr.clone());
    }

    let closest = checks
        .iter()
        .filter(|c| c.multiset_ok)
        .filter_map(|c| c.distance(spec.target).map(|d| (d.abs(), c)))
        .min_by(|a, b| a.0.total_cmp(&b.0));
    if let Some((_, c)) = closest {
        return Some(c.expr.clone());
    }

    pool.iter()
        .find_map(|c| c.answer()?.as_expression())
        .map(|e| e.trim().to_string())
}
