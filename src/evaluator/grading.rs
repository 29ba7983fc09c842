// src/evaluator/grading.rs — Final correctness checks against gold answers
//
// These are the judges of record. The controller's own scores are a search
// heuristic and never stand in for these.

use super::arith;
use super::extract::{self, expression_candidates, numbers_in};
use super::scoring::multiset_diff;
use crate::core::types::{TargetSpec, TaskMode, Verdict};

const REL_TOL: f64 = 1e-9;
const ABS_TOL: f64 = 1e-9;

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= (REL_TOL * a.abs().max(b.abs())).max(ABS_TOL)
}

fn to_number(s: &str) -> Option<f64> {
    s.trim()
        .parse::<f64>()
        .ok()
        .or_else(|| extract::extract_numeric(s))
}

/// Numeric comparison with a tight tolerance, robust to `ANSWER: 42` style text.
/// Falls back to case-insensitive string equality when either side is not numeric.
pub fn is_correct(pred: &str, gold: &str) -> bool {
    match (to_number(pred), to_number(gold)) {
        (Some(p), Some(g)) => is_close(p, g),
        _ => pred.trim().eq_ignore_ascii_case(gold.trim()),
    }
}

/// Yes/no normalization for grading; also accepts `1` / `0`.
pub fn normalize_verdict(s: &str) -> Option<Verdict> {
    let trimmed = s.trim().trim_matches(|c: char| ".!,;:".contains(c)).trim();
    match trimmed {
        "1" => return Some(Verdict::Yes),
        "0" => return Some(Verdict::No),
        _ => {}
    }
    extract::normalize_bool(trimmed).or_else(|| extract::extract_boolean(s))
}

/// True only when both sides normalize to the same verdict.
pub fn bool_match(pred: &str, gold: &str) -> bool {
    match (normalize_verdict(pred), normalize_verdict(gold)) {
        (Some(p), Some(g)) => p == g,
        _ => false,
    }
}

/// Re-verify a predicted expression: it must use exactly the input multiset and
/// hit the target value. The text may be a bare expression or a full response.
pub fn is_arithmetic_correct(pred_text: &str, spec: &TargetSpec) -> bool {
    let expr = expression_candidates(pred_text)
        .into_iter()
        .next()
        .unwrap_or_else(|| pred_text.trim().to_string());

    if !spec.numbers.is_empty() {
        let Some(used) = numbers_in(&expr) else {
            return false;
        };
        let (missing, extra) = multiset_diff(&used, &spec.numbers);
        if !missing.is_empty() || !extra.is_empty() {
            return false;
        }
    }

    arith::evaluate(&expr).is_some_and(|v| is_close(v, spec.target))
}

/// Grade a prediction for the given mode. Arithmetic predictions are checked
/// against `spec` rather than `gold`, since many expressions are correct.
pub fn grade(mode: TaskMode, pred: &str, gold: &str, spec: Option<&TargetSpec>) -> bool {
    match mode {
        TaskMode::Numeric => is_correct(pred, gold),
        TaskMode::Boolean => bool_match(pred, gold),
        TaskMode::ArithmeticTarget => spec.is_some_and(|s| is_arithmetic_correct(pred, s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_correct_numeric() {
        assert!(is_correct("42", "42.0"));
        assert!(is_correct("ANSWER: 42", "42"));
        assert!(!is_correct("41", "42"));
    }

    #[test]
    fn test_is_correct_string_fallback() {
        assert!(is_correct(" Paris ", "paris"));
        assert!(!is_correct("London", "paris"));
    }

    #[test]
    fn test_bool_match() {
        assert!(bool_match("YES", "yes"));
        assert!(bool_match("yes.", "True"));
        assert!(bool_match(" Yes ", "1"));
        assert!(bool_match("no", "false"));
        assert!(!bool_match("yes", "no"));
    }

    #[test]
    fn test_indeterminate_never_matches() {
        assert!(!bool_match("perhaps", "yes"));
        assert!(!bool_match("perhaps", "no"));
        assert!(!bool_match("yes and no", "yes"));
    }

    #[test]
    fn test_arithmetic_valid() {
        let spec = TargetSpec::new(24.0, vec![1, 1, 4, 6]);
        assert!(is_arithmetic_correct("(6*4)*(1/1)", &spec));
        assert!(is_arithmetic_correct("Work...\nANSWER: (6*4)*(1/1)", &spec));
    }

    #[test]
    fn test_arithmetic_multiset_mismatch() {
        let spec = TargetSpec::new(24.0, vec![4, 4, 4, 4]);
        assert!(!is_arithmetic_correct("4*4+4+4+4+4+4", &spec));
        assert!(is_arithmetic_correct("4*4+4+4", &spec));
    }

    #[test]
    fn test_arithmetic_oversized_literal_rejected() {
        let spec = TargetSpec::new(24.0, vec![1, 1, 4, 6]);
        assert!(!is_arithmetic_correct(
            "(99999999999999999999-99999999999999999999)+(6*4)*(1/1)",
            &spec
        ));
    }

    #[test]
    fn test_grade_dispatch() {
        let spec = TargetSpec::new(24.0, vec![1, 1, 4, 6]);
        assert!(grade(TaskMode::Numeric, "7", "7.0", None));
        assert!(grade(TaskMode::Boolean, "Yes", "true", None));
        assert!(grade(TaskMode::ArithmeticTarget, "(6*4)*(1/1)", "24", Some(&spec)));
        assert!(!grade(TaskMode::ArithmeticTarget, "(6*4)*(1/1)", "24", None));
    }

    #[test]
    fn test_arithmetic_unsafe_rejected() {
        let spec = TargetSpec::new(24.0, vec![2, 3]);
        assert!(!is_arithmetic_correct("2**3*3", &spec));
    }
}
