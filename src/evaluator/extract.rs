// src/evaluator/extract.rs — Pull candidate answers out of raw oracle text

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Verdict;

/// Upper bound on expressions considered per text, so a wall of digits cannot blow up scoring.
pub const MAX_EXPRESSIONS_PER_TEXT: usize = 8;

static NUMERIC_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ANSWER\s*:\s*([-+]?\d+(?:\.\d+)?)").expect("static pattern")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").expect("static pattern"));

static WORD_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ANSWER\s*:\s*\W*([A-Za-z]+)").expect("static pattern"));

// `<expr> = 24 ANSWER: ...` — the math block right before the answer tag.
static EXPR_BEFORE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9()+\-*/ \t]*[0-9][0-9()+\-*/ \t]*)(?:=\s*[-+]?\d+(?:\.\d+)?)?\s*ANSWER\s*:")
        .expect("static pattern")
});

static EXPR_AFTER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ANSWER\s*:\s*([0-9()+\-*/ \t]+)").expect("static pattern")
});

static EXPRESSION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Expression\s*:\s*([0-9()+\-*/ \t]+)").expect("static pattern")
});

static MATH_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9()+\-*/ \t]{3,}").expect("static pattern"));

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("static pattern"));

static WORD_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\b").expect("static pattern"));

const YES_WORDS: &[&str] = &["yes", "true", "y", "affirmative"];
const NO_WORDS: &[&str] = &["no", "false", "n", "negative"];

// ─── Numeric ────────────────────────────────────────────────────

/// Prefer an explicit `ANSWER: <number>` tag, otherwise take the last number in the text.
pub fn extract_numeric(text: &str) -> Option<f64> {
    if let Some(m) = NUMERIC_TAG.captures(text).and_then(|c| c.get(1)) {
        if let Ok(v) = m.as_str().parse::<f64>() {
            return Some(v);
        }
    }
    NUMBER
        .find_iter(text)
        .last()
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// True if the text carries an `ANSWER:` tag followed by a number.
pub fn has_numeric_tag(text: &str) -> bool {
    NUMERIC_TAG.is_match(text)
}

// ─── Boolean ────────────────────────────────────────────────────

/// Normalize a single token: strip everything but letters, then look it up in the synonym sets.
pub fn normalize_bool(token: &str) -> Option<Verdict> {
    let word: String = token
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    if YES_WORDS.contains(&word.as_str()) {
        Some(Verdict::Yes)
    } else if NO_WORDS.contains(&word.as_str()) {
        Some(Verdict::No)
    } else {
        None
    }
}

/// Extract a yes/no verdict. A tagged answer wins; otherwise the whole text is
/// scanned and the result is indeterminate (`None`) when both or neither appear.
pub fn extract_boolean(text: &str) -> Option<Verdict> {
    if let Some(m) = WORD_TAG.captures_iter(text).last().and_then(|c| c.get(1)) {
        if let Some(v) = normalize_bool(m.as_str()) {
            return Some(v);
        }
    }

    let mut saw_yes = false;
    let mut saw_no = false;
    for word in text.split(|c: char| !c.is_alphabetic()) {
        if word.is_empty() {
            continue;
        }
        match normalize_bool(word) {
            Some(Verdict::Yes) => saw_yes = true,
            Some(Verdict::No) => saw_no = true,
            None => {}
        }
    }
    match (saw_yes, saw_no) {
        (true, false) => Some(Verdict::Yes),
        (false, true) => Some(Verdict::No),
        _ => None,
    }
}

// ─── Arithmetic ─────────────────────────────────────────────────

/// Candidate expressions in priority order: tagged, `Expression:` labelled, then
/// any run of arithmetic characters (latest first). Deduplicated and capped.
pub fn expression_candidates(text: &str) -> Vec<String> {
    fn push(raw: &str, out: &mut Vec<String>) {
        let expr = raw.trim();
        if expr.is_empty() || !expr.bytes().any(|b| b.is_ascii_digit()) {
            return;
        }
        let key = compact(expr);
        if out.iter().any(|e| compact(e) == key) {
            return;
        }
        if out.len() < MAX_EXPRESSIONS_PER_TEXT {
            out.push(expr.to_string());
        }
    }

    let mut out: Vec<String> = Vec::new();

    for c in EXPR_BEFORE_TAG.captures_iter(text) {
        if let Some(m) = c.get(1) {
            push(m.as_str(), &mut out);
        }
    }
    for c in EXPR_AFTER_TAG.captures_iter(text) {
        if let Some(m) = c.get(1) {
            push(m.as_str(), &mut out);
        }
    }
    for c in EXPRESSION_LABEL.captures_iter(text) {
        if let Some(m) = c.get(1) {
            push(m.as_str(), &mut out);
        }
    }
    let runs: Vec<&str> = MATH_RUN.find_iter(text).map(|m| m.as_str()).collect();
    for run in runs.into_iter().rev() {
        if out.len() >= MAX_EXPRESSIONS_PER_TEXT {
            break;
        }
        push(run, &mut out);
    }
    out
}

/// Every integer literal in an expression, in order of appearance. `None` when
/// a literal does not fit in a `u64`; no input number can match it.
pub fn numbers_in(expr: &str) -> Option<Vec<u64>> {
    INTEGER
        .find_iter(expr)
        .map(|m| m.as_str().parse().ok())
        .collect()
}

/// Infer the input numbers of a target puzzle from its question text: take all
/// integers, drop a trailing occurrence of the target, keep the last `count`.
pub fn numbers_from_question(question: &str, target: f64, count: usize) -> Vec<u64> {
    let mut nums: Vec<u64> = WORD_INTEGER
        .find_iter(question)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if nums.last().is_some_and(|&n| n as f64 == target) {
        nums.pop();
    }
    let skip = nums.len().saturating_sub(count);
    nums.split_off(skip)
}

/// Whitespace-free form of an expression, used as a dedup key.
pub fn compact(expr: &str) -> String {
    expr.chars().filter(|c| !c.is_whitespace()).collect()
}
