// src/core/prompts.rs — Seed and refinement prompt builders

use super::types::TargetSpec;

pub fn numeric_seed(question: &str) -> String {
    format!(
        "{question}\n\n\
         Give a brief plan and a tentative numeric result. \
         End with: ANSWER: <number>"
    )
}

pub fn boolean_seed(question: &str) -> String {
    format!(
        "{question}\n\n\
         Think briefly, then commit to a single verdict. \
         End with: ANSWER: yes or ANSWER: no"
    )
}

pub fn arithmetic_seed(question: &str, spec: &TargetSpec) -> String {
    format!(
        "{question}\n\n\
         Use each of the numbers {nums} exactly once, with + - * / and parentheses, \
         to reach {target}. Give the expression only, no prose after it. \
         End with: ANSWER: <expression>",
        nums = spec.numbers_display(),
        target = spec.target,
    )
}

/// Refinement prompt shared by every mode; `tail` names the expected answer form.
pub fn refine(question: &str, attempt: &str, feedback: &str, tail: &str) -> String {
    format!(
        "Refine and verify the current attempt.\n\n\
         Question:\n{question}\n\n\
         Current attempt:\n{attempt}\n\n\
         Feedback: {feedback}\n\n\
         If a correction is needed, fix it. End with: {tail}"
    )
}

pub const NUMERIC_TAIL: &str = "ANSWER: <number>";
pub const BOOLEAN_TAIL: &str = "ANSWER: yes or ANSWER: no";
pub const ARITHMETIC_TAIL: &str = "ANSWER: <expression>";
