// src/evaluator/mod.rs — Extraction, scoring and grading of oracle answers

pub mod arith;
pub mod extract;
pub mod grading;
pub mod scoring;
