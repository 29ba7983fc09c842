// src/core/mod.rs — Refinement controller and its building blocks

pub mod consensus;
pub mod controller;
pub mod pool;
pub mod prompts;
pub mod strategy;
pub mod token_budget;
pub mod tokens;
pub mod types;
