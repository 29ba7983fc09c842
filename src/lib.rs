// src/lib.rs — Library root for bamot

pub mod cli;
pub mod core;
pub mod evaluator;
pub mod infra;
pub mod oracle;
pub mod util;
