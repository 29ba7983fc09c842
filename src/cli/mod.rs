// src/cli/mod.rs — CLI definition (clap derive)

pub mod progress;
pub mod run;

use clap::Parser;

use crate::core::types::TaskMode;

#[derive(Parser, Debug)]
#[command(
    name = "bamot",
    about = "Budget-aware multi-candidate refinement over a completion oracle",
    version
)]
pub struct Cli {
    /// Question to answer
    #[arg(trailing_var_arg = true, required = true)]
    pub question: Vec<String>,

    /// Task mode: numeric, boolean or arithmetic (inferred from the question if omitted)
    #[arg(long)]
    pub mode: Option<TaskMode>,

    /// Total token budget for the item
    #[arg(short, long)]
    pub budget: Option<u32>,

    /// Maximum number of seed calls
    #[arg(long)]
    pub seeds: Option<usize>,

    /// Share of the budget reserved for seeding (0.0-1.0)
    #[arg(long)]
    pub seed_fraction: Option<f64>,

    /// Number of top candidates refined round-robin
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Output ceiling per seed call
    #[arg(long)]
    pub seed_tokens: Option<u32>,

    /// Output ceiling per refinement call
    #[arg(long)]
    pub refine_tokens: Option<u32>,

    /// Target value for arithmetic mode (defaults to the question's, then 24)
    #[arg(long)]
    pub target: Option<f64>,

    /// Input numbers for arithmetic mode, comma separated
    #[arg(long, value_delimiter = ',')]
    pub numbers: Vec<u64>,

    /// Stop as soon as a candidate matches the peek target (research ablation)
    #[arg(long)]
    pub peek: bool,

    /// Peek target; defaults to --gold when --peek is set
    #[arg(long)]
    pub peek_target: Option<String>,

    /// Score every candidate 1.0 (ablation)
    #[arg(long)]
    pub no_triage: bool,

    /// Take the top candidate instead of voting (ablation)
    #[arg(long)]
    pub no_consensus: bool,

    /// Gold answer; adds a `correct` field to the output
    #[arg(long)]
    pub gold: Option<String>,

    /// Model name for the OpenAI-compatible oracle
    #[arg(short, long)]
    pub model: Option<String>,

    /// Use the canned offline oracle (no network)
    #[arg(long)]
    pub offline: bool,

    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    /// Suppress progress output (only emit the final result)
    #[arg(long)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from(["bamot", "What", "is", "3+4?"]).unwrap();
        assert_eq!(cli.question.join(" "), "What is 3+4?");
        assert!(cli.mode.is_none());
        assert!(!cli.peek);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "bamot",
            "--mode",
            "game24",
            "--budget",
            "900",
            "--numbers",
            "1,1,4,6",
            "--peek",
            "--gold",
            "24",
            "-vv",
            "make",
            "24",
        ])
        .unwrap();
        assert_eq!(cli.mode, Some(TaskMode::ArithmeticTarget));
        assert_eq!(cli.budget, Some(900));
        assert_eq!(cli.numbers, vec![1, 1, 4, 6]);
        assert!(cli.peek);
        assert_eq!(cli.gold.as_deref(), Some("24"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_question_required() {
        assert!(Cli::try_parse_from(["bamot"]).is_err());
    }

    #[test]
    fn test_bad_mode_rejected() {
        assert!(Cli::try_parse_from(["bamot", "--mode", "poetry", "q"]).is_err());
    }
}
