// src/cli/run.rs — Default command: answer one question

use super::progress::terminal_progress;
use super::Cli;
use crate::core::controller::Controller;
use crate::core::types::{Item, RunOptions, TargetSpec, TaskMode};
use crate::evaluator::grading;
use crate::infra::config::Config;
use crate::oracle;

/// Apply CLI overrides on top of the loaded config.
pub fn apply_overrides(cli: &Cli, config: &mut Config) {
    if cli.offline {
        config.oracle.provider = "offline".into();
    }
    if let Some(ref model) = cli.model {
        config.oracle.model = model.clone();
    }
    if let Some(target) = cli.target {
        config.controller.arithmetic_target = target;
    }
}

/// Per-run options: config defaults, then CLI flags.
pub fn run_options(cli: &Cli, config: &Config) -> RunOptions {
    let mut opts = RunOptions::from(&config.controller);
    if let Some(b) = cli.budget {
        opts.budget_total = b;
    }
    if let Some(n) = cli.seeds {
        opts.seeds = n;
    }
    if let Some(f) = cli.seed_fraction {
        opts.seed_budget_fraction = f.clamp(0.0, 1.0);
    }
    if let Some(k) = cli.top_k {
        opts.refine_top_k = k;
    }
    if let Some(t) = cli.seed_tokens {
        opts.seed_token_cap = t;
    }
    if let Some(t) = cli.refine_tokens {
        opts.refine_token_cap = t;
    }
    opts.enable_peek_early_stop = cli.peek;
    opts.peek_target = cli
        .peek_target
        .clone()
        .or_else(|| cli.peek.then(|| cli.gold.clone()).flatten());
    opts.enable_no_triage = cli.no_triage;
    opts.enable_no_consensus = cli.no_consensus;
    opts
}

/// Build the item, including an explicit target when `--numbers` or `--target` is given.
pub fn build_item(cli: &Cli, config: &Config) -> anyhow::Result<Item> {
    let question = cli.question.join(" ");
    if question.trim().is_empty() {
        anyhow::bail!("question must not be empty");
    }
    let mut item = Item::new(question);
    if let Some(ref gold) = cli.gold {
        item = item.with_answer(gold.clone());
    }
    if !cli.numbers.is_empty() {
        item = item.with_target(TargetSpec::new(
            config.controller.arithmetic_target,
            cli.numbers.clone(),
        ));
    } else if let Some(target) = cli.target {
        // Non-puzzle questions have no numbers to read; they ignore the target.
        if let Ok(spec) =
            TargetSpec::for_target(&item.question, target, config.controller.arithmetic_input_count)
        {
            item = item.with_target(spec);
        }
    }
    Ok(item)
}

/// Run the controller on the CLI question and print the result as JSON.
pub async fn run_question(cli: &Cli, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(cli, &mut config);
    let item = build_item(cli, &config)?;
    let mode = cli.mode.unwrap_or_else(|| TaskMode::infer(&item.question));
    let opts = run_options(cli, &config);

    let oracle = oracle::from_config(&config.oracle)?;
    tracing::info!(oracle = oracle.id(), mode = %mode, "resolved oracle");

    let mut controller = Controller::new(oracle, config.clone());
    if !cli.quiet {
        controller = controller.with_progress(terminal_progress());
    }

    let result = controller.run_tagged(&item, mode, &opts).await;

    let mut output = serde_json::to_value(&result)?;
    if let Some(ref gold) = item.answer {
        let spec = match (&item.target, mode) {
            (Some(t), _) => Some(t.clone()),
            (None, TaskMode::ArithmeticTarget) => TargetSpec::infer(
                &item.question,
                config.controller.arithmetic_target,
                config.controller.arithmetic_input_count,
            )
            .ok(),
            _ => None,
        };
        let correct = result
            .prediction_text()
            .is_some_and(|p| grading::grade(mode, &p, gold, spec.as_ref()));
        output["correct"] = serde_json::Value::Bool(correct);
    }
    output["mode"] = serde_json::Value::String(mode.to_string());

    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(err) = result.error {
        anyhow::bail!(err);
    }
    Ok(())
}
