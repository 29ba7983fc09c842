// tests/controller_test.rs — Integration test: controller with a scripted mock oracle

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use bamot::core::controller::Controller;
use bamot::core::tokens::estimate_tokens;
use bamot::core::types::*;
use bamot::evaluator::grading;
use bamot::infra::config::Config;
use bamot::infra::errors::BamotError;
use bamot::oracle::offline::OfflineOracle;
use bamot::oracle::{Completion, CompletionRequest, Oracle, TokenUsage};

/// Replays scripted replies, then repeats a fallback. Records every request.
struct MockOracle {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    /// Report `estimated prompt + max_tokens` as usage; otherwise report nothing.
    report_usage: bool,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockOracle {
    fn new(fallback: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            report_usage: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn then(self, reply: &str) -> Self {
        self.script.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    fn then_fail(self, message: &str) -> Self {
        self.script.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    fn without_usage(mut self) -> Self {
        self.report_usage = false;
        self
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn seed_requests(&self) -> Vec<CompletionRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !r.user.starts_with("Refine and verify"))
            .collect()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    fn id(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, BamotError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()));
        let text = next.map_err(|message| BamotError::OracleUnavailable {
            oracle: "mock".into(),
            message,
        })?;
        let usage = self.report_usage.then(|| TokenUsage {
            prompt_tokens: request.estimated_prompt_tokens(),
            completion_tokens: request.max_tokens,
        });
        Ok(Completion {
            text,
            usage,
            latency: Some(Duration::from_millis(10)),
        })
    }
}

fn controller(mock: &Arc<MockOracle>) -> Controller {
    Controller::new(mock.clone(), Config::default())
}

const NUMERIC_Q: &str = "Tom has 20 apples and buys 4 more. How many apples does he have?";

#[tokio::test]
async fn test_peek_early_stop_single_call() {
    let mock = Arc::new(MockOracle::new("20 + 4 = 24\nANSWER: 24"));
    let opts = RunOptions {
        enable_peek_early_stop: true,
        peek_target: Some("24".into()),
        ..Default::default()
    };

    let result = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
        .await
        .unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(result.oracle_calls, 1);
    assert_eq!(result.stop, StopReason::EarlyStopSeeding);
    assert_eq!(result.prediction, Some(Answer::Number(24.0)));
    assert_eq!(
        result.usage,
        TokenUsage {
            prompt_tokens: requests[0].estimated_prompt_tokens(),
            completion_tokens: 80,
        }
    );
}

#[tokio::test]
async fn test_peek_disabled_ignores_target() {
    let mock = Arc::new(MockOracle::new("ANSWER: 24"));
    let opts = RunOptions {
        enable_peek_early_stop: false,
        peek_target: Some("24".into()),
        ..Default::default()
    };

    let result = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
        .await
        .unwrap();

    assert!(result.oracle_calls > 1);
    assert_ne!(result.stop, StopReason::EarlyStopSeeding);
    assert_eq!(result.prediction, Some(Answer::Number(24.0)));
}

#[tokio::test]
async fn test_early_stop_during_refinement() {
    let mock = Arc::new(MockOracle::new("ANSWER: 7").then("I think it is 5"));
    let opts = RunOptions {
        seed_budget_fraction: 0.0,
        enable_peek_early_stop: true,
        peek_target: Some("7".into()),
        ..Default::default()
    };

    let result = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
        .await
        .unwrap();

    assert_eq!(result.oracle_calls, 2);
    assert_eq!(result.stop, StopReason::EarlyStopRefining);
    assert_eq!(result.prediction, Some(Answer::Number(7.0)));
}

#[tokio::test]
async fn test_seeding_floor_tiny_sub_budget() {
    let mock = Arc::new(MockOracle::new("ANSWER: 24"));
    let opts = RunOptions {
        seed_budget_fraction: 0.0,
        ..Default::default()
    };

    let result = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
        .await
        .unwrap();

    assert_eq!(mock.seed_requests().len(), 1);
    assert!(result.oracle_calls > 1, "refinement should still run");
}

#[tokio::test]
async fn test_zero_seeds_forces_one_call() {
    let mock = Arc::new(MockOracle::new("ANSWER: 24"));
    let opts = RunOptions {
        seeds: 0,
        max_refine_rounds: 0,
        ..Default::default()
    };

    let result = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
        .await
        .unwrap();

    let seeds = mock.seed_requests();
    assert_eq!(seeds.len(), 1);
    assert_eq!(seeds[0].max_tokens, 80);
    assert_eq!(result.stop, StopReason::RoundLimit);
    assert_eq!(result.prediction, Some(Answer::Number(24.0)));
}

#[tokio::test]
async fn test_budget_never_overrun_with_shrink() {
    for budget in [400, 800, 1400, 2000] {
        let mock = Arc::new(MockOracle::new("Adding them up.\nANSWER: 24"));
        let opts = RunOptions {
            budget_total: budget,
            ..Default::default()
        };

        let result = controller(&mock)
            .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
            .await
            .unwrap();

        assert!(
            result.usage.total() <= budget,
            "budget {} overrun: spent {}",
            budget,
            result.usage.total()
        );
        assert!(result.oracle_calls >= 1);
    }
}

#[tokio::test]
async fn test_overshoot_bounded_by_one_call_without_shrink() {
    for budget in [400, 800, 1400] {
        let mock = Arc::new(MockOracle::new("Adding them up.\nANSWER: 24"));
        let opts = RunOptions {
            budget_total: budget,
            shrink_to_fit: false,
            ..Default::default()
        };

        let result = controller(&mock)
            .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
            .await
            .unwrap();

        assert!(result.usage.total() <= budget + opts.refine_token_cap);
    }
}

#[tokio::test]
async fn test_insufficient_budget_aborts_without_spending() {
    let mock = Arc::new(MockOracle::new("ANSWER: 24"));
    let opts = RunOptions {
        budget_total: 200,
        seeds: 1,
        ..Default::default()
    };

    let result = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
        .await
        .unwrap();

    let spent_by_calls: u32 = mock
        .requests()
        .iter()
        .map(|r| r.estimated_prompt_tokens() + r.max_tokens)
        .sum();
    assert_eq!(result.usage.total(), spent_by_calls);
    assert!(result.usage.total() <= 200);
    assert!(matches!(
        result.stop,
        StopReason::InsufficientBudget | StopReason::BudgetExhausted
    ));
}

#[tokio::test]
async fn test_consensus_and_no_consensus() {
    let script = || {
        MockOracle::new("ANSWER: 7")
            .then("ANSWER: 9")
            .then("ANSWER: 7")
            .then("ANSWER: 7")
    };
    let base = RunOptions {
        seeds: 3,
        seed_budget_fraction: 1.0,
        max_refine_rounds: 0,
        ..Default::default()
    };

    // After dedup the pool holds [9, 7]; the vote ties and takes the lower median.
    let mock = Arc::new(script());
    let voted = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &base)
        .await
        .unwrap();
    assert_eq!(voted.pool_size, 2);
    assert_eq!(voted.prediction, Some(Answer::Number(7.0)));

    let mock = Arc::new(script());
    let opts = RunOptions {
        enable_no_consensus: true,
        ..base
    };
    let top = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
        .await
        .unwrap();
    assert_eq!(top.prediction, Some(Answer::Number(9.0)));
}

#[tokio::test]
async fn test_boolean_tie_goes_to_top_voter() {
    let mock = Arc::new(
        MockOracle::new("ANSWER: yes")
            .then("Maybe yes, maybe no.")
            .then("ANSWER: no")
            .then("ANSWER: yes"),
    );
    let opts = RunOptions {
        seeds: 3,
        seed_budget_fraction: 1.0,
        max_refine_rounds: 0,
        ..Default::default()
    };

    let item = Item::new("Answer yes or no: can penguins fly?");
    let result = controller(&mock)
        .run(&item, TaskMode::Boolean, &opts)
        .await
        .unwrap();

    assert_eq!(result.prediction, Some(Answer::Verdict(Verdict::No)));
    assert!(grading::bool_match(&result.prediction_text().unwrap(), "false"));
}

#[tokio::test]
async fn test_oracle_failure_surfaces() {
    let mock = Arc::new(
        MockOracle::new("ANSWER: 5")
            .then("ANSWER: 5")
            .then_fail("connection refused"),
    );
    let err = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &RunOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_oracle_failure());
}

#[tokio::test]
async fn test_run_tagged_keeps_usage_before_failure() {
    let mock = Arc::new(
        MockOracle::new("ANSWER: 5")
            .then("ANSWER: 5")
            .then_fail("connection refused"),
    );
    let result = controller(&mock)
        .run_tagged(&Item::new(NUMERIC_Q), TaskMode::Numeric, &RunOptions::default())
        .await;

    let first = &mock.requests()[0];
    assert!(result.is_error());
    assert!(result.error.as_deref().unwrap().contains("connection refused"));
    assert!(result.prediction.is_none());
    assert_eq!(result.oracle_calls, 1);
    assert_eq!(result.stop, StopReason::OracleError);
    assert_eq!(
        result.usage.total(),
        first.estimated_prompt_tokens() + first.max_tokens
    );
}

#[tokio::test]
async fn test_usage_estimated_when_absent() {
    let reply = "ANSWER: 24";
    let mock = Arc::new(MockOracle::new(reply).without_usage());
    let opts = RunOptions {
        enable_peek_early_stop: true,
        peek_target: Some("24".into()),
        ..Default::default()
    };

    let result = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
        .await
        .unwrap();

    let request = &mock.requests()[0];
    assert_eq!(
        result.usage,
        TokenUsage {
            prompt_tokens: request.estimated_prompt_tokens(),
            completion_tokens: estimate_tokens(reply),
        }
    );
}

#[tokio::test]
async fn test_arithmetic_refines_to_valid_expression() {
    let mock = Arc::new(MockOracle::new("ANSWER: (6*4)*(1/1)").then("ANSWER: 6*4+1+1"));
    let opts = RunOptions {
        seed_budget_fraction: 0.0,
        ..Default::default()
    };
    let item = Item::new("Use 1, 1, 4, 6 with + - * / and parentheses to make 24.");

    let result = controller(&mock)
        .run(&item, TaskMode::ArithmeticTarget, &opts)
        .await
        .unwrap();

    // The refinement prompt carries the distance feedback for the first attempt.
    let refine = &mock.requests()[1];
    assert!(refine.user.contains("It evaluates to 26, which is +2 from the target 24."));

    let spec = TargetSpec::new(24.0, vec![1, 1, 4, 6]);
    let prediction = result.prediction_text().unwrap();
    assert_eq!(prediction, "(6*4)*(1/1)");
    assert!(grading::is_arithmetic_correct(&prediction, &spec));
}

#[tokio::test]
async fn test_arithmetic_valid_expression_stops_with_peek_flag() {
    let mock = Arc::new(MockOracle::new("(6*4)*(1/1) = 24\nANSWER: (6*4)*(1/1)"));
    let opts = RunOptions {
        enable_peek_early_stop: true,
        ..Default::default()
    };
    let item = Item::new("Reach the target").with_target(TargetSpec::new(24.0, vec![1, 1, 4, 6]));

    let result = controller(&mock)
        .run(&item, TaskMode::ArithmeticTarget, &opts)
        .await
        .unwrap();

    assert_eq!(result.oracle_calls, 1);
    assert_eq!(result.stop, StopReason::EarlyStopSeeding);
}

#[tokio::test]
async fn test_arithmetic_without_numbers_is_invalid_item() {
    let mock = Arc::new(MockOracle::new("ANSWER: 1+1"));
    let item = Item::new("Make twenty-four somehow.");
    let err = controller(&mock)
        .run(&item, TaskMode::ArithmeticTarget, &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BamotError::InvalidItem(_)));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_concurrent_seed_wave_keeps_issue_order() {
    let mock = Arc::new(
        MockOracle::new("ANSWER: 1")
            .then("ANSWER: 3")
            .then("ANSWER: 4")
            .then("ANSWER: 5"),
    );
    let opts = RunOptions {
        seeds: 3,
        seed_concurrency: 3,
        seed_budget_fraction: 1.0,
        max_refine_rounds: 0,
        enable_no_consensus: true,
        ..Default::default()
    };

    let result = controller(&mock)
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
        .await
        .unwrap();

    let temps: Vec<f32> = mock.requests().iter().map(|r| r.temperature).collect();
    assert_eq!(temps.len(), 3);
    assert!((temps[0] - 0.2).abs() < 1e-6);
    assert!((temps[2] - 0.6).abs() < 1e-6);
    assert_eq!(result.pool_size, 3);
    assert_eq!(result.prediction, Some(Answer::Number(3.0)));
}

#[tokio::test]
async fn test_progress_events_emitted() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let mock = Arc::new(MockOracle::new("ANSWER: 24"));
    let controller = Controller::new(mock.clone(), Config::default())
        .with_progress(move |e| sink.lock().unwrap().push(e));
    let opts = RunOptions {
        budget_total: 800,
        ..Default::default()
    };

    controller
        .run(&Item::new(NUMERIC_Q), TaskMode::Numeric, &opts)
        .await
        .unwrap();

    let events = events.lock().unwrap();
    assert!(matches!(events.first(), Some(ProgressEvent::SeedsReady { .. })));
    assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));
}

#[tokio::test]
async fn test_offline_oracle_end_to_end() {
    let controller = Controller::new(Arc::new(OfflineOracle::new()), Config::default());
    let result = controller
        .run_tagged(&Item::new(NUMERIC_Q), TaskMode::Numeric, &RunOptions::default())
        .await;

    assert!(!result.is_error());
    assert_eq!(result.prediction, Some(Answer::Number(42.0)));
    assert!(result.usage.total() <= 1400);
    assert!(result.text.starts_with("==== TOP CANDIDATES ===="));
}
