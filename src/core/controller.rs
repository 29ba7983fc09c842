// src/core/controller.rs — Seed, refine and vote under a hard token budget

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::pool::Pool;
use super::strategy::TaskStrategy;
use super::token_budget::TokenBudget;
use super::types::*;
use crate::infra::config::Config;
use crate::infra::errors::BamotError;
use crate::oracle::{Completion, CompletionRequest, Oracle, TokenUsage};
use crate::util::preview;

const TRACE_HEADER: &str = "==== TOP CANDIDATES ====";
const TRACE_SEPARATOR: &str = "\n\n----\n\n";

/// Drives one item through seeding, refinement and consensus.
///
/// A controller holds no per-item state; `Budget` and `Pool` live in the run.
/// Running several items in parallel means one `run` future per item.
pub struct Controller {
    oracle: Arc<dyn Oracle>,
    config: Config,
    /// Optional callback for real-time progress events.
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send + Sync>>,
}

/// Mutable state for a single item-run.
struct RunState {
    budget: TokenBudget,
    pool: Pool,
    calls: u32,
    latencies: Vec<Duration>,
    phase: Phase,
}

impl RunState {
    fn new(opts: &RunOptions) -> Self {
        Self {
            budget: TokenBudget::new(
                opts.budget_total,
                opts.seed_budget_fraction,
                opts.safety_margin,
            ),
            pool: Pool::new(),
            calls: 0,
            latencies: Vec::new(),
            phase: Phase::Seeding,
        }
    }

    fn record(&mut self, completion: &Completion, usage: &TokenUsage) {
        self.budget.deduct(usage);
        self.calls += 1;
        if let Some(latency) = completion.latency {
            self.latencies.push(latency);
        }
    }

    fn mean_latency(&self) -> Option<f64> {
        if self.latencies.is_empty() {
            return None;
        }
        let total: f64 = self.latencies.iter().map(Duration::as_secs_f64).sum();
        Some(total / self.latencies.len() as f64)
    }

    fn finish(&self, prediction: Option<Answer>, stop: StopReason, text: String) -> RunResult {
        RunResult {
            prediction,
            text,
            usage: self.budget.usage(),
            latency_secs: self.mean_latency(),
            oracle_calls: self.calls,
            stop,
            phase: self.phase,
            pool_size: self.pool.len(),
            error: None,
        }
    }

    fn failed(&self, err: &BamotError) -> RunResult {
        let mut result = self.finish(None, StopReason::OracleError, String::new());
        result.error = Some(err.to_string());
        result
    }
}

impl Controller {
    pub fn new(oracle: Arc<dyn Oracle>, config: Config) -> Self {
        Self {
            oracle,
            config,
            on_progress: None,
        }
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Run one item. Oracle failures are returned as errors; see `run_tagged`
    /// for the variant that folds them into the result.
    pub async fn run(
        &self,
        item: &Item,
        mode: TaskMode,
        opts: &RunOptions,
    ) -> Result<RunResult, BamotError> {
        let mut state = RunState::new(opts);
        self.drive(item, mode, opts, &mut state).await
    }

    /// Run one item and never fail: errors come back as a result with
    /// `error` set, no prediction, and the usage spent before the failure.
    pub async fn run_tagged(&self, item: &Item, mode: TaskMode, opts: &RunOptions) -> RunResult {
        let mut state = RunState::new(opts);
        match self.drive(item, mode, opts, &mut state).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(item = %item.id, phase = %state.phase, "run failed: {}", e);
                state.failed(&e)
            }
        }
    }

    async fn drive(
        &self,
        item: &Item,
        mode: TaskMode,
        opts: &RunOptions,
        state: &mut RunState,
    ) -> Result<RunResult, BamotError> {
        let strategy = TaskStrategy::for_item(mode, item, &self.config)?;
        let peek = opts.peek_target.as_deref();

        tracing::info!(
            item = %item.id,
            mode = %mode,
            budget = opts.budget_total,
            seeds = opts.seeds,
            "starting run"
        );

        // ── Seeding ──
        state.phase = Phase::Seeding;
        if let Some(hit) = self.seed(item, &strategy, opts, state).await? {
            tracing::info!(item = %item.id, calls = state.calls, "early stop during seeding");
            self.emit(ProgressEvent::EarlyStop {
                phase: Phase::Seeding,
                calls: state.calls,
            });
            return Ok(self.complete(
                state,
                hit.answer().cloned(),
                StopReason::EarlyStopSeeding,
                hit.text().to_string(),
            ));
        }
        state.pool.dedup();
        state.pool.sort_by_score();
        self.emit(ProgressEvent::SeedsReady {
            candidates: state.pool.len(),
            spent: state.budget.spent(),
        });
        tracing::debug!(
            candidates = state.pool.len(),
            spent = state.budget.spent(),
            "seeding done"
        );

        // ── Refining ──
        state.phase = Phase::Refining;
        let width = opts.refine_top_k.max(1);
        let temps: &[f32] = if opts.refine_temperatures.is_empty() {
            &[0.2]
        } else {
            &opts.refine_temperatures
        };
        let mut rr = 0usize;
        let mut rounds = 0usize;

        let stop = loop {
            if !state.budget.within_total() {
                break StopReason::BudgetExhausted;
            }
            if rounds >= opts.max_refine_rounds {
                tracing::warn!(rounds, "refinement round limit reached");
                break StopReason::RoundLimit;
            }

            state.pool.sort_by_score();
            let eligible = width.min(state.pool.len()).max(1);
            let Some(base) = state.pool.get(rr % eligible).cloned() else {
                break StopReason::BudgetExhausted;
            };

            let mut request = CompletionRequest {
                system: self.config.controller.system_prompt.clone(),
                user: strategy.refine_prompt(&item.question, &base),
                temperature: temps[rr % temps.len()],
                max_tokens: 0,
            };
            rr += 1;

            let estimated = request.estimated_prompt_tokens();
            let Some(max_tokens) = state.budget.output_allowance(
                estimated,
                opts.refine_token_cap,
                opts.shrink_to_fit,
            ) else {
                tracing::warn!(
                    remaining = state.budget.remaining(),
                    estimated_prompt = estimated,
                    "not enough budget for another refinement"
                );
                break StopReason::InsufficientBudget;
            };
            request.max_tokens = max_tokens;

            let (candidate, usage) = self.call(&strategy, request, opts, state).await?;
            rounds += 1;
            state.pool.push(candidate);
            state.pool.dedup();
            state.pool.sort_by_score();

            let top_score = state.pool.best().map(|c| c.score()).unwrap_or(0.0);
            self.emit(ProgressEvent::Refined {
                round: rounds,
                top_score,
                spent: state.budget.spent(),
            });

            if opts.enable_peek_early_stop {
                if let Some(top) = state.pool.best().filter(|c| strategy.is_hit(c, peek)) {
                    let (answer, text) = (top.answer().cloned(), top.text().to_string());
                    tracing::info!(item = %item.id, rounds, "early stop during refinement");
                    self.emit(ProgressEvent::EarlyStop {
                        phase: Phase::Refining,
                        calls: state.calls,
                    });
                    return Ok(self.complete(state, answer, StopReason::EarlyStopRefining, text));
                }
            }

            if state.budget.would_overrun(usage.total()) {
                break StopReason::BudgetExhausted;
            }
        };

        // ── Consensus ──
        state.phase = Phase::Consensus;
        state.pool.sort_by_score();
        let window = strategy.window(&self.config.consensus);
        let prediction = strategy.consensus(&state.pool, window, opts.enable_no_consensus);
        let trace = trace_text(&state.pool, window);

        Ok(self.complete(state, prediction, stop, trace))
    }

    /// Seeding phase. Returns the candidate that triggered a peek early stop, if any.
    async fn seed(
        &self,
        item: &Item,
        strategy: &TaskStrategy,
        opts: &RunOptions,
        state: &mut RunState,
    ) -> Result<Option<Candidate>, BamotError> {
        let user = strategy.seed_prompt(&item.question);
        let wave = opts.seed_concurrency.max(1);
        let mut issued = 0usize;

        'waves: while issued < opts.seeds {
            if state.budget.seeding_exhausted() && !state.pool.is_empty() {
                break;
            }

            // Reserve each request's worst case so a wave cannot outrun the budget.
            let mut projected = state.budget.clone();
            let mut requests = Vec::with_capacity(wave);
            for i in issued..(issued + wave).min(opts.seeds) {
                let mut request = CompletionRequest {
                    system: self.config.controller.system_prompt.clone(),
                    user: user.clone(),
                    temperature: opts.seed_temperature.for_seed(i),
                    max_tokens: 0,
                };
                let estimated = request.estimated_prompt_tokens();
                let Some(max_tokens) =
                    projected.output_allowance(estimated, opts.seed_token_cap, opts.shrink_to_fit)
                else {
                    break;
                };
                request.max_tokens = max_tokens;
                projected.deduct(&TokenUsage {
                    prompt_tokens: estimated,
                    completion_tokens: max_tokens,
                });
                requests.push(request);
            }

            if requests.is_empty() {
                tracing::warn!(
                    remaining = state.budget.remaining(),
                    "not enough budget for another seed"
                );
                break 'waves;
            }
            issued += requests.len();

            if let Some(hit) = self.seed_wave(strategy, requests, opts, state).await? {
                return Ok(Some(hit));
            }
        }

        if state.pool.is_empty() {
            tracing::warn!("no seed produced, forcing one seed call");
            let request = CompletionRequest {
                system: self.config.controller.system_prompt.clone(),
                user,
                temperature: opts.seed_temperature.for_seed(0),
                max_tokens: opts.seed_token_cap.max(1),
            };
            return self.seed_wave(strategy, vec![request], opts, state).await;
        }

        Ok(None)
    }

    /// Issue a wave of seed calls concurrently and merge them in issue order.
    /// Every successful call is accounted for before the first failure is returned.
    async fn seed_wave(
        &self,
        strategy: &TaskStrategy,
        requests: Vec<CompletionRequest>,
        opts: &RunOptions,
        state: &mut RunState,
    ) -> Result<Option<Candidate>, BamotError> {
        let outcomes = join_all(requests.iter().map(|r| self.oracle.complete(r.clone()))).await;

        let mut first_err = None;
        let mut hit = None;
        for (request, outcome) in requests.iter().zip(outcomes) {
            let completion = match outcome {
                Ok(c) => c,
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                    continue;
                }
            };
            let candidate = self.absorb(strategy, request, completion, opts, state);
            if hit.is_none()
                && opts.enable_peek_early_stop
                && strategy.is_hit(&candidate, opts.peek_target.as_deref())
            {
                hit = Some(candidate.clone());
            }
            state.pool.push(candidate);
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(hit),
        }
    }

    /// One sequential oracle call; returns the new candidate and the usage charged.
    async fn call(
        &self,
        strategy: &TaskStrategy,
        request: CompletionRequest,
        opts: &RunOptions,
        state: &mut RunState,
    ) -> Result<(Candidate, TokenUsage), BamotError> {
        let completion = self.oracle.complete(request.clone()).await?;
        let usage = completion.usage_or_estimate(&request);
        let candidate = self.absorb(strategy, &request, completion, opts, state);
        Ok((candidate, usage))
    }

    /// Charge a completion to the budget and turn it into a candidate.
    fn absorb(
        &self,
        strategy: &TaskStrategy,
        request: &CompletionRequest,
        completion: Completion,
        opts: &RunOptions,
        state: &mut RunState,
    ) -> Candidate {
        let usage = completion.usage_or_estimate(request);
        state.record(&completion, &usage);
        tracing::debug!(
            oracle = self.oracle.id(),
            phase = %state.phase,
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            spent = state.budget.spent(),
            reply = %preview(&completion.text, 60),
            "oracle call"
        );
        strategy.assess(completion.text, opts.enable_no_triage)
    }

    fn complete(
        &self,
        state: &mut RunState,
        prediction: Option<Answer>,
        stop: StopReason,
        text: String,
    ) -> RunResult {
        let result = state.finish(prediction, stop, text);
        state.phase = Phase::Done;
        tracing::info!(
            calls = result.oracle_calls,
            spent = result.usage.total(),
            stop = ?stop,
            prediction = ?result.prediction_text(),
            "run complete"
        );
        self.emit(ProgressEvent::Complete {
            calls: result.oracle_calls,
            spent: result.usage.total(),
            prediction: result.prediction_text(),
        });
        result
    }
}

fn trace_text(pool: &Pool, window: usize) -> String {
    let bodies: Vec<&str> = pool.top(window).iter().map(|c| c.text()).collect();
    format!("{}\n\n{}", TRACE_HEADER, bodies.join(TRACE_SEPARATOR))
}
