// src/core/token_budget.rs — Token budget accounting for one item-run

use crate::oracle::TokenUsage;

/// Tracks prompt and completion spending against a total budget, with a
/// seeding sub-budget and a safety margin under which no call is attempted.
#[derive(Debug, Clone)]
pub struct TokenBudget {
    pub total: u32,
    pub prompt_spent: u32,
    pub completion_spent: u32,
    seed_fraction: f64,
    safety_margin: u32,
}

impl TokenBudget {
    pub fn new(total: u32, seed_fraction: f64, safety_margin: u32) -> Self {
        Self {
            total,
            prompt_spent: 0,
            completion_spent: 0,
            seed_fraction: seed_fraction.clamp(0.0, 1.0),
            safety_margin,
        }
    }

    pub fn spent(&self) -> u32 {
        self.prompt_spent.saturating_add(self.completion_spent)
    }

    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.spent())
    }

    pub fn deduct(&mut self, usage: &TokenUsage) {
        self.prompt_spent = self.prompt_spent.saturating_add(usage.prompt_tokens);
        self.completion_spent = self.completion_spent.saturating_add(usage.completion_tokens);
    }

    /// Spend ceiling for the seeding phase (never below one unit).
    pub fn seed_limit(&self) -> u32 {
        ((self.total as f64 * self.seed_fraction).floor() as u32).max(1)
    }

    pub fn seeding_exhausted(&self) -> bool {
        self.spent() >= self.seed_limit()
    }

    /// Still within the total (spend may equal it; refinement checks `<=`).
    pub fn within_total(&self) -> bool {
        self.spent() <= self.total
    }

    /// Output ceiling for the next call, or `None` if the remaining budget cannot
    /// cover the estimated prompt, the safety margin and at least one output unit.
    ///
    /// With `shrink` the requested ceiling is reduced to what still fits.
    pub fn output_allowance(&self, estimated_prompt: u32, cap: u32, shrink: bool) -> Option<u32> {
        let reserved = estimated_prompt.saturating_add(self.safety_margin);
        let room = self.remaining().checked_sub(reserved)?;
        if room == 0 || cap == 0 {
            return None;
        }
        Some(if shrink { cap.min(room) } else { cap })
    }

    /// Whether another step costing about `step_cost` would overrun the total.
    pub fn would_overrun(&self, step_cost: u32) -> bool {
        step_cost > 0 && self.spent().saturating_add(step_cost) > self.total
    }

    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_spent,
            completion_tokens: self.completion_spent,
        }
    }
}
