//! Best-effort cost tracking.

use crate::infrastructure::ports::TokenUsage;

/// Price per 1000 tokens, in dollars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenPricing {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl TokenPricing {
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        f64::from(usage.prompt_tokens) / 1000.0 * self.prompt_per_1k
            + f64::from(usage.completion_tokens) / 1000.0 * self.completion_per_1k
    }
}

/// Running total of what a session has spent.
///
/// Calls without usage data, or sessions without pricing, add nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostTracker {
    pricing: Option<TokenPricing>,
    total: f64,
}

impl CostTracker {
    pub fn new(pricing: Option<TokenPricing>) -> Self {
        Self {
            pricing,
            total: 0.0,
        }
    }

    /// Continue from a previously saved total.
    pub fn with_total(mut self, total: f64) -> Self {
        self.total = total;
        self
    }

    /// Record one call's usage; returns its cost when it could be priced.
    pub fn record(&mut self, usage: Option<TokenUsage>) -> Option<f64> {
        let cost = self.pricing.zip(usage).map(|(p, u)| p.cost(&u))?;
        self.total += cost;
        Some(cost)
    }

    /// Add an already priced amount.
    pub fn add(&mut self, cost: Option<f64>) {
        if let Some(cost) = cost {
            self.total += cost;
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }
}
