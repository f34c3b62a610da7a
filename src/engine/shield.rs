//! Outcome simulator ("atomic shield").
//!
//! Stands in for a bundle simulation: one uniform draw decides whether the
//! attempt reverts. Nothing here touches a chain or a market; an accepted
//! decision carries random display bytes, not a transaction hash.

use crate::engine::types::{ConfirmationToken, ShieldDecision, TradeIntent};
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use std::collections::VecDeque;
use tracing::debug;

/// Source of uniform draws in `[0, 1)`.
pub trait UniformSource: Send {
    fn next_uniform(&mut self) -> f64;
}

pub struct RngUniform {
    rng: StdRng,
}

impl RngUniform {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl UniformSource for RngUniform {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of draws, then keeps repeating the final one.
#[derive(Debug, Clone)]
pub struct ScriptedDraws {
    queue: VecDeque<f64>,
    last: f64,
}

impl ScriptedDraws {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        let queue: VecDeque<f64> = draws.into_iter().collect();
        let last = queue.back().copied().unwrap_or(0.5);
        Self { queue, last }
    }
}

impl UniformSource for ScriptedDraws {
    fn next_uniform(&mut self) -> f64 {
        match self.queue.pop_front() {
            Some(v) => {
                self.last = v;
                v
            }
            None => self.last,
        }
    }
}

pub struct OutcomeSimulator {
    draws: Box<dyn UniformSource>,
    token_rng: StdRng,
    revert_probability: f64,
    calls: u64,
}

impl OutcomeSimulator {
    pub fn new(draws: Box<dyn UniformSource>, revert_probability: f64) -> Self {
        Self::with_token_rng(draws, revert_probability, StdRng::from_entropy())
    }

    /// Token bytes come from their own stream so every `simulate` consumes
    /// exactly one draw from `draws`.
    pub fn with_token_rng(
        draws: Box<dyn UniformSource>,
        revert_probability: f64,
        token_rng: StdRng,
    ) -> Self {
        Self {
            draws,
            token_rng,
            revert_probability,
            calls: 0,
        }
    }

    /// Number of simulations run so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn simulate(&mut self, intent: &TradeIntent) -> ShieldDecision {
        self.calls += 1;
        let r = self.draws.next_uniform();
        if r < self.revert_probability {
            debug!(intent = %intent, draw = r, "shield revert");
            return ShieldDecision::reverted();
        }

        let mut bytes = [0u8; 32];
        self.token_rng.fill_bytes(&mut bytes);
        debug!(intent = %intent, draw = r, "shield accepted");
        ShieldDecision::accepted(ConfirmationToken::from_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Direction, Expiry, Market, ReasonCode};
    use rust_decimal::Decimal;

    fn intent() -> TradeIntent {
        TradeIntent::new(
            Market::BtcUsd,
            Direction::Up,
            Expiry::OneMinute,
            Decimal::new(100, 0),
        )
    }

    fn scripted(draws: &[f64]) -> OutcomeSimulator {
        OutcomeSimulator::with_token_rng(
            Box::new(ScriptedDraws::new(draws.to_vec())),
            0.15,
            StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn draw_above_probability_accepts_with_token() {
        let mut sim = scripted(&[0.20]);
        let d = sim.simulate(&intent());
        assert!(d.is_admitted());
        assert!(d.is_accepted());
        assert_eq!(d.reason(), None);
        let token = d.confirmation_token().expect("accepted decision carries a token");
        assert_ne!(token.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn draw_below_probability_reverts_without_token() {
        let mut sim = scripted(&[0.05]);
        let d = sim.simulate(&intent());
        assert!(d.is_admitted());
        assert!(!d.is_accepted());
        assert_eq!(d.reason(), Some(ReasonCode::MarketRevert));
        assert!(d.confirmation_token().is_none());
    }

    #[test]
    fn boundary_draw_is_accepted() {
        let mut sim = scripted(&[0.15]);
        assert!(sim.simulate(&intent()).is_accepted());
    }

    #[test]
    fn each_call_consumes_one_draw() {
        let mut sim = scripted(&[0.05, 0.50, 0.10]);
        let outcomes: Vec<bool> = (0..3).map(|_| sim.simulate(&intent()).is_accepted()).collect();
        assert_eq!(outcomes, vec![false, true, false]);
        assert_eq!(sim.calls(), 3);
    }

    #[test]
    fn scripted_draws_repeat_last_value() {
        let mut draws = ScriptedDraws::new([0.3, 0.9]);
        assert_eq!(draws.next_uniform(), 0.3);
        assert_eq!(draws.next_uniform(), 0.9);
        assert_eq!(draws.next_uniform(), 0.9);
    }

    #[test]
    fn rejection_rate_tracks_configured_probability() {
        let mut sim = OutcomeSimulator::with_token_rng(
            Box::new(RngUniform::seeded(42)),
            0.15,
            StdRng::seed_from_u64(43),
        );
        let n = 20_000;
        let mut rejected = 0usize;
        for _ in 0..n {
            let d = sim.simulate(&intent());
            if d.is_accepted() {
                assert!(d.confirmation_token().is_some());
            } else {
                assert!(d.confirmation_token().is_none());
                rejected += 1;
            }
        }
        let rate = rejected as f64 / n as f64;
        assert!((rate - 0.15).abs() < 0.02, "rejection rate {rate}");
    }

    #[test]
    fn zero_probability_never_reverts() {
        let mut sim = OutcomeSimulator::with_token_rng(
            Box::new(ScriptedDraws::new([0.0])),
            0.0,
            StdRng::seed_from_u64(1),
        );
        assert!(sim.simulate(&intent()).is_accepted());
    }
}
