use crate::engine::journal::DecisionMode;
use crate::engine::render;
use crate::engine::router::Router;
use crate::engine::session::Resolution;
use crate::engine::types::{Direction, Expiry, Market, TradeIntent, UserId};
use rust_decimal::Decimal;
use tracing::info;

/// The `n`th (1-based) autopilot intent: rotates through the market matrix,
/// alternating UP and DOWN.
pub fn synthetic_intent(n: u32, stake: Decimal) -> TradeIntent {
    let idx = (n.saturating_sub(1) as usize) % Market::ALL.len();
    let direction = if n % 2 == 1 {
        Direction::Up
    } else {
        Direction::Down
    };
    TradeIntent::new(Market::ALL[idx], direction, Expiry::OneMinute, stake)
}

/// Drives the regular decision cycle once per step. Stops early once `run`
/// is no longer the user's live run.
pub(crate) async fn run(router: &Router, user: UserId, run: u64) -> Vec<Resolution> {
    let cfg = router.config().clone();
    router.notify(user, render::autopilot_on(cfg.autopilot_steps)).await;

    let mut resolved = Vec::new();
    let mut completed = 0u32;
    for n in 1..=cfg.autopilot_steps {
        tokio::time::sleep(cfg.step_delay()).await;
        if !router.autopilot_live(user, run).await {
            info!(user, run, completed, "autopilot stopped");
            router.notify(user, render::autopilot_stopped(completed)).await;
            return resolved;
        }

        let intent = synthetic_intent(n, cfg.nominal_stake);
        router.notify(user, render::autopilot_step(n, &intent)).await;
        if let Some(res) = router
            .run_decision(user, intent, DecisionMode::Autopilot)
            .await
        {
            resolved.push(res);
        }
        completed += 1;
    }

    info!(user, run, completed, "autopilot done");
    router.notify(user, render::autopilot_done(completed)).await;
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::EngineConfig;
    use crate::engine::events::{Inbound, InboundEvent};
    use crate::engine::notify::MemorySink;
    use crate::engine::oracle::StaticBalanceOracle;
    use crate::engine::shield::{OutcomeSimulator, ScriptedDraws};
    use crate::engine::types::{AccountRef, ReasonCode};
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::Arc;

    fn router(cfg: EngineConfig, balance: Decimal, draws: &[f64]) -> (Router, MemorySink) {
        let sink = MemorySink::new();
        let sim = OutcomeSimulator::with_token_rng(
            Box::new(ScriptedDraws::new(draws.to_vec())),
            cfg.revert_probability,
            StdRng::seed_from_u64(11),
        );
        let router = Router::new(
            cfg,
            AccountRef::new("0xvault"),
            Arc::new(StaticBalanceOracle::new(balance)),
            Arc::new(sink.clone()),
            sim,
        );
        (router, sink)
    }

    fn fast_cfg(steps: u32) -> EngineConfig {
        EngineConfig {
            autopilot_steps: steps,
            step_delay_ms: 0,
            resolution_delay_ms: 0,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn synthetic_intents_rotate() {
        let stake = Decimal::new(100, 0);
        assert_eq!(synthetic_intent(1, stake).prediction_label(), "BTC/USD UP");
        assert_eq!(synthetic_intent(2, stake).prediction_label(), "ETH/USD DOWN");
        assert_eq!(synthetic_intent(7, stake).market, Market::BtcUsd);
    }

    #[tokio::test]
    async fn two_steps_resolve_in_draw_order() {
        let (router, sink) = router(fast_cfg(2), Decimal::ONE, &[0.05, 0.50]);
        let out = router.autopilot(1).await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].reason(), Some(ReasonCode::MarketRevert));
        assert!(!out[0].decision.is_accepted());
        assert!(out[1].decision.is_accepted());
        assert!(out[1].decision.confirmation_token().is_some());
        assert_eq!(router.simulator_calls().await, 2);

        let texts = sink.texts_for(1).await;
        let revert = texts.iter().position(|t| t.contains("MARKET_REVERT")).unwrap();
        let confirm = texts.iter().position(|t| t.contains("BUNDLE CONFIRMED")).unwrap();
        assert!(revert < confirm);
        assert!(texts.last().unwrap().contains("AUTOPILOT: OFF"));
        assert!(!router.autopilot_running(1).await);
    }

    #[tokio::test]
    async fn unfunded_autopilot_never_simulates() {
        let (router, _sink) = router(fast_cfg(3), Decimal::ZERO, &[0.9]);
        let out = router.autopilot(2).await;
        assert_eq!(out.len(), 3);
        assert!(out
            .iter()
            .all(|r| r.reason() == Some(ReasonCode::InsufficientFunds)));
        assert_eq!(router.simulator_calls().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_between_steps() {
        let cfg = EngineConfig {
            step_delay_ms: 1_000,
            ..fast_cfg(3)
        };
        let (router, sink) = router(cfg, Decimal::ONE, &[0.9]);
        let router = Arc::new(router);

        let run = {
            let router = Arc::clone(&router);
            tokio::spawn(async move { router.autopilot(3).await })
        };
        while !router.autopilot_running(3).await {
            tokio::task::yield_now().await;
        }

        // A second start while running is turned away.
        router
            .handle(Inbound {
                user: 3,
                event: InboundEvent::Autopilot,
            })
            .await;
        router
            .handle(Inbound {
                user: 3,
                event: InboundEvent::Stop,
            })
            .await;

        let out = run.await.unwrap();
        assert!(out.is_empty());
        assert_eq!(router.simulator_calls().await, 0);
        let texts = sink.texts_for(3).await;
        assert!(texts.iter().any(|t| t.contains("SESSION_BUSY")));
        assert!(texts.last().unwrap().contains("AUTOPILOT STOPPED"));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_run_stays_stopped_after_restart() {
        let cfg = EngineConfig {
            step_delay_ms: 1_000,
            ..fast_cfg(3)
        };
        let (router, sink) = router(cfg, Decimal::ONE, &[0.9]);
        let router = Arc::new(router);

        let spawn_run = |router: &Arc<Router>| {
            let router = Arc::clone(router);
            tokio::spawn(async move { router.autopilot(4).await })
        };

        let first = spawn_run(&router);
        while !router.autopilot_running(4).await {
            tokio::task::yield_now().await;
        }
        router
            .handle(Inbound {
                user: 4,
                event: InboundEvent::Stop,
            })
            .await;
        assert!(!router.autopilot_running(4).await);

        let second = spawn_run(&router);
        while !router.autopilot_running(4).await {
            tokio::task::yield_now().await;
        }

        assert!(first.await.unwrap().is_empty());
        assert_eq!(second.await.unwrap().len(), 3);
        assert_eq!(router.simulator_calls().await, 3);
        assert!(!router.autopilot_running(4).await);

        let texts = sink.texts_for(4).await;
        let count = |needle: &str| texts.iter().filter(|t| t.contains(needle)).count();
        assert_eq!(count("AUTOPILOT STOPPED"), 1);
        assert_eq!(count("AUTOPILOT: OFF"), 1);
        assert_eq!(count("Auto-Trade #1"), 1);
        assert!(texts.last().unwrap().contains("AUTOPILOT: OFF"));
    }

    #[tokio::test]
    async fn finished_run_allows_another() {
        let (router, sink) = router(fast_cfg(2), Decimal::ONE, &[0.9]);
        assert_eq!(router.autopilot(5).await.len(), 2);
        assert!(!router.autopilot_running(5).await);
        assert_eq!(router.autopilot(5).await.len(), 2);
        assert_eq!(router.simulator_calls().await, 4);

        let texts = sink.texts_for(5).await;
        assert!(!texts.iter().any(|t| t.contains("SESSION_BUSY")));
        assert_eq!(texts.iter().filter(|t| t.contains("AUTOPILOT: OFF")).count(), 2);
    }
}
