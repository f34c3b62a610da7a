//! Conversation router: classifies inbound events, owns the per-user session
//! arena and drives each decision cycle through admission and simulation.

use crate::engine::admission::{admit, Admission};
use crate::engine::autopilot;
use crate::engine::config::EngineConfig;
use crate::engine::events::{Inbound, InboundEvent, ParamChoice};
use crate::engine::journal::{DecisionJournal, DecisionMode};
use crate::engine::notify::{Notice, NotificationSink};
use crate::engine::oracle::BalanceOracle;
use crate::engine::render;
use crate::engine::session::{
    Effect, ParamDraft, Resolution, SessionEvent, SessionState, TradeSession,
};
use crate::engine::shield::{OutcomeSimulator, RngUniform, UniformSource};
use crate::engine::types::{AccountRef, Direction, ReasonCode, TradeIntent, UserId};
use rand::{rngs::StdRng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const BALANCE_TIMEOUT: Duration = Duration::from_secs(15);

pub struct Router {
    cfg: EngineConfig,
    account: AccountRef,
    oracle: Arc<dyn BalanceOracle>,
    sink: Arc<dyn NotificationSink>,
    simulator: Mutex<OutcomeSimulator>,
    sessions: Mutex<HashMap<UserId, TradeSession>>,
    journal: Option<DecisionJournal>,
}

impl Router {
    pub fn new(
        cfg: EngineConfig,
        account: AccountRef,
        oracle: Arc<dyn BalanceOracle>,
        sink: Arc<dyn NotificationSink>,
        simulator: OutcomeSimulator,
    ) -> Self {
        Self {
            cfg,
            account,
            oracle,
            sink,
            simulator: Mutex::new(simulator),
            sessions: Mutex::new(HashMap::new()),
            journal: None,
        }
    }

    /// Router with an RNG-backed simulator, seeded from `cfg.seed` when set.
    pub fn from_config(
        cfg: EngineConfig,
        account: AccountRef,
        oracle: Arc<dyn BalanceOracle>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (draws, token_rng): (Box<dyn UniformSource>, StdRng) = match cfg.seed {
            Some(seed) => (
                Box::new(RngUniform::seeded(seed)) as Box<dyn UniformSource>,
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (
                Box::new(RngUniform::from_entropy()) as Box<dyn UniformSource>,
                StdRng::from_entropy(),
            ),
        };
        let simulator = OutcomeSimulator::with_token_rng(draws, cfg.revert_probability, token_rng);
        Self::new(cfg, account, oracle, sink, simulator)
    }

    pub fn with_journal(mut self, journal: DecisionJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub async fn session_state(&self, user: UserId) -> SessionState {
        self.sessions
            .lock()
            .await
            .get(&user)
            .map(|s| s.state.clone())
            .unwrap_or(SessionState::Idle)
    }

    pub async fn has_session(&self, user: UserId) -> bool {
        self.sessions.lock().await.contains_key(&user)
    }

    pub async fn simulator_calls(&self) -> u64 {
        self.simulator.lock().await.calls()
    }

    pub async fn handle(&self, inbound: Inbound) {
        let Inbound { user, event } = inbound;
        debug!(user, ?event, "inbound");
        match event {
            InboundEvent::Start => {
                let balance = self.fetch_balance().await;
                self.notify(user, render::welcome(&self.account, balance)).await;
            }
            InboundEvent::Manual => self.on_manual(user).await,
            InboundEvent::Autopilot => {
                self.autopilot(user).await;
            }
            InboundEvent::Stop => self.on_stop(user).await,
            InboundEvent::Param(choice) => self.on_param(user, choice).await,
            InboundEvent::StartSim => self.on_start_sim(user).await,
            InboundEvent::Execute(direction) => self.on_execute(user, direction).await,
            InboundEvent::BalanceQuery => {
                let balance = self.fetch_balance().await;
                self.notify(user, render::balance(balance)).await;
            }
            InboundEvent::Text(_) => self.notify(user, render::assistant()).await,
            InboundEvent::UnknownCallback(data) => {
                debug!(user, data = %data, "unknown callback");
                self.notify(user, render::unknown_button()).await;
            }
        }
    }

    /// Runs an autopilot for `user` unless one is already running.
    pub async fn autopilot(&self, user: UserId) -> Vec<Resolution> {
        let run = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .entry(user)
                .or_insert_with(|| TradeSession::new(user))
                .start_autopilot()
        };
        let Some(run) = run else {
            self.notify(user, render::busy()).await;
            return Vec::new();
        };
        info!(user, run, steps = self.cfg.autopilot_steps, "autopilot on");
        let out = autopilot::run(self, user, run).await;
        if let Some(s) = self.sessions.lock().await.get_mut(&user) {
            s.finish_autopilot(run);
        }
        out
    }

    async fn on_manual(&self, user: UserId) {
        let (busy, draft) = {
            let mut sessions = self.sessions.lock().await;
            let s = sessions
                .entry(user)
                .or_insert_with(|| TradeSession::new(user));
            let busy = s.state.is_busy();
            if !busy {
                s.draft = ParamDraft::default();
            }
            (busy, s.draft)
        };
        if busy {
            self.notify(user, render::busy()).await;
            return;
        }
        self.notify(user, render::manual_menu(&draft)).await;
    }

    async fn on_stop(&self, user: UserId) {
        let effect = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get_mut(&user) {
                Some(s) => {
                    if s.stop_autopilot() {
                        None
                    } else {
                        Some(s.apply(SessionEvent::Cancel))
                    }
                }
                None => Some(Effect::Cancelled),
            }
        };
        match effect {
            None => info!(user, "autopilot stop requested"),
            Some(Effect::Busy) => self.notify(user, render::busy()).await,
            Some(_) => self.notify(user, render::cancelled()).await,
        }
    }

    async fn on_param(&self, user: UserId, choice: ParamChoice) {
        let updated = {
            let mut sessions = self.sessions.lock().await;
            let s = sessions
                .entry(user)
                .or_insert_with(|| TradeSession::new(user));
            if s.state.is_busy() {
                None
            } else {
                match choice {
                    ParamChoice::Pair(m) => s.draft.market = m,
                    ParamChoice::Time(e) => s.draft.expiry = e,
                }
                Some(s.draft)
            }
        };
        match updated {
            Some(draft) => self.notify(user, render::param_selected(&draft)).await,
            None => self.notify(user, render::busy()).await,
        }
    }

    async fn on_start_sim(&self, user: UserId) {
        let (busy, draft) = {
            let mut sessions = self.sessions.lock().await;
            let s = sessions
                .entry(user)
                .or_insert_with(|| TradeSession::new(user));
            (s.state.is_busy(), s.draft)
        };
        if busy {
            self.notify(user, render::busy()).await;
            return;
        }
        self.notify(user, render::prediction_prompt(&draft)).await;
    }

    async fn on_execute(&self, user: UserId, direction: Direction) {
        let draft = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .entry(user)
                .or_insert_with(|| TradeSession::new(user))
                .draft
        };
        let intent = TradeIntent::new(
            draft.market,
            direction,
            draft.expiry,
            self.cfg.nominal_stake,
        );
        self.run_decision(user, intent, DecisionMode::Manual).await;
    }

    /// One full cycle: select, confirm, admission, simulation, resolution.
    /// Returns `None` when the busy guard turned the intent away.
    pub(crate) async fn run_decision(
        &self,
        user: UserId,
        intent: TradeIntent,
        mode: DecisionMode,
    ) -> Option<Resolution> {
        let effect = {
            let mut sessions = self.sessions.lock().await;
            let s = sessions
                .entry(user)
                .or_insert_with(|| TradeSession::new(user));
            match s.apply(SessionEvent::Select(intent.clone())) {
                Effect::Prompt => s.apply(SessionEvent::Confirm(intent.clone())),
                other => other,
            }
        };
        match effect {
            Effect::CheckAdmission(_) => {}
            Effect::Busy => {
                info!(user, intent = %intent, reason = %ReasonCode::SessionBusy, "intent rejected");
                self.notify(user, render::busy()).await;
                return None;
            }
            other => {
                debug!(user, intent = %intent, ?other, "intent dropped");
                return None;
            }
        }

        if mode == DecisionMode::Manual {
            self.notify(user, render::simulating(&intent)).await;
        }

        let admission = match self.fetch_balance().await {
            Some(balance) => admit(balance, self.cfg.minimum_threshold),
            None => Admission::denied(ReasonCode::BalanceUnavailable),
        };
        debug!(user, admitted = admission.admitted, "admission");

        let resolution = match self.apply(user, SessionEvent::Admission(admission)).await {
            Effect::Resolve(res) => res,
            Effect::Simulate(intent) => {
                let decision = self.simulator.lock().await.simulate(&intent);
                match self.apply(user, SessionEvent::Shield(decision)).await {
                    Effect::Resolve(res) => res,
                    other => {
                        error!(user, ?other, "shield result not accepted by session");
                        self.reset(user).await;
                        return None;
                    }
                }
            }
            other => {
                error!(user, ?other, "admission result not accepted by session");
                self.reset(user).await;
                return None;
            }
        };

        info!(
            user,
            intent = %resolution.intent,
            accepted = resolution.decision.is_accepted(),
            reason = ?resolution.reason(),
            "decision resolved"
        );
        if let Some(journal) = &self.journal {
            journal.record(user, mode, &resolution);
        }

        tokio::time::sleep(self.cfg.resolution_delay()).await;
        self.notify(user, render::resolution(&resolution, self.cfg.minimum_threshold))
            .await;
        Some(resolution)
    }

    async fn apply(&self, user: UserId, event: SessionEvent) -> Effect {
        let mut sessions = self.sessions.lock().await;
        let s = sessions
            .entry(user)
            .or_insert_with(|| TradeSession::new(user));
        s.apply(event)
    }

    async fn reset(&self, user: UserId) {
        if let Some(s) = self.sessions.lock().await.get_mut(&user) {
            warn!(user, state = s.state.name(), "session reset to idle");
            s.state = SessionState::Idle;
        }
    }

    /// Whether `run` is still the user's live autopilot run.
    pub(crate) async fn autopilot_live(&self, user: UserId, run: u64) -> bool {
        self.sessions
            .lock()
            .await
            .get(&user)
            .is_some_and(|s| s.autopilot_live(run))
    }

    pub async fn autopilot_running(&self, user: UserId) -> bool {
        self.sessions
            .lock()
            .await
            .get(&user)
            .is_some_and(|s| s.has_autopilot())
    }

    /// Balance snapshot for admission; any failure or timeout is `None`.
    async fn fetch_balance(&self) -> Option<Decimal> {
        match tokio::time::timeout(BALANCE_TIMEOUT, self.oracle.balance(&self.account)).await {
            Ok(Ok(balance)) => Some(balance),
            Ok(Err(e)) => {
                warn!(account = %self.account.short(), err = %e, "balance unavailable");
                None
            }
            Err(_) => {
                warn!(account = %self.account.short(), "balance read timed out");
                None
            }
        }
    }

    pub(crate) async fn notify(&self, user: UserId, notice: Notice) {
        if let Err(e) = self.sink.notify(user, notice).await {
            warn!(user, err = %e, "notify failed");
        }
    }
}
