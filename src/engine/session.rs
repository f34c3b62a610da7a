//! Per-user trade session state machine.
//!
//! `transition` is pure: it maps the current state and one event to the next
//! state plus the effect the router has to carry out. There is no stored
//! "resolved" state; a resolving transition always lands in `Idle`.

use crate::engine::admission::Admission;
use crate::engine::types::{
    Expiry, Market, ReasonCode, ShieldDecision, TradeIntent, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    SelectingParams(TradeIntent),
    AwaitingAdmission(TradeIntent),
    AwaitingShield(TradeIntent),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::SelectingParams(_) => "selecting_params",
            SessionState::AwaitingAdmission(_) => "awaiting_admission",
            SessionState::AwaitingShield(_) => "awaiting_shield",
        }
    }

    pub fn pending_intent(&self) -> Option<&TradeIntent> {
        match self {
            SessionState::Idle => None,
            SessionState::SelectingParams(i)
            | SessionState::AwaitingAdmission(i)
            | SessionState::AwaitingShield(i) => Some(i),
        }
    }

    /// A decision is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingAdmission(_) | SessionState::AwaitingShield(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Select(TradeIntent),
    Confirm(TradeIntent),
    Admission(Admission),
    Shield(ShieldDecision),
    Cancel,
}

/// Terminal outcome of one decision cycle, emitted on the way back to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub intent: TradeIntent,
    pub decision: ShieldDecision,
}

impl Resolution {
    pub fn reason(&self) -> Option<ReasonCode> {
        self.decision.reason()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Selection stored; nothing to run yet.
    Prompt,
    CheckAdmission(TradeIntent),
    Simulate(TradeIntent),
    Resolve(Resolution),
    /// Rejected with `SESSION_BUSY`; state untouched.
    Busy,
    Cancelled,
    /// Duplicate or stale event; state untouched.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionState,
    pub effect: Effect,
}

impl Transition {
    fn to(next: SessionState, effect: Effect) -> Self {
        Self { next, effect }
    }

    fn stay(state: &SessionState, effect: Effect) -> Self {
        Self {
            next: state.clone(),
            effect,
        }
    }
}

pub fn transition(state: &SessionState, event: SessionEvent) -> Transition {
    use SessionEvent as E;
    use SessionState as S;

    match (state, event) {
        (S::Idle | S::SelectingParams(_), E::Select(intent)) => {
            Transition::to(S::SelectingParams(intent), Effect::Prompt)
        }
        (S::Idle | S::SelectingParams(_), E::Confirm(intent)) => Transition::to(
            S::AwaitingAdmission(intent.clone()),
            Effect::CheckAdmission(intent),
        ),
        (S::Idle | S::SelectingParams(_), E::Cancel) => Transition::to(S::Idle, Effect::Cancelled),

        (S::AwaitingAdmission(intent), E::Admission(admission)) => {
            if admission.admitted {
                Transition::to(
                    S::AwaitingShield(intent.clone()),
                    Effect::Simulate(intent.clone()),
                )
            } else {
                let reason = admission.reason.unwrap_or(ReasonCode::InsufficientFunds);
                Transition::to(
                    S::Idle,
                    Effect::Resolve(Resolution {
                        intent: intent.clone(),
                        decision: ShieldDecision::not_admitted(reason),
                    }),
                )
            }
        }
        (S::AwaitingShield(intent), E::Shield(decision)) => Transition::to(
            S::Idle,
            Effect::Resolve(Resolution {
                intent: intent.clone(),
                decision,
            }),
        ),

        // Busy guard: one decision in flight per user.
        (
            S::AwaitingAdmission(in_flight) | S::AwaitingShield(in_flight),
            E::Select(intent) | E::Confirm(intent),
        ) => {
            if &intent == in_flight {
                Transition::stay(state, Effect::Ignored)
            } else {
                Transition::stay(state, Effect::Busy)
            }
        }
        (S::AwaitingAdmission(_) | S::AwaitingShield(_), E::Cancel) => {
            Transition::stay(state, Effect::Busy)
        }

        // Results that arrive for a state that is not waiting on them.
        (_, E::Admission(_) | E::Shield(_)) => Transition::stay(state, Effect::Ignored),
    }
}

/// Manual-mode choices collected before an intent exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDraft {
    pub market: Market,
    pub expiry: Expiry,
}

impl Default for ParamDraft {
    fn default() -> Self {
        Self {
            market: Market::BtcUsd,
            expiry: Expiry::OneMinute,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TradeSession {
    pub user: UserId,
    pub state: SessionState,
    pub draft: ParamDraft,
    /// Id of the live autopilot run, if any.
    autopilot: Option<u64>,
    autopilot_runs: u64,
}

impl TradeSession {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            state: SessionState::Idle,
            draft: ParamDraft::default(),
            autopilot: None,
            autopilot_runs: 0,
        }
    }

    /// Claims the autopilot for a new run and returns its id, or `None`
    /// while another run is live.
    pub fn start_autopilot(&mut self) -> Option<u64> {
        if self.autopilot.is_some() {
            return None;
        }
        self.autopilot_runs += 1;
        self.autopilot = Some(self.autopilot_runs);
        self.autopilot
    }

    /// Stops the live run, if there is one.
    pub fn stop_autopilot(&mut self) -> bool {
        self.autopilot.take().is_some()
    }

    /// Releases `run` once it ends. A run that was already stopped, or
    /// replaced by a newer one, leaves the flag alone.
    pub fn finish_autopilot(&mut self, run: u64) {
        if self.autopilot == Some(run) {
            self.autopilot = None;
        }
    }

    pub fn autopilot_live(&self, run: u64) -> bool {
        self.autopilot == Some(run)
    }

    pub fn has_autopilot(&self) -> bool {
        self.autopilot.is_some()
    }

    pub fn pending_intent(&self) -> Option<&TradeIntent> {
        self.state.pending_intent()
    }

    pub fn apply(&mut self, event: SessionEvent) -> Effect {
        let t = transition(&self.state, event);
        self.state = t.next;
        t.effect
    }
}
