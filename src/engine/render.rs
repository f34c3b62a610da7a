//! User-facing text. Every figure shown here is simulated; wording must not
//! suggest that anything was settled on-chain.

use crate::engine::events::{
    execute_callback, ParamChoice, ASSISTANT_KEY, BALANCE_KEY, NEW_BET_KEY, START_SIM_CALLBACK,
};
use crate::engine::notify::{Button, Keyboard, Notice};
use crate::engine::session::{ParamDraft, Resolution};
use crate::engine::types::{
    AccountRef, Direction, Expiry, Market, ReasonCode, TradeIntent,
};
use rust_decimal::Decimal;

pub const BASE_CURRENCY: &str = "ETH";

fn fmt_balance(balance: Option<Decimal>) -> String {
    match balance {
        Some(b) => format!("{} {BASE_CURRENCY}", b.round_dp(4)),
        None => "unavailable".to_string(),
    }
}

pub fn welcome(account: &AccountRef, balance: Option<Decimal>) -> Notice {
    let text = format!(
        "🕴️ **ATOMIC SHIELD INTERFACE**\n\n\
         Your bot vault is active.\n\
         💵 **BALANCE:** {}\n\
         📥 **DEPOSIT:** `{}`\n\n\
         **Shield Status:** Armed & Ready (simulation mode).",
        fmt_balance(balance),
        account
    );
    Notice::markdown(text).with_keyboard(Keyboard::Reply(vec![
        vec![BALANCE_KEY.to_string(), NEW_BET_KEY.to_string()],
        vec![
            ASSISTANT_KEY.to_string(),
            "/manual".to_string(),
            "/autopilot".to_string(),
        ],
    ]))
}

fn pct(ratio: Decimal) -> Decimal {
    (ratio * Decimal::ONE_HUNDRED).normalize()
}

pub fn manual_menu(draft: &ParamDraft) -> Notice {
    let pair = |m: Market| {
        Button::new(
            format!("{} ({}%)", m.label(), pct(m.payout_ratio())),
            ParamChoice::Pair(m).callback(),
        )
    };
    let time = |e: Expiry| {
        Button::new(
            format!("⏱️ {} MIN", e.minutes()),
            ParamChoice::Time(e).callback(),
        )
    };
    let text = format!(
        "🎯 **MANUAL SELECTION**\nChoose your risk parameters:\n\
         Current: `{}` | `{} MIN`",
        draft.market,
        draft.expiry.minutes()
    );
    Notice::markdown(text).with_keyboard(Keyboard::Inline(vec![
        vec![pair(Market::BtcUsd), pair(Market::EthUsd)],
        vec![pair(Market::Bviv), pair(Market::Eviv)],
        vec![time(Expiry::OneMinute), time(Expiry::FiveMinutes)],
        vec![Button::new("💎 START QUANT SIM", START_SIM_CALLBACK)],
    ]))
}

pub fn param_selected(draft: &ParamDraft) -> Notice {
    Notice::markdown(format!(
        "✅ Parameters: `{}` | `{} MIN`",
        draft.market,
        draft.expiry.minutes()
    ))
}

pub fn prediction_prompt(draft: &ParamDraft) -> Notice {
    let text = format!(
        "📊 **Quant Analysis** (simulated)\n\
         💎 **Market:** {} | ⏱️ {} MIN\n\
         Select Prediction:",
        draft.market,
        draft.expiry.minutes()
    );
    let exec = |d: Direction| Button::new(d.button(), execute_callback(d));
    Notice::markdown(text).with_keyboard(Keyboard::Inline(vec![vec![
        exec(Direction::Up),
        exec(Direction::Down),
    ]]))
}

pub fn simulating(intent: &TradeIntent) -> Notice {
    Notice::markdown(format!(
        "🛡️ **Shield Simulating** `{}`\nStake: `${}` (nominal)",
        intent.prediction_label(),
        intent.stake
    ))
}

pub fn resolution(res: &Resolution, minimum_threshold: Decimal) -> Notice {
    if let Some(token) = res.decision.confirmation_token() {
        return Notice::markdown(format!(
            "✅ **BUNDLE CONFIRMED** (simulated)\n\
             Token: `{}...`\n\
             Result: **{} WIN (+{}%)**\n\
             Payout: +${} (display only, nothing settled)",
            token.prefix(),
            res.intent.prediction_label(),
            pct(res.intent.market.payout_ratio()),
            res.intent.display_payout()
        ));
    }

    let reason = res.reason().unwrap_or(ReasonCode::MarketRevert);
    let detail = match reason {
        ReasonCode::InsufficientFunds => {
            format!("Vault below the {minimum_threshold} {BASE_CURRENCY} minimum.")
        }
        ReasonCode::BalanceUnavailable => "Vault balance could not be read.".to_string(),
        ReasonCode::MarketRevert => "Market volatility revert detected.".to_string(),
        ReasonCode::SessionBusy => "Another decision is in flight.".to_string(),
    };
    Notice::markdown(format!(
        "🛑 **ATOMIC SHIELD REVERT**\n\n\
         **Reason:** `{reason}`\n\
         {detail}\n\
         **Action:** Trade `{}` aborted. No funds moved.",
        res.intent.prediction_label()
    ))
}

pub fn busy() -> Notice {
    Notice::markdown(format!(
        "⏳ `{}`: a decision is already in flight. Wait for its verdict.",
        ReasonCode::SessionBusy
    ))
}

pub fn cancelled() -> Notice {
    Notice::plain("↩️ Selection cleared.")
}

pub fn balance(balance: Option<Decimal>) -> Notice {
    Notice::markdown(format!("💵 **Vault Balance:** {}", fmt_balance(balance)))
}

pub fn assistant() -> Notice {
    Notice::markdown(
        "🕴️ **Shield Assistant:** I'm watching the order flow. Use /manual to \
         pick a market or /autopilot for a hands-off run. Every verdict here is \
         simulated.",
    )
}

pub fn unknown_button() -> Notice {
    Notice::plain("That button has expired. Send /manual to start again.")
}

pub fn autopilot_on(steps: u32) -> Notice {
    Notice::markdown(format!(
        "🤖 **AUTOPILOT: ON**\nRunning {steps} simulated setups. Send /stop to halt."
    ))
}

pub fn autopilot_step(n: u32, intent: &TradeIntent) -> Notice {
    Notice::markdown(format!(
        "⚡ **Auto-Trade #{n}**\nAsset: {}\nAction: {}\nShield: *Simulating...*",
        intent.market,
        intent.direction.button()
    ))
}

pub fn autopilot_done(completed: u32) -> Notice {
    Notice::markdown(format!("🤖 **AUTOPILOT: OFF**\n{completed} run(s) completed."))
}

pub fn autopilot_stopped(completed: u32) -> Notice {
    Notice::markdown(format!(
        "🛑 **AUTOPILOT STOPPED**\n{completed} run(s) completed before stop."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{ConfirmationToken, ShieldDecision};

    fn intent() -> TradeIntent {
        TradeIntent::new(
            Market::BtcUsd,
            Direction::Up,
            Expiry::OneMinute,
            Decimal::new(100, 0),
        )
    }

    #[test]
    fn accepted_shows_token_prefix_and_payout() {
        let res = Resolution {
            intent: intent(),
            decision: ShieldDecision::accepted(ConfirmationToken::from_bytes([0x0f; 32])),
        };
        let n = resolution(&res, Decimal::new(1, 2));
        assert!(n.text.contains("`0x0f0f0f0f...`"));
        assert!(n.text.contains("+$90.00"));
        assert!(n.text.contains("+90%"));
        assert!(n.text.contains("simulated"));
    }

    #[test]
    fn rejection_carries_reason_code() {
        let res = Resolution {
            intent: intent(),
            decision: ShieldDecision::not_admitted(ReasonCode::InsufficientFunds),
        };
        let n = resolution(&res, Decimal::new(1, 2));
        assert!(n.text.contains("INSUFFICIENT_FUNDS"));
        assert!(n.text.contains("0.01 ETH"));

        let res = Resolution {
            intent: intent(),
            decision: ShieldDecision::reverted(),
        };
        assert!(resolution(&res, Decimal::ZERO).text.contains("MARKET_REVERT"));
    }

    #[test]
    fn manual_menu_offers_every_parameter() {
        let n = manual_menu(&ParamDraft::default());
        let Some(Keyboard::Inline(rows)) = n.keyboard else {
            panic!("manual menu needs inline buttons");
        };
        let callbacks: Vec<&str> = rows
            .iter()
            .flatten()
            .map(|b| b.callback.as_str())
            .collect();
        assert!(callbacks.contains(&"pair_btc"));
        assert!(callbacks.contains(&"time_5"));
        assert!(callbacks.contains(&"start_sim"));
        assert!(rows[0][1].label.contains("88%"));
    }

    #[test]
    fn balance_rounds_to_four_places() {
        assert!(balance(Some(Decimal::new(123456789, 8))).text.contains("1.2346 ETH"));
        assert!(balance(None).text.contains("unavailable"));
    }
}
