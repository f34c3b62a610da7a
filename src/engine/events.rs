use crate::engine::types::{Direction, Expiry, Market, UserId};
use anyhow::{Context, Result};

pub const BALANCE_KEY: &str = "💰 Check Balance";
pub const NEW_BET_KEY: &str = "🚀 New Bet";
pub const ASSISTANT_KEY: &str = "🕴️ Talk to Assistant";

pub const START_SIM_CALLBACK: &str = "start_sim";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamChoice {
    Pair(Market),
    Time(Expiry),
}

impl ParamChoice {
    pub fn callback(self) -> String {
        match self {
            ParamChoice::Pair(m) => format!("pair_{}", m.tag()),
            ParamChoice::Time(e) => format!("time_{}", e.minutes()),
        }
    }
}

pub fn execute_callback(direction: Direction) -> String {
    format!("exec_{}", direction.tag())
}

/// Everything the transport can deliver, already classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Start,
    Manual,
    Autopilot,
    Stop,
    Param(ParamChoice),
    StartSim,
    Execute(Direction),
    BalanceQuery,
    Text(String),
    UnknownCallback(String),
}

impl InboundEvent {
    pub fn from_callback(data: &str) -> Self {
        let data = data.trim();
        if data.eq_ignore_ascii_case(START_SIM_CALLBACK) {
            return InboundEvent::StartSim;
        }
        let parsed = data.split_once('_').and_then(|(kind, value)| {
            match kind.to_lowercase().as_str() {
                "pair" => Market::from_tag(value)
                    .map(|m| InboundEvent::Param(ParamChoice::Pair(m))),
                "time" => value
                    .parse::<u32>()
                    .ok()
                    .and_then(Expiry::from_minutes)
                    .map(|e| InboundEvent::Param(ParamChoice::Time(e))),
                "exec" => Direction::from_tag(value).map(InboundEvent::Execute),
                _ => None,
            }
        });
        parsed.unwrap_or_else(|| InboundEvent::UnknownCallback(data.to_string()))
    }

    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        if let Some(cmd) = text.strip_prefix('/') {
            // `/manual@SomeBot` style suffixes are tolerated.
            let cmd = cmd.split(['@', ' ']).next().unwrap_or_default();
            match cmd.to_lowercase().as_str() {
                "start" => return InboundEvent::Start,
                "manual" => return InboundEvent::Manual,
                "autopilot" => return InboundEvent::Autopilot,
                "stop" => return InboundEvent::Stop,
                _ => {}
            }
        }
        match text {
            BALANCE_KEY => InboundEvent::BalanceQuery,
            NEW_BET_KEY => InboundEvent::Manual,
            _ => InboundEvent::Text(text.to_string()),
        }
    }

    /// Console payload: `cb:<data>` for a button press, anything else is text.
    pub fn parse(payload: &str) -> Self {
        match payload.trim().strip_prefix("cb:") {
            Some(data) => Self::from_callback(data),
            None => Self::from_text(payload),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub user: UserId,
    pub event: InboundEvent,
}

impl Inbound {
    /// Format: `<user-id> <payload>`, e.g. `42 cb:exec_up`.
    pub fn parse_line(line: &str) -> Result<Self> {
        let line = line.trim();
        let (user, payload) = line
            .split_once(char::is_whitespace)
            .with_context(|| format!("invalid line '{line}', expected '<user> <payload>'"))?;
        let user: UserId = user
            .parse()
            .with_context(|| format!("invalid user id '{user}'"))?;
        Ok(Self {
            user,
            event: InboundEvent::parse(payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_and_keys() {
        assert_eq!(InboundEvent::parse("/start"), InboundEvent::Start);
        assert_eq!(InboundEvent::parse("/manual@ShieldBot"), InboundEvent::Manual);
        assert_eq!(InboundEvent::parse("/AUTOPILOT"), InboundEvent::Autopilot);
        assert_eq!(InboundEvent::parse("/stop"), InboundEvent::Stop);
        assert_eq!(InboundEvent::parse(BALANCE_KEY), InboundEvent::BalanceQuery);
        assert_eq!(InboundEvent::parse(NEW_BET_KEY), InboundEvent::Manual);
        assert_eq!(
            InboundEvent::parse("/help"),
            InboundEvent::Text("/help".to_string())
        );
        assert_eq!(
            InboundEvent::parse("what now?"),
            InboundEvent::Text("what now?".to_string())
        );
    }

    #[test]
    fn callbacks() {
        assert_eq!(
            InboundEvent::parse("cb:pair_eth"),
            InboundEvent::Param(ParamChoice::Pair(Market::EthUsd))
        );
        assert_eq!(
            InboundEvent::parse("cb:time_5"),
            InboundEvent::Param(ParamChoice::Time(Expiry::FiveMinutes))
        );
        assert_eq!(InboundEvent::parse("cb:start_sim"), InboundEvent::StartSim);
        assert_eq!(
            InboundEvent::parse("cb:exec_down"),
            InboundEvent::Execute(Direction::Down)
        );
        assert_eq!(
            InboundEvent::parse("cb:time_3"),
            InboundEvent::UnknownCallback("time_3".to_string())
        );
    }

    #[test]
    fn callback_strings_round_trip_through_parser() {
        for choice in [
            ParamChoice::Pair(Market::Bviv),
            ParamChoice::Time(Expiry::OneMinute),
        ] {
            assert_eq!(
                InboundEvent::from_callback(&choice.callback()),
                InboundEvent::Param(choice)
            );
        }
        assert_eq!(
            InboundEvent::from_callback(&execute_callback(Direction::Up)),
            InboundEvent::Execute(Direction::Up)
        );
    }

    #[test]
    fn parses_console_line() {
        let inbound = Inbound::parse_line("42 cb:exec_up").unwrap();
        assert_eq!(inbound.user, 42);
        assert_eq!(inbound.event, InboundEvent::Execute(Direction::Up));
        assert!(Inbound::parse_line("nouser").is_err());
        assert!(Inbound::parse_line("abc /start").is_err());
    }
}
