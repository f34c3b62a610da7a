use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Chat-level user identifier as delivered by the transport.
pub type UserId = i64;

/// Opaque reference to a funding source (e.g. an EVM vault address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AccountRef(pub String);

impl AccountRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// `0x1234...abcd` style short form for display.
    pub fn short(&self) -> String {
        let s = self.0.as_str();
        if s.len() <= 12 || !s.is_ascii() {
            return s.to_string();
        }
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Market {
    BtcUsd,
    EthUsd,
    SolUsd,
    MaticUsd,
    Bviv,
    Eviv,
}

impl Market {
    pub const ALL: [Market; 6] = [
        Market::BtcUsd,
        Market::EthUsd,
        Market::SolUsd,
        Market::MaticUsd,
        Market::Bviv,
        Market::Eviv,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Market::BtcUsd => "BTC/USD",
            Market::EthUsd => "ETH/USD",
            Market::SolUsd => "SOL/USD",
            Market::MaticUsd => "MATIC/USD",
            Market::Bviv => "BVIV",
            Market::Eviv => "EVIV",
        }
    }

    /// Callback tag, e.g. `pair_btc`.
    pub fn tag(self) -> &'static str {
        match self {
            Market::BtcUsd => "btc",
            Market::EthUsd => "eth",
            Market::SolUsd => "sol",
            Market::MaticUsd => "matic",
            Market::Bviv => "bviv",
            Market::Eviv => "eviv",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_lowercase();
        Market::ALL.into_iter().find(|m| m.tag() == tag)
    }

    /// Advertised payout on a win. Display only; nothing is settled.
    pub fn payout_ratio(self) -> Decimal {
        match self {
            Market::EthUsd => Decimal::new(88, 2),
            // Volatility indices pay a premium.
            Market::Bviv | Market::Eviv => Decimal::new(94, 2),
            Market::BtcUsd | Market::SolUsd | Market::MaticUsd => Decimal::new(90, 2),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "up" | "call" | "higher" => Some(Direction::Up),
            "down" | "put" | "lower" => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn button(self) -> &'static str {
        match self {
            Direction::Up => "📈 HIGHER",
            Direction::Down => "📉 LOWER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Expiry {
    #[default]
    OneMinute,
    FiveMinutes,
}

impl Expiry {
    pub fn minutes(self) -> u32 {
        match self {
            Expiry::OneMinute => 1,
            Expiry::FiveMinutes => 5,
        }
    }

    pub fn from_minutes(m: u32) -> Option<Self> {
        match m {
            1 => Some(Expiry::OneMinute),
            5 => Some(Expiry::FiveMinutes),
            _ => None,
        }
    }
}

/// A requested bet. Immutable once built; consumed by one simulation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TradeIntent {
    pub market: Market,
    pub direction: Direction,
    pub expiry: Expiry,
    pub stake: Decimal,
}

impl TradeIntent {
    pub fn new(market: Market, direction: Direction, expiry: Expiry, stake: Decimal) -> Self {
        Self {
            market,
            direction,
            expiry,
            stake,
        }
    }

    pub fn prediction_label(&self) -> String {
        format!("{} {}", self.market.label(), self.direction.label())
    }

    pub fn display_payout(&self) -> Decimal {
        (self.stake * self.market.payout_ratio()).round_dp(2)
    }
}

impl fmt::Display for TradeIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}m stake={}",
            self.prediction_label(),
            self.expiry.minutes(),
            self.stake
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    InsufficientFunds,
    MarketRevert,
    BalanceUnavailable,
    SessionBusy,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ReasonCode::MarketRevert => "MARKET_REVERT",
            ReasonCode::BalanceUnavailable => "BALANCE_UNAVAILABLE",
            ReasonCode::SessionBusy => "SESSION_BUSY",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Random bytes shown to the user on acceptance. Not a transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfirmationToken([u8; 32]);

impl ConfirmationToken {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// First 10 characters of the hex form, including `0x`.
    pub fn prefix(&self) -> String {
        self.to_hex()[..10].to_string()
    }
}

impl fmt::Debug for ConfirmationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfirmationToken({}...)", self.prefix())
    }
}

impl Serialize for ConfirmationToken {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Outcome of one simulation attempt.
///
/// Built only through the constructors below, so a token is present exactly
/// when the decision was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShieldDecision {
    admitted: bool,
    accepted: bool,
    confirmation_token: Option<ConfirmationToken>,
    reason: Option<ReasonCode>,
}

impl ShieldDecision {
    pub fn accepted(token: ConfirmationToken) -> Self {
        Self {
            admitted: true,
            accepted: true,
            confirmation_token: Some(token),
            reason: None,
        }
    }

    pub fn reverted() -> Self {
        Self {
            admitted: true,
            accepted: false,
            confirmation_token: None,
            reason: Some(ReasonCode::MarketRevert),
        }
    }

    pub fn not_admitted(reason: ReasonCode) -> Self {
        Self {
            admitted: false,
            accepted: false,
            confirmation_token: None,
            reason: Some(reason),
        }
    }

    pub fn is_admitted(&self) -> bool {
        self.admitted
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn confirmation_token(&self) -> Option<&ConfirmationToken> {
        self.confirmation_token.as_ref()
    }

    pub fn reason(&self) -> Option<ReasonCode> {
        self.reason
    }
}
