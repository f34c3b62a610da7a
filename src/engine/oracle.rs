use crate::engine::types::AccountRef;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use rust_decimal::Decimal;
use std::time::Duration;

/// Reports the funding balance of an account, in base currency units.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    async fn balance(&self, account: &AccountRef) -> Result<Decimal>;
}

/// Native balance via a single `eth_getBalance` JSON-RPC call.
#[derive(Clone)]
pub struct RpcBalanceOracle {
    http: reqwest::Client,
    rpc_url: Url,
}

impl RpcBalanceOracle {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let rpc_url = Url::parse(rpc_url).context("invalid rpc url")?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build rpc http client")?;
        Ok(Self { http, rpc_url })
    }
}

#[async_trait]
impl BalanceOracle for RpcBalanceOracle {
    async fn balance(&self, account: &AccountRef) -> Result<Decimal> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getBalance",
            "params": [account.0, "latest"]
        });

        let json: serde_json::Value = self
            .http
            .post(self.rpc_url.clone())
            .json(&payload)
            .send()
            .await
            .context("rpc request failed")?
            .error_for_status()
            .context("rpc non-200")?
            .json()
            .await
            .context("rpc json decode failed")?;

        let Some(result_hex) = json.get("result").and_then(|v| v.as_str()) else {
            let err = json
                .get("error")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            return Err(anyhow!("rpc missing result: {err}"));
        };
        wei_hex_to_decimal(result_hex)
    }
}

/// Fixed balance, or a permanently failing oracle when `None`.
#[derive(Debug, Clone)]
pub struct StaticBalanceOracle {
    balance: Option<Decimal>,
}

impl StaticBalanceOracle {
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance: Some(balance),
        }
    }

    pub fn unavailable() -> Self {
        Self { balance: None }
    }
}

#[async_trait]
impl BalanceOracle for StaticBalanceOracle {
    async fn balance(&self, account: &AccountRef) -> Result<Decimal> {
        self.balance
            .ok_or_else(|| anyhow!("no balance source for {account}"))
    }
}

fn parse_hex_u128(s: &str) -> Option<u128> {
    let hex = s.trim().trim_start_matches("0x");
    if hex.is_empty() {
        return None;
    }
    u128::from_str_radix(hex, 16).ok()
}

/// `0x`-prefixed wei quantity to an 18-decimal amount.
pub fn wei_hex_to_decimal(s: &str) -> Result<Decimal> {
    let raw = parse_hex_u128(s).with_context(|| format!("parse hex quantity failed: {s}"))?;
    let raw = i128::try_from(raw).with_context(|| format!("wei quantity out of range: {s}"))?;
    Decimal::try_from_i128_with_scale(raw, 18)
        .map(|d| d.normalize())
        .with_context(|| format!("wei quantity out of range: {s}"))
}
