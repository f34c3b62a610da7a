use anyhow::{anyhow, ensure, Result};
use rust_decimal::Decimal;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Decision-engine knobs. Delays are presentation pacing only.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minimum funding balance for admission (default: 0.01)
    pub minimum_threshold: Decimal,
    /// Chance that a simulation reverts (default: 0.15)
    pub revert_probability: f64,
    /// Synthetic intents per autopilot run (default: 2)
    pub autopilot_steps: u32,
    /// Pause before each autopilot step (default: 3000)
    pub step_delay_ms: u64,
    /// Pause between "simulating" and the verdict (default: 2000)
    pub resolution_delay_ms: u64,
    /// Nominal stake attached to every intent (default: 100)
    pub nominal_stake: Decimal,
    /// Fixed RNG seed; entropy when unset
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            minimum_threshold: Decimal::new(1, 2),
            revert_probability: 0.15,
            autopilot_steps: 2,
            step_delay_ms: 3000,
            resolution_delay_ms: 2000,
            nominal_stake: Decimal::new(100, 0),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        let cfg = Self {
            minimum_threshold: parsed(&get, "SHIELD_MIN_BALANCE", d.minimum_threshold)?,
            revert_probability: parsed(&get, "SHIELD_REVERT_PROBABILITY", d.revert_probability)?,
            autopilot_steps: parsed(&get, "SHIELD_AUTOPILOT_STEPS", d.autopilot_steps)?,
            step_delay_ms: parsed(&get, "SHIELD_STEP_DELAY_MS", d.step_delay_ms)?,
            resolution_delay_ms: parsed(&get, "SHIELD_RESOLUTION_DELAY_MS", d.resolution_delay_ms)?,
            nominal_stake: parsed(&get, "SHIELD_NOMINAL_STAKE", d.nominal_stake)?,
            seed: optional(&get, "SHIELD_SEED")?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.minimum_threshold >= Decimal::ZERO,
            "SHIELD_MIN_BALANCE must be non-negative, got {}",
            self.minimum_threshold
        );
        ensure!(
            (0.0..1.0).contains(&self.revert_probability),
            "SHIELD_REVERT_PROBABILITY must be in [0, 1), got {}",
            self.revert_probability
        );
        ensure!(self.autopilot_steps > 0, "SHIELD_AUTOPILOT_STEPS must be positive");
        ensure!(
            self.nominal_stake > Decimal::ZERO,
            "SHIELD_NOMINAL_STAKE must be positive, got {}",
            self.nominal_stake
        );
        Ok(())
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn resolution_delay(&self) -> Duration {
        Duration::from_millis(self.resolution_delay_ms)
    }
}

/// Where balances come from and where decisions are journaled.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub rpc_url: String,
    /// Vault to query over RPC; a static balance is used when unset.
    pub vault_address: Option<String>,
    pub static_balance: Decimal,
    pub journal_file: Option<String>,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let static_balance: Decimal = parsed(&get, "SHIELD_STATIC_BALANCE", Decimal::ZERO)?;
        ensure!(
            static_balance >= Decimal::ZERO,
            "SHIELD_STATIC_BALANCE must be non-negative, got {static_balance}"
        );
        Ok(Self {
            rpc_url: non_empty("SHIELD_RPC_URL")
                .unwrap_or_else(|| "https://polygon-rpc.com".to_string()),
            vault_address: non_empty("SHIELD_VAULT_ADDRESS"),
            static_balance,
            journal_file: non_empty("SHIELD_JOURNAL_FILE"),
        })
    }
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(optional(get, key)?.unwrap_or(default))
}

fn optional<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| anyhow!("invalid {key}={raw}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.minimum_threshold, Decimal::new(1, 2));
        assert_eq!(cfg.autopilot_steps, 2);
        assert!((cfg.revert_probability - 0.15).abs() < 1e-12);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("SHIELD_MIN_BALANCE", "0.5"),
            ("SHIELD_REVERT_PROBABILITY", "0.3"),
            ("SHIELD_AUTOPILOT_STEPS", "4"),
            ("SHIELD_STEP_DELAY_MS", "0"),
            ("SHIELD_SEED", "99"),
        ]))
        .unwrap();
        assert_eq!(cfg.minimum_threshold, Decimal::new(5, 1));
        assert_eq!(cfg.autopilot_steps, 4);
        assert_eq!(cfg.step_delay(), Duration::ZERO);
        assert_eq!(cfg.seed, Some(99));
    }

    #[test]
    fn garbage_value_is_an_error() {
        let err = EngineConfig::from_lookup(lookup(&[("SHIELD_AUTOPILOT_STEPS", "two")]))
            .unwrap_err();
        assert!(err.to_string().contains("SHIELD_AUTOPILOT_STEPS"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let certain_revert = lookup(&[("SHIELD_REVERT_PROBABILITY", "1.0")]);
        assert!(EngineConfig::from_lookup(certain_revert).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("SHIELD_AUTOPILOT_STEPS", "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("SHIELD_MIN_BALANCE", "-1")])).is_err());
    }

    #[test]
    fn runtime_defaults_to_static_oracle() {
        let rt = RuntimeConfig::from_lookup(lookup(&[("SHIELD_VAULT_ADDRESS", "  ")])).unwrap();
        assert_eq!(rt.vault_address, None);
        assert_eq!(rt.static_balance, Decimal::ZERO);
        assert_eq!(rt.rpc_url, "https://polygon-rpc.com");
        assert_eq!(rt.journal_file, None);
    }
}
