//! Shield Console - line-driven front-end for the decision engine
//!
//! Reads one event per line from stdin and prints notices to stdout:
//!   <user> /start | /manual | /autopilot | /stop
//!   <user> cb:<callback>      (button press, e.g. `42 cb:exec_up`)
//!   <user> <free text>
//!
//! Usage:
//!   cargo run --bin shield_console
//!   RUST_LOG=info SHIELD_STATIC_BALANCE=1 cargo run --bin shield_console

use anyhow::{Context, Result};
use atomic_shield::engine::{
    config::{EngineConfig, RuntimeConfig},
    events::Inbound,
    journal::DecisionJournal,
    notify::ConsoleSink,
    oracle::{BalanceOracle, RpcBalanceOracle, StaticBalanceOracle},
    router::Router,
    types::AccountRef,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = EngineConfig::from_env().context("load engine config")?;
    let rt = RuntimeConfig::from_env().context("load runtime config")?;

    let (account, oracle): (AccountRef, Arc<dyn BalanceOracle>) = match &rt.vault_address {
        Some(addr) => (
            AccountRef::new(addr.as_str()),
            Arc::new(RpcBalanceOracle::new(&rt.rpc_url)?),
        ),
        None => (
            AccountRef::new("demo-vault"),
            Arc::new(StaticBalanceOracle::new(rt.static_balance)),
        ),
    };
    info!(
        account = %account,
        rpc = rt.vault_address.is_some(),
        min_balance = %cfg.minimum_threshold,
        revert_probability = cfg.revert_probability,
        autopilot_steps = cfg.autopilot_steps,
        "shield console starting"
    );

    let mut router = Router::from_config(cfg, account, oracle, Arc::new(ConsoleSink::new()));
    let mut journal_writer = None;
    if let Some(path) = &rt.journal_file {
        let (journal, writer) = DecisionJournal::open(path.as_str())
            .await
            .context("open decision journal")?;
        info!(path = %path, "decision journal enabled");
        router = router.with_journal(journal);
        journal_writer = Some(writer);
    }
    let router = Arc::new(router);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
                tasks.abort_all();
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("stdin read failed")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match Inbound::parse_line(&line) {
                    Ok(inbound) => {
                        let router = Arc::clone(&router);
                        tasks.spawn(async move { router.handle(inbound).await });
                    }
                    Err(e) => warn!(err = %e, "skipping input line"),
                }
            }
            Some(done) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = done {
                    warn!(err = %e, "event task failed");
                }
            }
        }
    }

    // On EOF in-flight decisions finish; after ctrl-c they were aborted.
    while let Some(done) = tasks.join_next().await {
        if let Err(e) = done {
            if !e.is_cancelled() {
                warn!(err = %e, "event task failed");
            }
        }
    }

    // Last journal handle goes with the router; the writer then drains and exits.
    drop(router);
    if let Some(writer) = journal_writer {
        if let Err(e) = writer.await {
            warn!(err = %e, "journal writer failed");
        }
    }
    Ok(())
}
