use crate::engine::session::Resolution;
use crate::engine::types::{ShieldDecision, TradeIntent, UserId};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMode {
    Manual,
    Autopilot,
}

#[derive(Debug, Serialize)]
struct DecisionRecord<'a> {
    ts: DateTime<Utc>,
    user: UserId,
    mode: DecisionMode,
    prediction: String,
    intent: &'a TradeIntent,
    decision: &'a ShieldDecision,
}

/// Append-only JSONL audit of resolved decisions. Writes happen on a
/// background task; `record` never blocks and never fails the caller.
/// The writer task ends once every clone of the journal is dropped.
#[derive(Clone)]
pub struct DecisionJournal {
    tx: mpsc::UnboundedSender<String>,
}

impl DecisionJournal {
    pub async fn open(path: impl Into<PathBuf>) -> Result<(Self, JoinHandle<()>)> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create journal dir {}", parent.display()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("open journal {}", path.display()))?;

        let (journal, mut rx) = Self::channel();
        let writer = tokio::spawn(async move {
            while let Some(mut line) = rx.recv().await {
                line.push('\n');
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    tracing::error!(path = %path.display(), err = %e, "journal write failed");
                    return;
                }
            }
            if let Err(e) = file.flush().await {
                tracing::error!(path = %path.display(), err = %e, "journal flush failed");
            }
        });
        Ok((journal, writer))
    }

    /// Journal whose lines go to the returned receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn record(&self, user: UserId, mode: DecisionMode, res: &Resolution) {
        let rec = DecisionRecord {
            ts: Utc::now(),
            user,
            mode,
            prediction: res.intent.prediction_label(),
            intent: &res.intent,
            decision: &res.decision,
        };
        let line = match serde_json::to_string(&rec) {
            Ok(line) => line,
            Err(e) => {
                warn!(user, err = %e, "journal record not serializable");
                return;
            }
        };
        if self.tx.send(line).is_err() {
            warn!(user, "journal writer gone, record dropped");
        }
    }
}
