use crate::engine::types::UserId;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub callback: String,
}

impl Button {
    pub fn new(label: impl Into<String>, callback: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback: callback.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons attached to the message; pressing one sends its callback.
    Inline(Vec<Vec<Button>>),
    /// Persistent quick-reply keys; pressing one sends its label as text.
    Reply(Vec<Vec<String>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub markdown: bool,
    pub keyboard: Option<Keyboard>,
}

impl Notice {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
            keyboard: None,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: true,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// One-way display channel back to the user.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user: UserId, notice: Notice) -> Result<()>;
}

/// Prints notices to stdout, one block per notice.
pub struct ConsoleSink {
    out: Mutex<tokio::io::Stdout>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

fn render_console(user: UserId, notice: &Notice) -> String {
    let mut block = String::new();
    for line in notice.text.lines() {
        block.push_str(&format!("[{user}] {line}\n"));
    }
    match &notice.keyboard {
        Some(Keyboard::Inline(rows)) => {
            for row in rows {
                let cells: Vec<String> = row
                    .iter()
                    .map(|b| format!("[{} -> cb:{}]", b.label, b.callback))
                    .collect();
                block.push_str(&format!("[{user}]   {}\n", cells.join(" ")));
            }
        }
        Some(Keyboard::Reply(rows)) => {
            for row in rows {
                block.push_str(&format!("[{user}]   ({})\n", row.join(" | ")));
            }
        }
        None => {}
    }
    block
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn notify(&self, user: UserId, notice: Notice) -> Result<()> {
        let block = render_console(user, &notice);
        let mut out = self.out.lock().await;
        out.write_all(block.as_bytes())
            .await
            .context("stdout write failed")?;
        out.flush().await.context("stdout flush failed")?;
        Ok(())
    }
}

/// Keeps every notice in memory, in delivery order.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Vec<(UserId, Notice)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn notices(&self) -> Vec<(UserId, Notice)> {
        self.inner.lock().await.clone()
    }

    pub async fn texts_for(&self, user: UserId) -> Vec<String> {
        self.inner
            .lock()
            .await
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, n)| n.text.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn notify(&self, user: UserId, notice: Notice) -> Result<()> {
        self.inner.lock().await.push((user, notice));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_block_lists_buttons() {
        let notice = Notice::markdown("pick one\nnow").with_keyboard(Keyboard::Inline(vec![vec![
            Button::new("UP", "exec_up"),
            Button::new("DOWN", "exec_down"),
        ]]));
        let block = render_console(7, &notice);
        assert_eq!(
            block,
            "[7] pick one\n[7] now\n[7]   [UP -> cb:exec_up] [DOWN -> cb:exec_down]\n"
        );
    }

    #[tokio::test]
    async fn memory_sink_filters_by_user() {
        let sink = MemorySink::new();
        sink.notify(1, Notice::plain("a")).await.unwrap();
        sink.notify(2, Notice::plain("b")).await.unwrap();
        sink.notify(1, Notice::plain("c")).await.unwrap();
        assert_eq!(sink.texts_for(1).await, vec!["a", "c"]);
        assert_eq!(sink.notices().await.len(), 3);
    }
}
