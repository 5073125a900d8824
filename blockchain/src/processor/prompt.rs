//! User confirmations
//!
//! The orchestrator asks before it switches networks or submits a transfer,
//! and tells the user when an approval has been mined. `ChannelPrompter`
//! forwards those prompts to whatever front end drains its receiver.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Question that needs a yes/no answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    SwitchNetwork { chain_name: String, purpose: String },
    ConfirmTransfer { summary: String },
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwitchNetwork { chain_name, purpose } => {
                write!(f, "Please switch to {} network to {}.", chain_name, purpose)
            }
            Self::ConfirmTransfer { summary } => write!(f, "{}", summary),
        }
    }
}

/// One-way information for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ApprovalConfirmed { tx_hash: String, explorer_url: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApprovalConfirmed { tx_hash, explorer_url } => write!(
                f,
                "Token approval confirmed! You can now proceed with the transfer. Transaction: {} ({})",
                tx_hash, explorer_url
            ),
        }
    }
}

#[async_trait]
pub trait Prompter: Send + Sync + 'static {
    /// `true` when the user accepts
    async fn confirm(&self, prompt: &Prompt) -> bool;

    async fn notify(&self, _notice: &Notice) {}
}

/// A pending question; answer it with `accept` or `decline`
#[derive(Debug)]
pub struct PromptRequest {
    pub prompt: Prompt,
    reply: oneshot::Sender<bool>,
}

impl PromptRequest {
    pub fn accept(self) {
        let _ = self.reply.send(true);
    }

    pub fn decline(self) {
        let _ = self.reply.send(false);
    }

    pub fn answer(self, accepted: bool) {
        let _ = self.reply.send(accepted);
    }
}

#[derive(Debug)]
pub enum PromptEvent {
    Confirm(PromptRequest),
    Notice(Notice),
}

/// Prompter backed by an mpsc channel
#[derive(Clone)]
pub struct ChannelPrompter {
    tx: mpsc::Sender<PromptEvent>,
}

impl ChannelPrompter {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<PromptEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Prompter for ChannelPrompter {
    async fn confirm(&self, prompt: &Prompt) -> bool {
        let (reply, answer) = oneshot::channel();
        let request = PromptRequest { prompt: prompt.clone(), reply };
        if self.tx.send(PromptEvent::Confirm(request)).await.is_err() {
            warn!("No one is listening for prompts, treating as declined");
            return false;
        }
        // người dùng đóng prompt mà không trả lời = từ chối
        answer.await.unwrap_or(false)
    }

    async fn notify(&self, notice: &Notice) {
        let _ = self.tx.send(PromptEvent::Notice(notice.clone())).await;
    }
}
