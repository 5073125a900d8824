//! Transfer status state machine
//!
//! A `TransferStatus` tracks one transfer attempt through four ordered steps:
//! preparation, source-chain submission, waiting for guardian signatures and
//! completion on the target chain. Steps only move forward, and once a status
//! is completed or carries an error it no longer changes.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use std::fmt;

use super::chain::Chain;

/// Number of steps in a transfer
pub const TOTAL_TRANSFER_STEPS: u8 = 4;

/// Ordered milestones of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransferStep {
    /// Request built, nothing on chain yet
    Preparing = 1,
    /// Source-chain transaction confirmed, sequence known
    Submitted = 2,
    /// Waiting for the guardian network to sign the VAA
    AwaitingAttestation = 3,
    /// VAA obtained, completing on the target chain
    Ready = 4,
}

impl TransferStep {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::Preparing),
            2 => Some(Self::Submitted),
            3 => Some(Self::AwaitingAttestation),
            4 => Some(Self::Ready),
            _ => None,
        }
    }

    /// Message shown when the orchestrator itself enters this step
    pub fn default_message(self) -> &'static str {
        match self {
            Self::Preparing => "Preparing transfer...",
            Self::Submitted => "Transaction confirmed on source chain",
            Self::AwaitingAttestation => "Waiting for Guardian signatures...",
            Self::Ready => "VAA ready, completing on target chain...",
        }
    }
}

/// Message of a completed transfer
pub const COMPLETED_MESSAGE: &str = "Transfer completed successfully!";

/// Progress of a single transfer attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferStatus {
    /// Identifier of the attempt that owns this status
    pub attempt: u64,
    pub source_chain: Chain,
    pub target_chain: Chain,
    pub step: u8,
    pub total_steps: u8,
    pub message: String,
    pub tx_hash: Option<String>,
    pub sequence: Option<String>,
    /// 32-byte hex emitter address (the source token bridge)
    pub emitter: Option<String>,
    /// Base64 signed VAA once the guardians have produced it
    pub vaa: Option<String>,
    pub completed: bool,
    pub error: Option<String>,
    /// False when completion was assumed after a delay rather than observed
    pub settlement_verified: bool,
    pub started_at: DateTime<Utc>,
}

impl TransferStatus {
    pub fn new(attempt: u64, source_chain: Chain, target_chain: Chain) -> Self {
        Self {
            attempt,
            source_chain,
            target_chain,
            step: TransferStep::Preparing.index(),
            total_steps: TOTAL_TRANSFER_STEPS,
            message: TransferStep::Preparing.default_message().to_string(),
            tx_hash: None,
            sequence: None,
            emitter: None,
            vaa: None,
            completed: false,
            error: None,
            settlement_verified: false,
            started_at: Utc::now(),
        }
    }

    /// Completed or failed
    pub fn is_terminal(&self) -> bool {
        self.completed || self.error.is_some()
    }

    pub fn current_step(&self) -> Option<TransferStep> {
        TransferStep::from_index(self.step)
    }

    /// Move to `step` with a new message.
    ///
    /// Returns `false` and leaves the status untouched when the status is
    /// terminal, the step is out of range or lower than the current one.
    /// Re-reporting the current step only updates the message.
    pub fn advance(&mut self, step: u8, message: impl Into<String>) -> bool {
        if self.is_terminal() || step == 0 || step > self.total_steps || step < self.step {
            return false;
        }
        self.step = step;
        self.message = message.into();
        true
    }

    /// Record the confirmed source-chain transaction (step 2)
    pub fn record_submission(
        &mut self,
        tx_hash: impl Into<String>,
        sequence: impl Into<String>,
        emitter: Option<String>,
    ) -> bool {
        if !self.advance(
            TransferStep::Submitted.index(),
            TransferStep::Submitted.default_message(),
        ) {
            return false;
        }
        self.tx_hash = Some(tx_hash.into());
        self.sequence = Some(sequence.into());
        self.emitter = emitter;
        true
    }

    /// Record the signed VAA (step 4)
    pub fn record_attestation(&mut self, vaa: impl Into<String>) -> bool {
        if !self.advance(TransferStep::Ready.index(), TransferStep::Ready.default_message()) {
            return false;
        }
        self.vaa = Some(vaa.into());
        true
    }

    /// Mark the transfer completed. Only valid from step 4.
    pub fn complete(&mut self, verified: bool) -> bool {
        if self.is_terminal() || self.step != TransferStep::Ready.index() {
            return false;
        }
        self.message = COMPLETED_MESSAGE.to_string();
        self.completed = true;
        self.settlement_verified = verified;
        true
    }

    /// Mark the transfer failed, keeping the step it failed at
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.error = Some(error.into());
        true
    }

    /// Resumable: submitted on chain, waiting for guardians, not terminal
    pub fn awaiting_attestation(&self) -> bool {
        !self.is_terminal()
            && self.step >= TransferStep::Submitted.index()
            && self.step < TransferStep::Ready.index()
            && self.tx_hash.is_some()
            && self.sequence.is_some()
    }

    /// Percentage for a progress bar
    pub fn progress_percent(&self) -> f64 {
        f64::from(self.step) / f64::from(self.total_steps) * 100.0
    }

    /// `0x12345678...abcdef` form used in status lines
    pub fn short_tx_hash(&self) -> Option<String> {
        self.tx_hash.as_deref().map(shorten_hash)
    }
}

fn shorten_hash(hash: &str) -> String {
    if hash.len() <= 16 || !hash.is_ascii() {
        return hash.to_string();
    }
    format!("{}...{}", &hash[..10], &hash[hash.len() - 6..])
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.step, self.total_steps, self.message)?;
        if let Some(error) = &self.error {
            write!(f, " (error: {})", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> TransferStatus {
        TransferStatus::new(1, Chain::Ethereum, Chain::Polygon)
    }

    #[test]
    fn test_new_status_is_preparing() {
        let s = status();
        assert_eq!(s.step, 1);
        assert_eq!(s.total_steps, 4);
        assert_eq!(s.message, "Preparing transfer...");
        assert!(!s.is_terminal());
        assert_eq!(s.current_step(), Some(TransferStep::Preparing));
    }

    #[test]
    fn test_steps_never_go_backwards() {
        let mut s = status();
        assert!(s.record_submission("0xabc", "42", None));
        assert!(s.advance(3, "Waiting for Guardian signatures..."));
        assert!(!s.advance(2, "late callback"));
        assert_eq!(s.step, 3);
        assert_eq!(s.message, "Waiting for Guardian signatures...");
        assert!(!s.advance(5, "out of range"));
        assert!(!s.advance(0, "out of range"));
    }

    #[test]
    fn test_terminal_status_is_frozen() {
        let mut s = status();
        assert!(s.fail("Transfer failed: rejected"));
        assert!(s.is_terminal());
        assert!(!s.advance(2, "ignored"));
        assert!(!s.fail("second error"));
        assert_eq!(s.error.as_deref(), Some("Transfer failed: rejected"));
    }

    #[test]
    fn test_completion_requires_ready_step() {
        let mut s = status();
        assert!(!s.complete(false));
        s.record_submission("0xabc", "7", Some("00".repeat(32)));
        s.advance(3, TransferStep::AwaitingAttestation.default_message());
        assert!(s.awaiting_attestation());
        assert!(s.record_attestation("AQAAAA=="));
        assert!(!s.awaiting_attestation());
        assert!(s.complete(false));
        assert!(s.completed);
        assert!(!s.settlement_verified);
        assert_eq!(s.message, COMPLETED_MESSAGE);
        assert_eq!(s.progress_percent(), 100.0);
    }

    #[test]
    fn test_short_tx_hash() {
        let mut s = status();
        assert_eq!(s.short_tx_hash(), None);
        s.record_submission(
            "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef",
            "1",
            None,
        );
        assert_eq!(s.short_tx_hash().as_deref(), Some("0x12345678...abcdef"));
        assert_eq!(s.to_string(), "[2/4] Transaction confirmed on source chain");
    }
}
