//! Bridge transfer request
//!
//! This module defines the `TransferRequest` struct: everything the token
//! bridge needs to move an amount of a token from a sender on one chain to a
//! recipient on another.

use serde::{Serialize, Deserialize};
use std::fmt;

use super::chain::Chain;

/// A transfer as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Source blockchain
    pub source_chain: Chain,

    /// Target blockchain
    pub target_chain: Chain,

    /// Token symbol, e.g. `USDC`
    pub token: String,

    /// Decimal amount in whole-token units, as typed by the user
    pub amount: String,

    /// Receiver address on the target chain
    pub recipient: String,

    /// Connected wallet address on the source chain
    pub sender: String,
}

impl TransferRequest {
    /// Create a new transfer request
    pub fn new(
        source_chain: Chain,
        target_chain: Chain,
        token: impl Into<String>,
        amount: impl Into<String>,
        recipient: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            source_chain,
            target_chain,
            token: token.into(),
            amount: amount.into(),
            recipient: recipient.into(),
            sender: sender.into(),
        }
    }

    /// All fields a quote depends on are filled in
    pub fn is_quotable(&self) -> bool {
        !self.amount.trim().is_empty()
            && !self.recipient.trim().is_empty()
            && !self.sender.trim().is_empty()
    }

    /// Wormhole chain id of the destination
    pub fn recipient_chain_id(&self) -> u16 {
        self.target_chain.to_wormhole_id()
    }
}

impl fmt::Display for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} from {} to {} (recipient {})",
            self.amount, self.token, self.source_chain, self.target_chain, self.recipient
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotable_requires_amount_recipient_and_sender() {
        let mut request = TransferRequest::new(
            Chain::Ethereum,
            Chain::Arbitrum,
            "USDC",
            "10",
            "0x000000000000000000000000000000000000dEaD",
            "0x1111111111111111111111111111111111111111",
        );
        assert!(request.is_quotable());
        assert_eq!(request.recipient_chain_id(), 23);

        request.recipient = "  ".into();
        assert!(!request.is_quotable());
    }

    #[test]
    fn test_display() {
        let request = TransferRequest::new(Chain::Bsc, Chain::Polygon, "USDT", "5", "0xr", "0xs");
        assert_eq!(request.to_string(), "5 USDT from bsc to polygon (recipient 0xr)");
    }
}
