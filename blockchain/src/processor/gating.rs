//! Transfer gating
//!
//! Pure evaluation of which primary action the transfer form offers
//! (connect, approve or transfer), whether it is enabled and which warnings
//! to show. Amounts are compared as decimals, never as floats.

use common::ChainDescriptor;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Length of a `0x`-prefixed EVM address
pub const ADDRESS_LENGTH: usize = 42;

/// Everything gating depends on
#[derive(Debug, Clone)]
pub struct GateInput<'a> {
    pub connected: bool,
    pub amount: &'a str,
    pub recipient: &'a str,
    pub balance: &'a str,
    pub allowance: &'a str,
    pub token: &'a str,
    pub source: &'a ChainDescriptor,
    /// Chain id the wallet is currently on
    pub active_chain_id: Option<&'a str>,
    pub balance_loading: bool,
    pub approving: bool,
    pub transferring: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Connect,
    Approve,
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateWarning {
    InsufficientBalance { available: String, token: String },
    InvalidRecipient,
    WrongNetwork { chain_name: String },
}

impl fmt::Display for GateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBalance { available, token } => {
                write!(f, "Insufficient balance. Available: {} {}", available, token)
            }
            Self::InvalidRecipient => write!(f, "Invalid Ethereum address format"),
            Self::WrongNetwork { chain_name } => write!(f, "Please switch to {} network", chain_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    pub action: PrimaryAction,
    pub enabled: bool,
    pub valid_amount: bool,
    pub valid_recipient: bool,
    pub enough_balance: bool,
    pub correct_network: bool,
    pub needs_approval: bool,
    pub warnings: Vec<GateWarning>,
}

impl GateReport {
    pub fn can_transfer(&self) -> bool {
        self.action == PrimaryAction::Transfer && self.enabled
    }

    pub fn can_approve(&self) -> bool {
        self.action == PrimaryAction::Approve && self.enabled
    }

    pub fn has_warning(&self, warning: &GateWarning) -> bool {
        self.warnings.contains(warning)
    }
}

/// Parse a user-entered decimal amount. Empty or malformed input gives `None`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw).ok()
}

pub fn is_valid_recipient(recipient: &str) -> bool {
    recipient.len() == ADDRESS_LENGTH && recipient.starts_with("0x")
}

/// 99% of the balance, leaving headroom for rounding
pub fn max_transfer_amount(balance: &str) -> String {
    let balance = parse_amount(balance).unwrap_or(Decimal::ZERO).max(Decimal::ZERO);
    (balance * Decimal::new(99, 2)).normalize().to_string()
}

pub fn evaluate(input: &GateInput<'_>) -> GateReport {
    let amount = parse_amount(input.amount);
    let balance = parse_amount(input.balance).unwrap_or(Decimal::ZERO);
    let allowance = parse_amount(input.allowance).unwrap_or(Decimal::ZERO);

    let valid_amount = amount.map_or(false, |a| a > Decimal::ZERO);
    let valid_recipient = is_valid_recipient(input.recipient);
    let enough_balance = match amount {
        Some(a) => balance >= a,
        // rỗng = 0, sai định dạng thì không báo thiếu số dư
        None => true,
    };
    let correct_network = input
        .active_chain_id
        .map_or(false, |id| input.source.matches_chain_id(id));
    let needs_approval = match amount {
        Some(a) if valid_amount => a > allowance,
        _ => false,
    };

    let mut warnings = Vec::new();
    if !enough_balance {
        warnings.push(GateWarning::InsufficientBalance {
            available: format!("{:.4}", balance),
            token: input.token.to_string(),
        });
    }
    if !valid_recipient {
        warnings.push(GateWarning::InvalidRecipient);
    }
    if input.connected && !correct_network {
        warnings.push(GateWarning::WrongNetwork { chain_name: input.source.name.clone() });
    }

    let (action, enabled) = if !input.connected {
        (PrimaryAction::Connect, true)
    } else if needs_approval && enough_balance {
        (
            PrimaryAction::Approve,
            correct_network && !input.approving && !input.transferring,
        )
    } else {
        (
            PrimaryAction::Transfer,
            valid_amount
                && valid_recipient
                && enough_balance
                && correct_network
                && !needs_approval
                && !input.balance_loading
                && !input.approving
                && !input.transferring,
        )
    };

    GateReport {
        action,
        enabled,
        valid_amount,
        valid_recipient,
        enough_balance,
        correct_network,
        needs_approval,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Chain;

    const RECIPIENT: &str = "0x000000000000000000000000000000000000dEaD";

    fn input<'a>(source: &'a ChainDescriptor, amount: &'a str) -> GateInput<'a> {
        GateInput {
            connected: true,
            amount,
            recipient: RECIPIENT,
            balance: "150",
            allowance: "200",
            token: "USDC",
            source,
            active_chain_id: Some("0x1"),
            balance_loading: false,
            approving: false,
            transferring: false,
        }
    }

    #[test]
    fn test_happy_path_enables_transfer() {
        let eth = Chain::Ethereum.descriptor();
        let report = evaluate(&input(&eth, "100"));
        assert!(report.can_transfer());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_non_positive_amounts_disable_transfer() {
        let eth = Chain::Ethereum.descriptor();
        for amount in ["", "0", "-1", "0.000", "abc"] {
            let report = evaluate(&input(&eth, amount));
            assert!(!report.valid_amount, "amount {:?}", amount);
            assert!(!report.enabled, "amount {:?}", amount);
        }
    }

    #[test]
    fn test_recipient_format() {
        let eth = Chain::Ethereum.descriptor();
        for recipient in ["", "0x123", "1x000000000000000000000000000000000000dEaD", "0x000000000000000000000000000000000000dEaD0"] {
            let mut gate = input(&eth, "10");
            gate.recipient = recipient;
            let report = evaluate(&gate);
            assert!(!report.enabled);
            assert!(report.has_warning(&GateWarning::InvalidRecipient), "recipient {:?}", recipient);
        }
    }

    #[test]
    fn test_insufficient_balance_warning() {
        let eth = Chain::Ethereum.descriptor();
        let mut gate = input(&eth, "100");
        gate.balance = "50";
        let report = evaluate(&gate);
        assert!(!report.enough_balance);
        assert_eq!(report.action, PrimaryAction::Transfer);
        assert!(!report.enabled);
        assert_eq!(
            report.warnings[0].to_string(),
            "Insufficient balance. Available: 50.0000 USDC"
        );
    }

    #[test]
    fn test_low_allowance_offers_approve() {
        let eth = Chain::Ethereum.descriptor();
        let mut gate = input(&eth, "100");
        gate.allowance = "10";
        let report = evaluate(&gate);
        assert!(report.needs_approval);
        assert!(report.can_approve());

        gate.approving = true;
        assert!(!evaluate(&gate).enabled);
    }

    #[test]
    fn test_low_allowance_with_insufficient_balance_stays_on_transfer() {
        let eth = Chain::Ethereum.descriptor();
        let mut gate = input(&eth, "500");
        gate.allowance = "10";
        let report = evaluate(&gate);
        assert_eq!(report.action, PrimaryAction::Transfer);
        assert!(!report.enabled);
    }

    #[test]
    fn test_wrong_network_disables_both_actions() {
        let polygon = Chain::Polygon.descriptor();
        let report = evaluate(&input(&polygon, "100"));
        assert!(!report.correct_network);
        assert!(!report.enabled);
        assert!(report.has_warning(&GateWarning::WrongNetwork { chain_name: "Polygon".into() }));

        let mut gate = input(&polygon, "100");
        gate.allowance = "0";
        let report = evaluate(&gate);
        assert_eq!(report.action, PrimaryAction::Approve);
        assert!(!report.enabled);
    }

    #[test]
    fn test_busy_flags_disable_transfer() {
        let eth = Chain::Ethereum.descriptor();
        let mut gate = input(&eth, "100");
        gate.balance_loading = true;
        assert!(!evaluate(&gate).enabled);

        let mut gate = input(&eth, "100");
        gate.transferring = true;
        assert!(!evaluate(&gate).enabled);
    }

    #[test]
    fn test_disconnected_offers_connect() {
        let eth = Chain::Ethereum.descriptor();
        let mut gate = input(&eth, "100");
        gate.connected = false;
        gate.active_chain_id = None;
        let report = evaluate(&gate);
        assert_eq!(report.action, PrimaryAction::Connect);
        assert!(!report.warnings.iter().any(|w| matches!(w, GateWarning::WrongNetwork { .. })));
    }

    #[test]
    fn test_max_amount() {
        assert_eq!(max_transfer_amount("100"), "99");
        assert_eq!(max_transfer_amount("150.5"), "148.995");
        assert_eq!(max_transfer_amount("0"), "0");
        assert_eq!(max_transfer_amount("garbage"), "0");
    }
}
