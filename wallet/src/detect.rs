//! Nhận diện tên ví từ các cờ mà provider công bố (isMetaMask, isCoinbaseWallet, ...)

use serde::{Deserialize, Serialize};

/// Identity flags an injected provider advertises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderFlags {
    pub is_metamask: bool,
    pub is_coinbase_wallet: bool,
    pub is_trust: bool,
    pub is_rabby: bool,
    pub is_brave_wallet: bool,
    pub is_frame: bool,
    pub is_wallet_connect: bool,
    pub is_exodus: bool,
}

/// Display name of the wallet behind a provider.
///
/// Brave and Rabby also set `is_metamask` for compatibility, so they are
/// checked first.
pub fn detect_wallet_name(flags: &ProviderFlags) -> &'static str {
    if flags.is_brave_wallet {
        "Brave Wallet"
    } else if flags.is_rabby {
        "Rabby Wallet"
    } else if flags.is_coinbase_wallet {
        "Coinbase Wallet"
    } else if flags.is_wallet_connect {
        "WalletConnect"
    } else if flags.is_trust {
        "Trust Wallet"
    } else if flags.is_frame {
        "Frame"
    } else if flags.is_exodus {
        "Exodus"
    } else if flags.is_metamask {
        "MetaMask"
    } else {
        "Web3 Wallet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_order() {
        let metamask = ProviderFlags { is_metamask: true, ..Default::default() };
        assert_eq!(detect_wallet_name(&metamask), "MetaMask");

        let brave = ProviderFlags { is_metamask: true, is_brave_wallet: true, ..Default::default() };
        assert_eq!(detect_wallet_name(&brave), "Brave Wallet");

        let rabby = ProviderFlags { is_metamask: true, is_rabby: true, ..Default::default() };
        assert_eq!(detect_wallet_name(&rabby), "Rabby Wallet");

        let exodus = ProviderFlags { is_exodus: true, ..Default::default() };
        assert_eq!(detect_wallet_name(&exodus), "Exodus");

        assert_eq!(detect_wallet_name(&ProviderFlags::default()), "Web3 Wallet");
    }
}
