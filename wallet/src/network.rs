//! Chuyển mạng cho ví: switch trước, nếu ví chưa biết chain (4902) thì add rồi switch lại.

use common::ChainDescriptor;
use tracing::{info, warn};

use crate::error::{Result, WalletError, UNRECOGNIZED_CHAIN};
use crate::provider::WalletProvider;

/// Ask the wallet to make `descriptor` its active chain.
///
/// Errors are already user-facing: `AddChainFailed` when the wallet refused
/// to add the chain, `SwitchFailed` for anything else.
pub async fn switch_network(provider: &dyn WalletProvider, descriptor: &ChainDescriptor) -> Result<()> {
    match provider.switch_chain(&descriptor.chain_id).await {
        Ok(()) => {
            info!("Switched wallet to {} ({})", descriptor.name, descriptor.chain_id);
            Ok(())
        }
        Err(e) if e.code() == Some(UNRECOGNIZED_CHAIN) => {
            info!("{} is not known to the wallet, adding it", descriptor.name);
            provider
                .add_chain(descriptor.add_chain_params())
                .await
                .map_err(|err| {
                    warn!("wallet_addEthereumChain for {} failed: {}", descriptor.name, err);
                    WalletError::AddChainFailed(descriptor.name.clone())
                })?;
            provider.switch_chain(&descriptor.chain_id).await.map_err(|err| {
                warn!("Switch to {} after adding it failed: {}", descriptor.name, err);
                WalletError::SwitchFailed
            })
        }
        Err(e) => {
            warn!("wallet_switchEthereumChain to {} failed: {}", descriptor.name, e);
            Err(WalletError::SwitchFailed)
        }
    }
}
