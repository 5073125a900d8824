//! # Bridge Types Module
//!
//! Định nghĩa các kiểu dữ liệu và traits dùng chung cho luồng chuyển token
//! qua Wormhole Token Bridge giữa các mạng EVM.

pub mod chain;
pub mod status;
pub mod transaction;
pub mod types;
pub mod providers;

pub use chain::{parse_chain_id, Chain, ChainDescriptor, ChainRegistry, NativeCurrency};
pub use status::{TransferStatus, TransferStep, COMPLETED_MESSAGE, TOTAL_TRANSFER_STEPS};
pub use transaction::TransferRequest;
pub use types::{
    default_token_descriptors, AttestationKey, AttestationLookup, BridgeQuote, SupportedToken,
    TokenDeployment, TokenDescriptor, TransferReceipt,
};
pub use providers::{AttestationSource, BridgeSdk, ProgressReporter, TransactionCall, TransactionSigner};

/// Cross-chain token transfers through the Wormhole Token Bridge.
///
/// The bridge system consists of:
/// * `Chain` / `ChainRegistry` - Supported EVM networks and their configuration
/// * `TokenDescriptor` - Bridgeable tokens and their per-chain deployments
/// * `TransferStatus` - Four-step progress of a single transfer attempt
/// * `BridgeSdk` - Chain reads and writes against the token bridge contracts
/// * `AttestationSource` - Lookup of signed VAAs from a Wormhole indexer
pub struct BridgeDocs;
