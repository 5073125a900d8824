// Common library for the Wormhole bridge workspace
//
// Shared types used by the wallet and blockchain crates: the chain registry,
// token descriptors, the transfer status state machine, the collaborator
// traits the orchestrator talks to and the common error type.

pub mod bridge_types;
pub mod error;

// Re-export bridge_types để dễ dàng sử dụng
pub use bridge_types::{
    AttestationKey, AttestationLookup, AttestationSource, BridgeQuote, BridgeSdk, Chain,
    ChainDescriptor, ChainRegistry, NativeCurrency, ProgressReporter, SupportedToken,
    TokenDeployment, TokenDescriptor, TransactionCall, TransactionSigner, TransferReceipt,
    TransferRequest, TransferStatus, TransferStep, COMPLETED_MESSAGE,
};
pub use bridge_types::default_token_descriptors;
pub use error::{BridgeError, Result};
