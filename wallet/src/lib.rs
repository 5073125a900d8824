// wallet/src/lib.rs

//! Kết nối ví cho Wormhole bridge
//!
//! Quản lý phiên ví qua giao diện EIP-1193: kết nối, khôi phục phiên,
//! theo dõi sự kiện đổi tài khoản / đổi mạng, chuyển mạng và ký giao dịch.

pub use crate::config::{WalletProviderConfig, DEFAULT_WALLET_RPC_URL};
pub use crate::detect::{detect_wallet_name, ProviderFlags};
pub use crate::error::{Result, WalletError, REQUEST_PENDING, UNRECOGNIZED_CHAIN, USER_REJECTED};
pub use crate::jsonrpc::JsonRpcWalletProvider;
pub use crate::provider::{WalletEvent, WalletProvider};
pub use crate::session::{SessionChange, SessionManager, WalletSession};
pub use crate::signer::ProviderSigner;

pub mod config;
pub mod detect;
pub mod error;
pub mod jsonrpc;
pub mod network;
pub mod provider;
pub mod session;
pub mod signer;
