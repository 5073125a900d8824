//! Bridge SDK implementations

pub mod abi;
pub mod token_bridge;
