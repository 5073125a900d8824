//! Luồng xử lý chuyển token: gating, prompt, request generations, VAA lookup
//! và bộ điều phối chính.

pub mod bridge_orchestrator;
pub mod gating;
pub mod prompt;
pub mod requests;
pub mod wormhole;
