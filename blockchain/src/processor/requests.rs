//! Request generations
//!
//! Mỗi loại tác vụ bất đồng bộ (transfer, tải số dư, báo giá) có một bộ đếm.
//! Bắt đầu tác vụ mới lấy id mới; kết quả chỉ được ghi vào state nếu id của
//! nó vẫn là id mới nhất. Kết quả cũ bị bỏ qua.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RequestCounter {
    latest: AtomicU64,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier one
    pub fn next(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, id: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == id
    }

    /// Supersede every outstanding request without starting a new one
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counters for every kind of async work the orchestrator starts
#[derive(Debug, Default)]
pub struct RequestTracker {
    pub attempts: RequestCounter,
    pub balances: RequestCounter,
    pub quotes: RequestCounter,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }
}
