use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Hands out promise ids. Only used in diagnostics.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromiseState {
    Pending,
    Failed,
    Succeeded,
}

impl PromiseState {
    pub fn is_settled(self) -> bool {
        self != PromiseState::Pending
    }
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PromiseState::Pending => "pending",
            PromiseState::Failed => "failed",
            PromiseState::Succeeded => "succeeded",
        })
    }
}
