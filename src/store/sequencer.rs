use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Logical queries whose results replace a whole store slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Jobs,
    Applications,
    Messages,
}

/// Issued when a query starts; only the most recently issued token per key may apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    key: QueryKey,
    seq: u64,
}

impl RequestToken {
    pub fn key(&self) -> QueryKey {
        self.key
    }
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    next: AtomicU64,
    latest: Mutex<HashMap<QueryKey, u64>>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, key: QueryKey) -> RequestToken {
        let seq = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, seq);
        RequestToken { key, seq }
    }

    /// Last requested wins: a token is current until a newer one is issued for its key.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&token.key)
            .map(|latest| *latest == token.seq)
            .unwrap_or(false)
    }
}
