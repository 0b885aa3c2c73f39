use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Per-issue async locks that make mutations on one issue run one at a time.
///
/// An issue's lock lives only while a mutation holds or waits on it.
#[derive(Debug, Default)]
pub struct MutationGate {
    locks: Arc<LockMap>,
}

/// Held for the duration of one mutation.
#[derive(Debug)]
pub struct MutationPermit {
    locks: Arc<LockMap>,
    issue_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for MutationPermit {
    fn drop(&mut self) {
        // The map and this guard hold the only references when nobody waits.
        self.locks
            .remove_if(&self.issue_id, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

impl MutationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other mutation of `issue_id` is running.
    pub async fn acquire(&self, issue_id: &str) -> MutationPermit {
        let lock = self
            .locks
            .entry(issue_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        MutationPermit {
            locks: self.locks.clone(),
            issue_id: issue_id.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Issues with a mutation running or queued.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
