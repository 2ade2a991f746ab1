//! Per-user run serialization.
//!
//! Runs for the same docs user wait for each other; runs for different users
//! proceed in parallel. An entry lives in the map only while some run holds or
//! awaits it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use groupsync_core::DocsUserId;

type LockMap = HashMap<DocsUserId, Arc<AsyncMutex<()>>>;

#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<LockMap>>,
}

/// Held for the duration of one run; releases the user on drop. While `guard`
/// is `None` the run is still waiting for the lock.
#[derive(Debug)]
pub struct UserGuard {
    locks: UserLocks,
    user: DocsUserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other run for `user` is in flight, then claim it.
    ///
    /// Cancelling the wait prunes the entry the same way releasing does.
    pub async fn acquire(&self, user: &DocsUserId) -> UserGuard {
        let lock = {
            let mut map = self.map();
            map.entry(user.clone()).or_default().clone()
        };
        let mut pending = UserGuard {
            locks: self.clone(),
            user: user.clone(),
            guard: None,
        };
        pending.guard = Some(lock.lock_owned().await);
        pending
    }

    /// Number of users with a run in flight or waiting.
    pub fn in_flight(&self) -> usize {
        self.map().len()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.locks.map();
        if map
            .get(&self.user)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.user);
        }
    }
}
