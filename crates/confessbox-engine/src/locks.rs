use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use confessbox_types::models::ActorId;

/// One async mutex per actor, so updates from the same actor are handled
/// strictly one after another while different actors proceed in parallel.
#[derive(Default)]
pub struct ActorLocks {
    locks: Mutex<HashMap<ActorId, Arc<AsyncMutex<()>>>>,
}

impl ActorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `actor`'s state.
    pub async fn acquire(&self, actor: ActorId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(actor).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Forget locks nobody holds or waits on. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_actor_is_serialized() {
        let locks = ActorLocks::new();
        let guard = locks.acquire(ActorId(1)).await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.acquire(ActorId(1))).await;
        assert!(blocked.is_err());

        drop(guard);
        let again = tokio::time::timeout(Duration::from_millis(20), locks.acquire(ActorId(1))).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn different_actors_do_not_block() {
        let locks = ActorLocks::new();
        let _a = locks.acquire(ActorId(1)).await;
        let b = tokio::time::timeout(Duration::from_millis(20), locks.acquire(ActorId(2))).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = ActorLocks::new();
        let held = locks.acquire(ActorId(1)).await;
        drop(locks.acquire(ActorId(2)).await);

        assert_eq!(locks.prune(), 1);
        drop(held);
        assert_eq!(locks.prune(), 1);
    }
}
