//! Keyed concurrency primitives for the narrow exclusion points in the
//! pipeline: the per-upload merge claim and the per-request submission lock.
//! Neither is a global lock; contention only exists within one key.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Set of exclusive try-claims keyed by string.
///
/// `try_claim` never blocks: a second holder of the same key observes the
/// claim and backs off. The claim releases when the guard drops.
#[derive(Clone, Default)]
pub struct ClaimSet {
    held: Arc<Mutex<HashSet<String>>>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_claim(&self, key: &str) -> Option<ClaimGuard> {
        let mut held = lock_ignoring_poison(&self.held);
        if held.insert(key.to_string()) {
            Some(ClaimGuard {
                held: Arc::clone(&self.held),
                key: key.to_string(),
            })
        } else {
            None
        }
    }
}

pub struct ClaimGuard {
    held: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        lock_ignoring_poison(&self.held).remove(&self.key);
    }
}

/// Per-key async mutex: acquirers of the same key serialize, different keys
/// proceed independently.
#[derive(Clone, Default)]
pub struct KeyedLock {
    locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: Uuid) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = lock_ignoring_poison(&self.locks);
            Arc::clone(locks.entry(key).or_default())
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_second_claim_fails_until_release() {
        let claims = ClaimSet::new();

        let guard = claims.try_claim("upload-a").expect("first claim");
        assert!(claims.try_claim("upload-a").is_none());
        assert!(claims.try_claim("upload-b").is_some());

        drop(guard);
        assert!(claims.try_claim("upload-a").is_some());
    }

    #[tokio::test]
    async fn test_keyed_lock_serializes_same_key() {
        let lock = KeyedLock::new();
        let key = Uuid::new_v4();
        let concurrent = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = lock.clone();
            let concurrent = Arc::clone(&concurrent);
            handles.push(tokio::spawn(async move {
                let _guard = lock.acquire(key).await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst);
                assert_eq!(now, 0, "two holders inside the same keyed section");
                tokio::time::sleep(Duration::from_millis(2)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_keyed_lock_distinct_keys_do_not_block() {
        let lock = KeyedLock::new();
        let first = lock.acquire(Uuid::new_v4()).await;
        // Acquiring a different key must not deadlock while `first` is held.
        let _second = lock.acquire(Uuid::new_v4()).await;
        drop(first);
    }
}
