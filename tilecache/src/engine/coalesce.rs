//! Single-flight deduplication of same-key work.
//!
//! When several callers need the same key refreshed at once, only the first
//! (the leader) runs the work; the others subscribe and receive a clone of
//! its result.
//!
//! ```text
//! resolve(k) ─┐
//!             │                          leader runs
//! resolve(k) ─┼──► RequestCoalescer ───► fetch/encode/store
//!             │           │                     │
//! seed(k) ────┘           ▼                     ▼
//!                 followers wait on ◄──── broadcast result
//! ```
//!
//! If the leader's future is dropped before finishing, its entry is removed
//! and followers observe `None`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

/// A result delivered through the coalescer.
#[derive(Debug, Clone)]
pub struct Shared<T> {
    pub value: T,
    /// Whether this caller ran the work itself.
    pub leader: bool,
}

/// Counters for monitoring coalescing effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoalescerStats {
    pub total_requests: u64,
    pub coalesced_requests: u64,
}

/// Tracks in-flight work by key.
pub struct RequestCoalescer<T: Clone> {
    in_flight: DashMap<String, broadcast::Sender<T>>,
    total: AtomicU64,
    coalesced: AtomicU64,
}

enum Role<T> {
    Leader(broadcast::Sender<T>),
    Follower(broadcast::Receiver<T>),
}

/// Removes the leader's entry if it never completes.
struct LeaderGuard<'a, T: Clone> {
    coalescer: &'a RequestCoalescer<T>,
    key: &'a str,
    armed: bool,
}

impl<T: Clone> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            // Dropping the sender closes every follower's receiver
            self.coalescer.in_flight.remove(self.key);
        }
    }
}

impl<T: Clone + Send + 'static> RequestCoalescer<T> {
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
            total: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    /// Runs `work` for `key`, or waits for the run already in flight.
    ///
    /// Returns `None` only to followers whose leader was dropped.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Option<Shared<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.total.fetch_add(1, Ordering::Relaxed);

        let role = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => Role::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                // Capacity 1: exactly one value is ever sent per channel
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                Role::Leader(tx)
            }
        };

        match role {
            Role::Follower(mut rx) => {
                let coalesced = self.coalesced.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(key = %key, coalesced, "Coalescing request onto in-flight fetch");
                rx.recv().await.ok().map(|value| Shared {
                    value,
                    leader: false,
                })
            }
            Role::Leader(tx) => {
                let mut guard = LeaderGuard {
                    coalescer: self,
                    key,
                    armed: true,
                };

                let value = work().await;

                guard.armed = false;
                self.in_flight.remove(key);
                let waiters = tx.receiver_count();
                let _ = tx.send(value.clone());
                if waiters > 0 {
                    debug!(key = %key, waiters, "Broadcast result to coalesced waiters");
                }

                Some(Shared {
                    value,
                    leader: true,
                })
            }
        }
    }

    /// Number of keys currently being worked on.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            total_requests: self.total.load(Ordering::Relaxed),
            coalesced_requests: self.coalesced.load(Ordering::Relaxed),
        }
    }
}

impl<T: Clone + Send + 'static> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_caller_is_leader() {
        let coalescer = RequestCoalescer::<u32>::new();
        let shared = coalescer.run("k", || async { 7 }).await.unwrap();

        assert_eq!(shared.value, 7);
        assert!(shared.leader);
        assert_eq!(coalescer.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let coalescer = Arc::new(RequestCoalescer::<u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let coalescer = Arc::clone(&coalescer);
                let runs = Arc::clone(&runs);
                tokio::spawn(async move {
                    coalescer
                        .run("k", || async move {
                            runs.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            42
                        })
                        .await
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let shared: Vec<_> = results.into_iter().map(|r| r.unwrap().unwrap()).collect();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(shared.iter().all(|s| s.value == 42));
        assert_eq!(shared.iter().filter(|s| s.leader).count(), 1);
        assert_eq!(coalescer.stats().coalesced_requests, 4);
    }

    #[tokio::test]
    async fn test_different_keys_run_independently() {
        let coalescer = Arc::new(RequestCoalescer::<String>::new());

        let a = coalescer.run("a", || async { "A".to_string() });
        let b = coalescer.run("b", || async { "B".to_string() });
        let (a, b) = tokio::join!(a, b);

        assert!(a.unwrap().leader);
        assert!(b.unwrap().leader);
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_followers() {
        let coalescer = Arc::new(RequestCoalescer::<u32>::new());

        let leader = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move {
                coalescer
                    .run("k", || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        1
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let follower = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move { coalescer.run("k", || async { 2 }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        leader.abort();
        let result = follower.await.unwrap();
        assert!(result.is_none());
        assert_eq!(coalescer.in_flight_count(), 0);

        // The key is usable again
        let again = coalescer.run("k", || async { 3 }).await.unwrap();
        assert_eq!(again.value, 3);
    }
}
