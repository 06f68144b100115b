//! Background digest computation.
//!
//! [`DigestWorker`] takes a validated password off the request path: it spawns
//! one detached task per submission that waits for the configured delay,
//! computes the digest and publishes it into the shared [`DigestStore`]. There
//! is no channel back to the request; completion is observed only through the
//! store.
//!
//! Tasks are spawned on a [`TaskTracker`] so the supervisor can wait for the
//! digests still in progress once the listener has stopped. Tasks are never
//! cancelled.
//!
//! The worker remembers the runtime it was created in, so submissions may be
//! dispatched from plain threads. A worker created outside any runtime falls
//! back to the caller's runtime, and reports [`Error::RuntimeUnavailable`] if
//! there is none.

use crate::{
    digest::Hasher,
    error::{Error, Result},
    handle::Handle,
    store::DigestStore,
};
use core::time::Duration;
use std::sync::Arc;
use tokio::runtime;
use tokio_util::task::TaskTracker;

pub struct DigestWorker {
    store: Arc<DigestStore>,
    hasher: Arc<dyn Hasher>,
    delay: Duration,
    tracker: TaskTracker,
    runtime: Option<runtime::Handle>,
}

impl DigestWorker {
    pub fn new(store: Arc<DigestStore>, hasher: Arc<dyn Hasher>, delay: Duration) -> Self {
        Self {
            store,
            hasher,
            delay,
            tracker: TaskTracker::new(),
            runtime: runtime::Handle::try_current().ok(),
        }
    }

    /// Runtime digests will be spawned on: the one captured at construction,
    /// else the caller's.
    pub fn runtime(&self) -> Result<runtime::Handle> {
        self.runtime
            .clone()
            .or_else(|| runtime::Handle::try_current().ok())
            .ok_or(Error::RuntimeUnavailable)
    }

    /// Schedules the digest of `payload` to be stored under `handle`.
    ///
    /// Returns immediately, or fails without side effects when no runtime is
    /// available.
    pub fn schedule(&self, handle: Handle, payload: Vec<u8>) -> Result<()> {
        let runtime = self.runtime()?;
        self.schedule_on(&runtime, handle, payload);
        Ok(())
    }

    /// Like [`schedule`](Self::schedule), on a runtime the caller already
    /// resolved through [`runtime`](Self::runtime).
    pub fn schedule_on(&self, runtime: &runtime::Handle, handle: Handle, payload: Vec<u8>) {
        let store = Arc::clone(&self.store);
        let hasher = Arc::clone(&self.hasher);
        let delay = self.delay;

        let task = async move {
            tokio::time::sleep(delay).await;

            let digest = hasher.digest(&payload);
            if !store.insert(handle, digest) {
                #[cfg(feature = "tracing")]
                tracing::error!("Digest for handle {handle} was already stored");
                return;
            }

            #[cfg(feature = "tracing")]
            tracing::debug!("Digest for handle {handle} stored");
        };
        self.tracker.spawn_on(task, runtime);
    }

    /// Number of digests still being computed.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for every scheduled digest to be stored.
    ///
    /// Closes the tracker, so this resolves as soon as the tracked set is
    /// empty. Scheduling after a drain is still allowed.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Like [`drain`](Self::drain), but gives up after `limit`.
    ///
    /// Returns the number of digests still pending when the limit expired, or
    /// `0` if everything completed.
    pub async fn drain_timeout(&self, limit: Duration) -> usize {
        match tokio::time::timeout(limit, self.drain()).await {
            Ok(()) => 0,
            Err(_) => self.pending(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Sha512Base64;

    fn worker(delay: Duration) -> (DigestWorker, Arc<DigestStore>) {
        let store = Arc::new(DigestStore::new());
        let worker = DigestWorker::new(Arc::clone(&store), Arc::new(Sha512Base64), delay);
        (worker, store)
    }

    #[tokio::test(start_paused = true)]
    async fn result_appears_only_after_delay() {
        let (worker, store) = worker(Duration::from_secs(5));
        worker.schedule(1, b"angryMonkey".to_vec()).unwrap();
        assert_eq!(worker.pending(), 1);

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        assert_eq!(store.get(1), None);

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.get(1), Some(Sha512Base64.digest(b"angryMonkey")));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_pending_digests() {
        let (worker, store) = worker(Duration::from_secs(5));
        for handle in 1..=10 {
            worker
                .schedule(handle, format!("pw-{handle}").into_bytes())
                .unwrap();
        }

        worker.drain().await;
        assert_eq!(worker.pending(), 0);
        assert_eq!(store.len(), 10);
        for handle in 1..=10 {
            assert_eq!(
                store.get(handle),
                Some(Sha512Base64.digest(format!("pw-{handle}").as_bytes()))
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drain_timeout_reports_leftovers() {
        let (worker, store) = worker(Duration::from_secs(30));
        worker.schedule(1, b"slow".to_vec()).unwrap();
        worker.schedule(2, b"slower".to_vec()).unwrap();

        let left = worker.drain_timeout(Duration::from_secs(1)).await;
        assert_eq!(left, 2);
        assert!(store.is_empty());

        let left = worker.drain_timeout(Duration::from_secs(60)).await;
        assert_eq!(left, 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn scheduling_without_runtime_fails_cleanly() {
        let (worker, store) = worker(Duration::ZERO);
        assert_eq!(worker.runtime().err(), Some(Error::RuntimeUnavailable));
        assert_eq!(
            worker.schedule(1, b"pw".to_vec()),
            Err(Error::RuntimeUnavailable)
        );
        assert_eq!(worker.pending(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn captured_runtime_serves_plain_threads() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .unwrap();
        let (worker, store) = {
            let _guard = rt.enter();
            worker(Duration::ZERO)
        };

        std::thread::scope(|s| {
            s.spawn(|| worker.schedule(7, b"angryMonkey".to_vec()).unwrap());
        });
        rt.block_on(worker.drain());

        assert_eq!(store.get(7), Some(Sha512Base64.digest(b"angryMonkey")));
    }
}
