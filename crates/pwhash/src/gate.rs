//! Admission and drain coordination.
//!
//! [`DrainGate`] decides whether a request may enter the service and counts the
//! requests that did. Once shutdown is initiated no new request is admitted,
//! and as soon as the last admitted request leaves, the gate fires its
//! shutdown-ready signal. The supervisor awaits that signal before it closes
//! the listener.
//!
//! The shutdown flag and the outstanding counter only make sense together:
//! admission reads the flag and bumps the counter in one step, and release
//! decrements the counter and reads the flag in one step. Both therefore live
//! in a single `GateState` behind one mutex.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct GateState {
    shutting_down: bool,
    outstanding: u64,
    signalled: bool,
}

/// Admission gate with a one-shot shutdown-ready signal.
#[derive(Debug, Default)]
pub struct DrainGate {
    state: Mutex<GateState>,
    ready: CancellationToken,
}

impl DrainGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a request unless shutdown was initiated.
    ///
    /// Every `true` returned here must be paired with exactly one
    /// [`release`](Self::release). Prefer [`enter`](Self::enter), which pairs
    /// them automatically.
    pub fn admit(&self) -> bool {
        let mut state = self.state.lock();
        if state.shutting_down {
            return false;
        }
        state.outstanding += 1;
        true
    }

    /// Marks one admitted request as finished.
    pub fn release(&self) {
        let mut state = self.state.lock();
        match state.outstanding.checked_sub(1) {
            Some(n) => state.outstanding = n,
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Release without a matching admission ignored");
                return;
            }
        }
        if state.shutting_down && state.outstanding == 0 {
            self.signal_ready(&mut state);
        }
    }

    /// Stops admitting new requests.
    ///
    /// If nothing is in flight the shutdown-ready signal fires immediately;
    /// otherwise it fires when the last outstanding request is released.
    /// Returns `true` only for the call that actually flipped the gate.
    pub fn initiate_shutdown(&self) -> bool {
        let mut state = self.state.lock();
        if state.shutting_down {
            return false;
        }
        state.shutting_down = true;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Shutdown initiated, draining {} outstanding request(s)",
            state.outstanding
        );

        if state.outstanding == 0 {
            self.signal_ready(&mut state);
        }
        true
    }

    /// RAII form of [`admit`](Self::admit): the returned guard releases the
    /// request when dropped.
    pub fn enter(&self) -> Option<Admission<'_>> {
        self.admit().then(|| Admission { gate: self })
    }

    /// Resolves once shutdown was initiated and every admitted request has
    /// been released.
    pub async fn wait_ready(&self) {
        self.ready.cancelled().await;
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_cancelled()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().shutting_down
    }

    pub fn outstanding(&self) -> u64 {
        self.state.lock().outstanding
    }

    // Called with the state lock held, so concurrent releases and shutdown
    // initiation cannot both observe `signalled == false`.
    fn signal_ready(&self, state: &mut GateState) {
        if state.signalled {
            return;
        }
        state.signalled = true;

        #[cfg(feature = "tracing")]
        tracing::info!("All outstanding requests drained");

        self.ready.cancel();
    }
}

/// Guard for an admitted request. Dropping it releases the request.
#[must_use = "dropping the admission releases the request immediately"]
pub struct Admission<'a> {
    gate: &'a DrainGate,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread::scope;

    #[test]
    fn admits_and_counts_until_shutdown() {
        let gate = DrainGate::new();
        assert!(gate.admit());
        assert!(gate.admit());
        assert_eq!(gate.outstanding(), 2);

        assert!(gate.initiate_shutdown());
        assert!(gate.is_shutting_down());
        assert!(!gate.admit());
        assert_eq!(gate.outstanding(), 2);
        assert!(!gate.is_ready());

        gate.release();
        assert!(!gate.is_ready());
        gate.release();
        assert!(gate.is_ready());
        assert_eq!(gate.outstanding(), 0);
    }

    #[test]
    fn shutdown_with_nothing_in_flight_is_ready_immediately() {
        let gate = DrainGate::new();
        assert!(gate.initiate_shutdown());
        assert!(gate.is_ready());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let gate = DrainGate::new();
        assert!(gate.admit());
        assert!(gate.initiate_shutdown());
        assert!(!gate.initiate_shutdown());
        assert!(!gate.is_ready());
        gate.release();
        assert!(gate.is_ready());
        assert!(!gate.initiate_shutdown());
    }

    #[test]
    fn unmatched_release_never_goes_negative() {
        let gate = DrainGate::new();
        gate.release();
        assert_eq!(gate.outstanding(), 0);
        assert!(gate.admit());
        assert_eq!(gate.outstanding(), 1);
    }

    #[test]
    fn admission_guard_releases_on_drop() {
        let gate = DrainGate::new();
        {
            let _a = gate.enter().expect("admitted");
            let _b = gate.enter().expect("admitted");
            assert_eq!(gate.outstanding(), 2);
            gate.initiate_shutdown();
            assert!(gate.enter().is_none());
        }
        assert_eq!(gate.outstanding(), 0);
        assert!(gate.is_ready());
    }

    #[test]
    fn ready_fires_once_under_racing_releases() {
        const THREADS: usize = 16;
        const PER_THREAD: usize = 200;

        let gate = Arc::new(DrainGate::new());
        for _ in 0..THREADS * PER_THREAD {
            assert!(gate.admit());
        }

        scope(|s| {
            let g = Arc::clone(&gate);
            s.spawn(move || {
                g.initiate_shutdown();
            });
            for _ in 0..THREADS {
                let g = Arc::clone(&gate);
                s.spawn(move || {
                    for _ in 0..PER_THREAD {
                        assert!(!g.is_ready() || g.outstanding() == 0);
                        g.release();
                    }
                });
            }
        });

        assert_eq!(gate.outstanding(), 0);
        assert!(gate.is_shutting_down());
        assert!(gate.is_ready());
        assert!(gate.state.lock().signalled);
    }

    #[test]
    fn racing_admits_and_shutdown_leave_consistent_count() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;

        let gate = Arc::new(DrainGate::new());
        scope(|s| {
            for i in 0..THREADS {
                let g = Arc::clone(&gate);
                s.spawn(move || {
                    for j in 0..PER_THREAD {
                        if i == 0 && j == PER_THREAD / 2 {
                            g.initiate_shutdown();
                        }
                        if let Some(_admission) = g.enter() {
                            std::hint::spin_loop();
                        }
                    }
                });
            }
        });

        assert_eq!(gate.outstanding(), 0);
        assert!(gate.is_ready());
    }

    #[tokio::test]
    async fn wait_ready_resolves_after_drain() {
        let gate = Arc::new(DrainGate::new());
        assert!(gate.admit());

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait_ready().await })
        };

        gate.initiate_shutdown();
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        gate.release();
        waiter.await.unwrap();
        assert!(gate.is_ready());
    }
}
