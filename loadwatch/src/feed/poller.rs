//! Cancellable per-feed poller.
//!
//! Each feed runs in a dedicated worker thread: an immediate first call,
//! then each subsequent call one interval after the previous one
//! *completes*, so a slow backend is automatically polled less often.
//!
//! Cancellation is a generation counter. Every outcome is tagged with the
//! generation that was current when its call began; [`Poller::stop`] bumps
//! the counter, and an outcome whose generation is no longer current is
//! discarded unseen. The consumer-facing rule is "apply iff generation ==
//! current generation" and nothing else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::api::FetchError;

pub type Generation = u64;

/// Outcome of one polled call, tagged with the generation current when the
/// call was issued.
#[derive(Debug)]
pub struct PollOutcome<T> {
    pub generation: Generation,
    pub result: Result<T, FetchError>,
}

struct Shared {
    generation: AtomicU64,
}

/// One feed's polling lifecycle. Dropping the poller stops it.
pub struct Poller<T> {
    shared: Arc<Shared>,
    outcomes: Receiver<PollOutcome<T>>,
    stop_tx: Sender<()>,
}

impl<T: Send + 'static> Poller<T> {
    /// Spawns the worker and issues the first call immediately.
    pub fn start<F>(name: &'static str, interval: Duration, operation: F) -> Poller<T>
    where
        F: Fn() -> Result<T, FetchError> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            generation: AtomicU64::new(0),
        });
        let (outcome_tx, outcome_rx) = channel::bounded(8);
        let (stop_tx, stop_rx) = channel::bounded(1);

        let worker = Arc::clone(&shared);
        thread::spawn(move || loop {
            let generation = worker.generation.load(Ordering::Acquire);
            let result = operation();

            if worker.generation.load(Ordering::Acquire) != generation {
                tracing::debug!(feed = name, generation, "dropping superseded outcome");
            } else {
                // latest-wins downstream; drop if receiver is backed up
                let _ = outcome_tx.try_send(PollOutcome { generation, result });
            }

            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!(feed = name, "poller stopped");
                    break;
                }
            }
        });

        Poller {
            shared,
            outcomes: outcome_rx,
            stop_tx,
        }
    }

    pub fn generation(&self) -> Generation {
        self.shared.generation.load(Ordering::Acquire)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation() == generation
    }

    /// Next applicable outcome, if any. Outcomes from superseded
    /// generations and cancelled calls are consumed silently here; what
    /// comes out is safe to apply as-is.
    pub fn try_next(&self) -> Option<Result<T, FetchError>> {
        loop {
            let outcome = self.outcomes.try_recv().ok()?;
            if !self.is_current(outcome.generation) {
                continue;
            }
            match outcome.result {
                Err(FetchError::Cancelled) => continue,
                other => return Some(other),
            }
        }
    }

    /// Cancels the in-flight call (its outcome will be discarded) and
    /// prevents further scheduling. Safe to call any number of times.
    pub fn stop(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let _ = self.stop_tx.try_send(());
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        // channel disconnection wakes the worker out of its interval wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn first_call_is_immediate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let poller = Poller::start("test", Duration::from_secs(60), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(1u32)
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.try_next(), Some(Ok(1)));
        assert_eq!(poller.try_next(), None);
    }

    #[test]
    fn next_call_waits_for_the_interval_after_completion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let _poller = Poller::start("test", Duration::from_millis(20), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        thread::sleep(Duration::from_millis(10));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        thread::sleep(Duration::from_millis(120));
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn stopped_poller_discards_the_in_flight_outcome() {
        let poller = Poller::start("test", Duration::from_millis(5), move || {
            thread::sleep(Duration::from_millis(40));
            Ok(7u32)
        });

        // stop while the first call is still sleeping
        thread::sleep(Duration::from_millis(10));
        poller.stop();
        thread::sleep(Duration::from_millis(80));

        // neither a value nor an error may surface
        assert_eq!(poller.try_next(), None);
    }

    #[test]
    fn stop_is_idempotent() {
        let poller = Poller::start("test", Duration::from_millis(5), || Ok(()));
        poller.stop();
        poller.stop();
        poller.stop();
    }

    #[test]
    fn cancelled_outcomes_are_swallowed() {
        let poller: Poller<u32> = Poller::start("test", Duration::from_secs(60), || {
            Err(FetchError::Cancelled)
        });
        thread::sleep(Duration::from_millis(50));
        assert_eq!(poller.try_next(), None);
    }

    #[test]
    fn errors_surface_once_per_call() {
        let poller: Poller<u32> = Poller::start("test", Duration::from_secs(60), || {
            Err(FetchError::Network("unreachable".to_string()))
        });
        thread::sleep(Duration::from_millis(50));
        assert_eq!(
            poller.try_next(),
            Some(Err(FetchError::Network("unreachable".to_string())))
        );
        assert_eq!(poller.try_next(), None);
    }

    #[test]
    fn superseding_applies_exactly_one_update() {
        // A slow first call is superseded by stop(); a fresh poller then
        // delivers its own update. Exactly one value must be applied.
        let first = Poller::start("a", Duration::from_secs(60), move || {
            thread::sleep(Duration::from_millis(40));
            Ok(1u32)
        });
        thread::sleep(Duration::from_millis(10));
        first.stop();

        let second = Poller::start("b", Duration::from_secs(60), move || Ok(2u32));
        thread::sleep(Duration::from_millis(80));

        let mut applied = Vec::new();
        while let Some(Ok(v)) = first.try_next() {
            applied.push(v);
        }
        while let Some(Ok(v)) = second.try_next() {
            applied.push(v);
        }
        assert_eq!(applied, vec![2]);
    }
}
