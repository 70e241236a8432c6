//! Async operation gate.
//!
//! Routes control operations onto the [`ControlExecutor`] and keeps an exact
//! count of the ones still in flight. The count is raised before an operation
//! is queued and lowered when its [`InFlightToken`] drops: after it has run,
//! panicked, or been discarded unrun. A zero count means every dispatched
//! operation has finished.
//!
//! None of this may be called with the audio lock held.

use crate::error::{HostError, Result};
use crate::executor::{panic_message, ControlExecutor};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, warn};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// In-flight operation counter with idle notification.
#[derive(Default)]
pub struct InFlight {
    count: AtomicUsize,
    subscribers: Mutex<Vec<Sender<()>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Begin an operation and return a token that completes it when dropped.
    ///
    /// Moved into a queued task, the token settles the count whether the task
    /// runs, panics, or is discarded unrun by a stopping executor.
    pub fn track(self: &Arc<Self>) -> InFlightToken {
        self.begin();
        InFlightToken {
            in_flight: Arc::clone(self),
        }
    }

    /// Mark one operation finished. Notifies idle subscribers on the
    /// transition to zero. Never goes below zero.
    pub fn complete(&self) {
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match previous {
            Ok(1) => self.notify_idle(),
            Ok(_) => {}
            Err(_) => warn!("InFlight::complete called with nothing in flight"),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.count() == 0
    }

    /// Receiver that gets one message each time the count drops to zero.
    pub fn subscribe(&self) -> Receiver<()> {
        let (tx, rx) = bounded(1);
        self.subscribers.lock().push(tx);
        rx
    }

    fn notify_idle(&self) {
        self.subscribers
            .lock()
            .retain(|tx| !matches!(tx.try_send(()), Err(TrySendError::Disconnected(_))));
    }
}

/// One in-flight operation. Dropping it marks the operation finished.
#[must_use = "dropping the token completes the operation immediately"]
pub struct InFlightToken {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.in_flight.complete();
    }
}

/// Result of [`AsyncGate::dispatch`].
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatched<T> {
    /// The operation ran before `dispatch` returned.
    Completed(T),
    /// The operation was queued and will run on the control thread.
    Queued,
}

impl<T> Dispatched<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Dispatched::Completed(value) => Some(value),
            Dispatched::Queued => None,
        }
    }
}

pub struct AsyncGate {
    executor: Arc<ControlExecutor>,
    in_flight: Arc<InFlight>,
    force_synchronous: AtomicBool,
}

impl AsyncGate {
    pub fn new(executor: Arc<ControlExecutor>, force_synchronous: bool) -> Self {
        Self {
            executor,
            in_flight: Arc::new(InFlight::new()),
            force_synchronous: AtomicBool::new(force_synchronous),
        }
    }

    pub fn executor(&self) -> &Arc<ControlExecutor> {
        &self.executor
    }

    /// Run `op` on the control thread.
    ///
    /// On the control thread itself `op` runs inline. With force-synchronous
    /// set, the caller blocks until `op` has run. Otherwise `op` is queued
    /// and `Dispatched::Queued` is returned immediately.
    pub fn dispatch<T, F>(&self, op: F) -> Result<Dispatched<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.executor.is_current_thread() {
            let _token = self.in_flight.track();
            return run_guarded(op).map(Dispatched::Completed);
        }

        let token = self.in_flight.track();

        if self.force_synchronous() {
            let (tx, rx) = bounded(1);
            let submitted = self.executor.submit(move || {
                let outcome = run_guarded(op);
                drop(token);
                let _ = tx.send(outcome);
            });
            if !submitted {
                return Err(HostError::ExecutorStopped);
            }
            return match rx.recv() {
                Ok(outcome) => outcome.map(Dispatched::Completed),
                Err(_) => Err(HostError::ExecutorStopped),
            };
        }

        let submitted = self.executor.submit(move || {
            let _token = token;
            let _ = run_guarded(op);
        });
        if !submitted {
            return Err(HostError::ExecutorStopped);
        }
        Ok(Dispatched::Queued)
    }

    pub fn async_event_running(&self) -> bool {
        !self.in_flight.is_idle()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.count()
    }

    /// Block until nothing is in flight, or until `timeout` passes.
    ///
    /// Polls; not for the audio thread. Returns `false` on timeout. On the
    /// control thread queued work cannot make progress, so this returns
    /// `false` at once if anything is pending.
    pub fn wait_for_async_events(&self, timeout: Option<Duration>) -> bool {
        if self.in_flight.is_idle() {
            return true;
        }
        if self.executor.is_current_thread() {
            warn!(
                "wait_for_async_events called on the control thread with {} pending",
                self.in_flight()
            );
            return false;
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if self.in_flight.is_idle() {
                return true;
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    let err = HostError::AsyncWaitTimeout {
                        duration_ms: timeout.map_or(0, |t| t.as_millis() as u64),
                        pending: self.in_flight(),
                    };
                    warn!("{}", err);
                    return false;
                }
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    pub fn set_force_synchronous(&self, force: bool) {
        self.force_synchronous.store(force, Ordering::Release);
    }

    pub fn force_synchronous(&self) -> bool {
        self.force_synchronous.load(Ordering::Acquire)
    }

    pub fn subscribe_idle(&self) -> Receiver<()> {
        self.in_flight.subscribe()
    }
}

fn run_guarded<T, F>(op: F) -> Result<T>
where
    F: FnOnce() -> T,
{
    catch_unwind(AssertUnwindSafe(op)).map_err(|payload| {
        let message = panic_message(&payload);
        error!("Async operation panicked: {}", message);
        HostError::OperationPanicked(message)
    })
}
