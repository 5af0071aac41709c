//! Cancellable delayed/repeating task.
//!
//! Drives button auto-repeat: a task armed on press stays silent for the
//! hold delay, then fires its callback once per interval until the button
//! is released.  The callback runs on a dedicated timing thread, so the
//! handle's cancellation contract is strict: once [`RepeatHandle::cancel`]
//! returns, no further invocation can begin.  An invocation already in
//! flight completes first (`cancel` waits for it), which is why callers
//! make the callback re-check the button's committed state instead of
//! trusting captured state.

use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

struct State {
    cancelled: bool,
}

/// Handle to a live repeat task. Dropping it cancels the task.
pub struct RepeatHandle {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

/// Spawn a repeat task.
///
/// The task sleeps for `delay`, then invokes `tick` once `interval` later
/// and again every `interval` after that; the first invocation therefore
/// lands at `delay + interval`.  `tick` returning `false` ends the task
/// from the inside.
pub fn spawn<F>(delay: Duration, interval: Duration, mut tick: F) -> io::Result<RepeatHandle>
where
    F: FnMut() -> bool + Send + 'static,
{
    let shared = Arc::new(Shared {
        state: Mutex::new(State { cancelled: false }),
        wake: Condvar::new(),
    });

    let worker_shared = Arc::clone(&shared);
    let worker = thread::Builder::new()
        .name("blinkd-repeat".into())
        .spawn(move || {
            let mut deadline = Instant::now() + delay + interval;
            let mut state = worker_shared
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            loop {
                if state.cancelled {
                    break;
                }
                let now = Instant::now();
                if now < deadline {
                    // Re-evaluates cancellation and the deadline on every
                    // wakeup, so spurious wakeups are harmless.
                    let (guard, _) = worker_shared
                        .wake
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    state = guard;
                    continue;
                }
                // Fires while the task lock is held: cancel() cannot return
                // before an in-flight invocation has completed.
                if !tick() {
                    break;
                }
                deadline = now + interval;
            }
        })?;

    Ok(RepeatHandle {
        shared,
        worker: Some(worker),
    })
}

impl RepeatHandle {
    /// Cancel the task and wait for its thread to exit.
    ///
    /// Idempotent. After this returns, `tick` will not be invoked again.
    pub fn cancel(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        {
            let mut state = self
                .shared
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            state.cancelled = true;
            self.shared.wake.notify_all();
        }
        if worker.join().is_err() {
            log::warn!("repeat task thread panicked");
        }
    }
}

impl Drop for RepeatHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
