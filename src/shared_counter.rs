use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::CounterError;

struct CounterState {
    value: i64,
    done: bool,
}

/// A counter shared by the up and down tasks, plus the completion rendezvous.
///
/// `value` and `done` live behind one mutex; the condvar is only ever waited
/// on with that mutex. Nothing here performs I/O.
pub struct SharedCounter {
    pair: (Mutex<CounterState>, Condvar),
}

/// `value` and `done`, read together under one lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CounterSnapshot {
    pub(crate) value: i64,
    pub(crate) done: bool,
}

impl SharedCounter {
    pub fn new(start: i64) -> SharedCounter {
        SharedCounter {
            pair: (
                Mutex::new(CounterState {
                    value: start,
                    done: false,
                }),
                Condvar::new(),
            ),
        }
    }

    /// Increments the value and returns the post-increment value.
    pub fn locked_increment(&self) -> Result<i64, CounterError> {
        let (lock, _) = &self.pair;
        let mut state = lock.lock()?;
        state.value += 1;
        Ok(state.value)
    }

    // Only reachable through a `Handoff`, so no decrement can precede completion.
    fn locked_decrement(&self) -> Result<i64, CounterError> {
        let (lock, _) = &self.pair;
        let mut state = lock.lock()?;
        state.value -= 1;
        Ok(state.value)
    }

    /// Marks the up phase complete and wakes every waiter.
    ///
    /// Calling it again leaves `done` set and notifies nobody new.
    pub fn mark_done(&self) -> Result<(), CounterError> {
        let (lock, cvar) = &self.pair;
        {
            let mut state = lock.lock()?;
            if state.done {
                return Ok(());
            }
            state.done = true;
        }
        cvar.notify_all();
        Ok(())
    }

    /// Blocks until `mark_done` has been called.
    ///
    /// The flag, not the wakeup, decides: spurious wakeups loop back into
    /// the wait. The lock is released on return; the returned [`Handoff`]
    /// carries the value observed together with `done`.
    pub fn wait_until_done(&self) -> Result<Handoff<'_>, CounterError> {
        let (lock, cvar) = &self.pair;
        let mut state = lock.lock()?;
        while !state.done {
            state = cvar.wait(state)?;
        }
        Ok(Handoff {
            counter: self,
            start: state.value,
        })
    }

    /// Like [`wait_until_done`](Self::wait_until_done), but gives up after `timeout`.
    ///
    /// A timeout too large to express as a deadline waits without bound.
    pub fn wait_until_done_for(&self, timeout: Duration) -> Result<Handoff<'_>, CounterError> {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => return self.wait_until_done(),
        };
        let (lock, cvar) = &self.pair;
        let mut state = lock.lock()?;
        while !state.done {
            let now = Instant::now();
            if now >= deadline {
                return Err(CounterError::TimedOut(timeout));
            }
            let (guard, _) = cvar.wait_timeout(state, deadline - now)?;
            state = guard;
        }
        Ok(Handoff {
            counter: self,
            start: state.value,
        })
    }

    pub fn is_done(&self) -> Result<bool, CounterError> {
        let (lock, _) = &self.pair;
        Ok(lock.lock()?.done)
    }

    // Crate-private: outside code must not learn the value before the
    // handoff. The coordinator reads it after join, the up task at start.
    pub(crate) fn snapshot(&self) -> Result<CounterSnapshot, CounterError> {
        let (lock, _) = &self.pair;
        let state = lock.lock()?;
        Ok(CounterSnapshot {
            value: state.value,
            done: state.done,
        })
    }
}

impl Default for SharedCounter {
    fn default() -> Self {
        SharedCounter::new(0)
    }
}

/// Proof that the up phase finished.
///
/// Only `wait_until_done*` hands these out, and decrementing requires one.
#[must_use]
pub struct Handoff<'a> {
    counter: &'a SharedCounter,
    start: i64,
}

impl<'a> Handoff<'a> {
    /// The value the up phase left behind.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Decrements the shared value and returns the post-decrement value.
    pub fn decrement(&self) -> Result<i64, CounterError> {
        self.counter.locked_decrement()
    }
}
