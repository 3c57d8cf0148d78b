//! Per-path exclusion for operations on the same name
//!
//! Keys are mount paths. Object operations hold their container's key shared and
//! their own key exclusively; structural container changes hold the container
//! key exclusively. Callers always lock a parent key before a child key.
//!
//! A queued exclusive request holds back new shared requests on the same key,
//! so a steady stream of readers cannot starve a writer.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug, Default)]
struct KeyState {
    readers: usize,
    writer: bool,
    writers_waiting: usize,
}

impl KeyState {
    fn idle(&self) -> bool {
        self.readers == 0 && !self.writer && self.writers_waiting == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Shared,
    Exclusive,
}

/// Lock table keyed by path. Idle keys are dropped on release.
#[derive(Debug, Default)]
pub struct PathLocks {
    keys: Mutex<HashMap<String, KeyState>>,
    released: Condvar,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self, key: &str) -> PathGuard<'_> {
        self.acquire(key, Mode::Shared)
    }

    pub fn exclusive(&self, key: &str) -> PathGuard<'_> {
        self.acquire(key, Mode::Exclusive)
    }

    fn acquire(&self, key: &str, mode: Mode) -> PathGuard<'_> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        let mut queued = false;
        loop {
            let state = keys.entry(key.to_string()).or_default();
            let free = match mode {
                Mode::Shared => !state.writer && state.writers_waiting == 0,
                Mode::Exclusive => !state.writer && state.readers == 0,
            };
            if free {
                match mode {
                    Mode::Shared => state.readers += 1,
                    Mode::Exclusive => {
                        state.writer = true;
                        if queued {
                            state.writers_waiting -= 1;
                        }
                    }
                }
                break;
            }
            if mode == Mode::Exclusive && !queued {
                state.writers_waiting += 1;
                queued = true;
            }
            keys = self
                .released
                .wait(keys)
                .unwrap_or_else(PoisonError::into_inner);
        }
        PathGuard {
            locks: self,
            key: key.to_string(),
            mode,
        }
    }

    fn release(&self, key: &str, mode: Mode) {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = keys.get_mut(key) {
            match mode {
                Mode::Shared => state.readers = state.readers.saturating_sub(1),
                Mode::Exclusive => state.writer = false,
            }
            if state.idle() {
                keys.remove(key);
            }
        }
        drop(keys);
        self.released.notify_all();
    }

    /// Number of keys currently held.
    pub fn held(&self) -> usize {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Releases its key when dropped.
#[derive(Debug)]
pub struct PathGuard<'a> {
    locks: &'a PathLocks,
    key: String,
    mode: Mode,
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.key, self.mode);
    }
}
