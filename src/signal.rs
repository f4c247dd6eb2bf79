//! Manual-reset wait handle.
//!
//! A [`WaitHandle`] stays signaled until reset, and every clone observes the
//! same state. Devices use one as the "ready to read" gate that `unacquire`
//! waits on, and hosts may register one to be woken when new input arrives.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct Inner {
    signaled: Mutex<bool>,
    cvar: Condvar,
}

#[derive(Clone, Default)]
pub struct WaitHandle {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WaitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitHandle")
            .field("signaled", &self.is_set())
            .finish()
    }
}

impl WaitHandle {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned flag is still a valid bool; keep going with it.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.inner
            .signaled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set(&self) {
        *self.lock() = true;
        self.inner.cvar.notify_all();
    }

    pub fn reset(&self) {
        *self.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Block until signaled.
    pub fn wait(&self) {
        let mut signaled = self.lock();
        while !*signaled {
            signaled = self
                .inner
                .cvar
                .wait(signaled)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Block until signaled or `timeout` elapses. Returns whether it was signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .inner
            .cvar
            .wait_timeout_while(guard, timeout, |signaled| !*signaled)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard
    }

    /// `true` when both handles are clones of the same event.
    pub fn same_as(&self, other: &WaitHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
