//! Condvar-backed wake signal.

use std::sync::{Condvar, Mutex};

use lumen_g2d_hal::WakeSignal;

/// Saturating single-pending wake: any number of notifies before the
/// consumer runs latch a single pending flag.
pub struct CondvarSignal {
    pending: Mutex<bool>,
    cv: Condvar,
}

impl CondvarSignal {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(false),
            cv: Condvar::new(),
        }
    }
}

impl Default for CondvarSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeSignal for CondvarSignal {
    fn notify(&self) {
        let mut pending = self.pending.lock().unwrap();
        *pending = true;
        self.cv.notify_one();
    }

    fn wait(&self) {
        let mut pending = self.pending.lock().unwrap();
        while !*pending {
            pending = self.cv.wait(pending).unwrap();
        }
        *pending = false;
    }
}
