//! Producer-to-display handoff slot.
//!
//! A single pending request, latest wins, paired with a saturating
//! `WakeSignal`. Deliberately not a queue: flushes that arrive faster
//! than the display task services them collapse to one pending frame.

use core::cell::Cell;

use crate::frame::RefreshRequest;

pub struct RefreshChannel {
    pending: critical_section::Mutex<Cell<Option<RefreshRequest>>>,
}

impl RefreshChannel {
    pub const fn new() -> Self {
        Self {
            pending: critical_section::Mutex::new(Cell::new(None)),
        }
    }

    /// Store `req` as the pending request. Returns true if an
    /// unserviced request was overwritten.
    pub fn post(&self, req: RefreshRequest) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).replace(Some(req)).is_some())
    }

    /// Take the pending request, if any.
    pub fn take(&self) -> Option<RefreshRequest> {
        critical_section::with(|cs| self.pending.borrow(cs).take())
    }
}

impl Default for RefreshChannel {
    fn default() -> Self {
        Self::new()
    }
}
