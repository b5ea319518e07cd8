//! Shared mock trait implementations for the integration tests.
//!
//! The mocks capture calls in `Rc<RefCell<..>>`/`Rc<Cell<..>>` handles
//! so tests can inspect driver traffic after exercising the engine.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lumen_g2d_hal::{Accelerator, DisplayTransport, TransferWait, WakeSignal};

#[derive(Debug)]
pub struct MockError(pub &'static str);

/// Inspection handles shared with a `MockAccel`.
#[derive(Clone, Default)]
pub struct AccelState {
    /// Every submitted command stream, in order.
    pub submissions: Rc<RefCell<Vec<Vec<u32>>>>,
    /// Highest completed sequence id.
    pub completed: Rc<Cell<u64>>,
    pub busy: Rc<Cell<bool>>,
    pub ring_full: Rc<Cell<bool>>,
    pub power_on_calls: Rc<Cell<u32>>,
    pub power_off_calls: Rc<Cell<u32>>,
    /// Sequence ids passed to `wait_seq`, in order.
    pub wait_calls: Rc<RefCell<Vec<u64>>>,
    pub fail_power_on: Rc<Cell<bool>>,
    pub fail_power_off: Rc<Cell<bool>>,
}

/// Mock accelerator driver. By default `wait_seq` marks the awaited id
/// complete and drains the ring flag — the "hardware finishes while we
/// block" behavior the tracker relies on.
pub struct MockAccel {
    pub state: AccelState,
    next_seq: Cell<u64>,
    pub complete_on_wait: bool,
}

impl MockAccel {
    pub fn new() -> (Self, AccelState) {
        let state = AccelState::default();
        (
            Self {
                state: state.clone(),
                next_seq: Cell::new(0),
                complete_on_wait: true,
            },
            state,
        )
    }
}

impl Accelerator for MockAccel {
    type Error = MockError;

    fn power_on(&mut self) -> Result<(), MockError> {
        if self.state.fail_power_on.get() {
            return Err(MockError("power_on refused"));
        }
        self.state.power_on_calls.set(self.state.power_on_calls.get() + 1);
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), MockError> {
        if self.state.fail_power_off.get() {
            return Err(MockError("power_off refused"));
        }
        self.state.power_off_calls.set(self.state.power_off_calls.get() + 1);
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.state.busy.get()
    }

    fn submit(&mut self, words: &[u32]) -> Result<u64, MockError> {
        self.state.submissions.borrow_mut().push(words.to_vec());
        let seq = self.next_seq.get() + 1;
        self.next_seq.set(seq);
        Ok(seq)
    }

    fn completed_seq(&self) -> u64 {
        self.state.completed.get()
    }

    fn is_ring_full(&self) -> bool {
        self.state.ring_full.get()
    }

    fn wait_seq(&mut self, seq: u64) {
        self.state.wait_calls.borrow_mut().push(seq);
        if self.complete_on_wait {
            if self.state.completed.get() < seq {
                self.state.completed.set(seq);
            }
            self.state.ring_full.set(false);
        }
    }
}

/// Inspection handles shared with a `MockDisplay`.
#[derive(Clone, Default)]
pub struct DisplayState {
    pub set_region_calls: Rc<RefCell<Vec<(u16, u16, u16, u16)>>>,
    /// (addr, len) of each started transfer.
    pub transfers: Rc<RefCell<Vec<(u32, u32)>>>,
    pub fail_transfer: Rc<Cell<bool>>,
    pub time_out: Rc<Cell<bool>>,
}

pub struct MockDisplay {
    pub state: DisplayState,
    pub partial: bool,
}

impl MockDisplay {
    pub fn new(partial: bool) -> (Self, DisplayState) {
        let state = DisplayState::default();
        (
            Self {
                state: state.clone(),
                partial,
            },
            state,
        )
    }
}

impl DisplayTransport for MockDisplay {
    type Error = MockError;

    fn supports_partial(&self) -> bool {
        self.partial
    }

    fn set_region(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<(), MockError> {
        self.state.set_region_calls.borrow_mut().push((x, y, w, h));
        Ok(())
    }

    fn transfer_frame(&mut self, addr: u32, len: u32) -> Result<(), MockError> {
        if self.state.fail_transfer.get() {
            return Err(MockError("transfer refused"));
        }
        self.state.transfers.borrow_mut().push((addr, len));
        Ok(())
    }

    fn wait_transfer_done(&mut self, _timeout_ticks: u32) -> TransferWait {
        if self.state.time_out.get() {
            TransferWait::TimedOut
        } else {
            TransferWait::Complete
        }
    }
}

/// Single-threaded wake signal that panics if a wait would block,
/// so tests always post before servicing.
#[derive(Default)]
pub struct TestSignal {
    pub pending: Cell<bool>,
    pub notifies: Cell<u32>,
    pub waits: Cell<u32>,
}

impl WakeSignal for TestSignal {
    fn notify(&self) {
        self.pending.set(true);
        self.notifies.set(self.notifies.get() + 1);
    }

    fn wait(&self) {
        assert!(self.pending.get(), "wait would block: no pending wake");
        self.pending.set(false);
        self.waits.set(self.waits.get() + 1);
    }
}

/// Find the value written to `reg` in a recorded command stream.
pub fn reg_value(words: &[u32], reg: u32) -> Option<u32> {
    words
        .chunks_exact(2)
        .rev()
        .find(|pair| pair[0] == reg)
        .map(|pair| pair[1])
}
