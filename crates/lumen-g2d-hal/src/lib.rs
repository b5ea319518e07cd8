#![no_std]

/// Driver for the 2D accelerator engine.
///
/// Submissions are whole command buffers: flat sequences of
/// (register offset, value) word pairs. The driver assigns a
/// monotonically increasing sequence id per submission, starting at 1,
/// and the engine completes buffers strictly in submission order, so
/// `completed_seq() >= s` proves completion of every id up to `s`.
pub trait Accelerator {
    type Error: core::fmt::Debug;

    /// Enable power to the engine. Callers gate this so it only runs on
    /// the off-to-on edge; a failure is a contract violation and the
    /// subsystem must not continue.
    fn power_on(&mut self) -> Result<(), Self::Error>;

    /// Remove power from the engine. MUST only be called while
    /// `is_busy()` is false.
    fn power_off(&mut self) -> Result<(), Self::Error>;

    /// Returns true while any submitted buffer has not yet completed.
    fn is_busy(&self) -> bool;

    /// Queue one recorded command buffer. Returns its sequence id.
    fn submit(&mut self, words: &[u32]) -> Result<u64, Self::Error>;

    /// Highest completed sequence id, 0 if nothing has completed yet.
    fn completed_seq(&self) -> u64;

    /// Returns true if the fixed-depth hardware submission ring is full.
    fn is_ring_full(&self) -> bool;

    /// Block until `completed_seq() >= seq`.
    ///
    /// The default implementation polls. Interrupt-driven drivers
    /// override this to sleep on a completion event; both satisfy the
    /// same contract.
    fn wait_seq(&mut self, seq: u64) {
        while self.completed_seq() < seq {
            core::hint::spin_loop();
        }
    }
}

/// Result of a bounded wait for a display transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferWait {
    /// The transport signalled completion within the timeout.
    Complete,
    /// No completion signal within the timeout. The panel may show a
    /// stale frame; the frame buffer is still released to the producer.
    TimedOut,
}

/// Transport driving pixel data to the physical display panel.
///
/// Owned exclusively by the display refresh task; transfers are
/// strictly sequential.
pub trait DisplayTransport {
    type Error: core::fmt::Debug;

    /// True if the panel accepts a sub-frame output window.
    fn supports_partial(&self) -> bool;

    /// Program the panel output window for subsequent transfers.
    fn set_region(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<(), Self::Error>;

    /// Start an asynchronous transfer of `len` bytes of pixel data
    /// from device memory at `addr`.
    fn transfer_frame(&mut self, addr: u32, len: u32) -> Result<(), Self::Error>;

    /// Block until the transfer started by `transfer_frame` completes,
    /// for at most `timeout_ticks`.
    fn wait_transfer_done(&mut self, timeout_ticks: u32) -> TransferWait;
}

/// Saturating single-pending wake signal between a non-blocking
/// producer and a blocking consumer task.
///
/// This is not a queue: any number of `notify` calls before the
/// consumer runs collapse into a single pending wake.
pub trait WakeSignal {
    /// Mark the signal pending and wake the waiting task, if any.
    /// Non-blocking; callable from any context.
    fn notify(&self);

    /// Block until the signal is pending, then clear it.
    fn wait(&self);
}
