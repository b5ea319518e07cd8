//! Engine context: driver, command arena, in-flight chain, power gate.
//!
//! One `Engine` per accelerator instance, owned by the task driving
//! composition and passed by reference to every operation. There is no
//! module-level state; independent display surfaces use independent
//! engines.

pub mod registers;

pub(crate) mod power;

use core::fmt;

use lumen_g2d_hal::Accelerator;

use crate::cmd::pool::{ArenaStats, CmdArena, ALLOC_FLOOR_WORDS};
use crate::cmd::tracker::InFlight;
use power::PowerGate;

/// A recording is flagged almost-full below this many remaining
/// command pairs.
pub const ALMOST_FULL_PAIRS: u32 = 20;

/// Error type for engine operations, generic over driver errors.
#[derive(Debug)]
pub enum EngineError<E: fmt::Debug> {
    /// Allocation failed even after reclaim and shrink. Non-fatal: the
    /// caller falls back to an unaccelerated path.
    Exhausted,
    /// A driver power primitive failed. Unrecoverable: the subsystem
    /// must halt rather than continue with unknown power state.
    Fault(E),
}

impl<E: fmt::Debug> From<E> for EngineError<E> {
    fn from(e: E) -> Self {
        EngineError::Fault(e)
    }
}

pub struct Engine<A: Accelerator, const WORDS: usize, const SLOTS: usize> {
    dev: A,
    arena: CmdArena<WORDS, SLOTS>,
    inflight: InFlight,
    gate: PowerGate,
}

impl<A: Accelerator, const WORDS: usize, const SLOTS: usize> Engine<A, WORDS, SLOTS> {
    pub fn new(dev: A) -> Self {
        Self {
            dev,
            arena: CmdArena::new(),
            inflight: InFlight::new(),
            gate: PowerGate::new(),
        }
    }

    /// Begin recording a command buffer of `req_words` words.
    ///
    /// Powers the engine on, then carves an extent: on failure the
    /// single oldest in-flight buffer is reclaimed and the carve
    /// retried once; a `resizable` request then retries at halved
    /// sizes down to [`ALLOC_FLOOR_WORDS`]. `Exhausted` is non-fatal —
    /// the caller must fall back to an unaccelerated path.
    pub fn begin(
        &mut self,
        req_words: u32,
        resizable: bool,
    ) -> Result<Recorder<'_, A, WORDS, SLOTS>, EngineError<A::Error>> {
        self.gate.power_on(&mut self.dev)?;
        match self.allocate(req_words, resizable) {
            Some(slot) => Ok(Recorder {
                engine: self,
                slot,
                submitted: false,
            }),
            None => {
                log::error!("command arena exhausted ({} words requested)", req_words);
                Err(EngineError::Exhausted)
            }
        }
    }

    fn allocate(&mut self, req_words: u32, resizable: bool) -> Option<u8> {
        if let Some(idx) = self.arena.carve(req_words) {
            return Some(idx);
        }
        // Reclaim the single oldest in-flight buffer and retry once.
        if self.inflight.wait_free_oldest(&mut self.dev, &mut self.arena) {
            if let Some(idx) = self.arena.carve(req_words) {
                return Some(idx);
            }
        }
        if !resizable {
            return None;
        }
        // Halve down to the floor; the first size that fits wins.
        let mut req = req_words / 2;
        while req >= ALLOC_FLOOR_WORDS {
            if let Some(idx) = self.arena.carve(req) {
                return Some(idx);
            }
            req /= 2;
        }
        None
    }

    /// Block until `seq` completes; frees every completed buffer.
    pub fn wait(&mut self, seq: u64) {
        self.inflight.wait(&mut self.dev, &mut self.arena, seq);
    }

    /// Block until the most recent submission completes, draining the
    /// in-flight chain. This is where the UI library's gpu-wait
    /// callback lands.
    pub fn wait_newest(&mut self) {
        self.inflight.wait_newest(&mut self.dev, &mut self.arena);
    }

    /// Sequence id of the most recent in-flight submission.
    pub fn newest_seq(&self) -> Option<u64> {
        self.inflight.newest_seq(&self.arena)
    }

    pub fn in_flight(&self) -> u32 {
        self.inflight.len(&self.arena)
    }

    pub fn stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    pub fn is_powered(&self) -> bool {
        self.gate.is_on()
    }

    /// Drain all in-flight work, power the engine down, and return the
    /// driver.
    pub fn deinit(mut self) -> Result<A, EngineError<A::Error>> {
        self.inflight.drain(&mut self.dev, &mut self.arena);
        self.gate.power_off_if_idle(&mut self.dev)?;
        Ok(self.dev)
    }
}

/// An in-progress command recording, exclusively borrowing its engine.
/// Dropping without submitting returns the buffer to the arena.
pub struct Recorder<'e, A: Accelerator, const WORDS: usize, const SLOTS: usize> {
    engine: &'e mut Engine<A, WORDS, SLOTS>,
    slot: u8,
    submitted: bool,
}

impl<A: Accelerator, const WORDS: usize, const SLOTS: usize> Recorder<'_, A, WORDS, SLOTS> {
    /// Append one (register, value) command pair.
    pub fn push(&mut self, reg: u32, value: u32) -> Result<(), EngineError<A::Error>> {
        if self.engine.arena.append(self.slot, reg, value) {
            Ok(())
        } else {
            Err(EngineError::Exhausted)
        }
    }

    /// Command pairs that still fit.
    pub fn remaining(&self) -> u32 {
        let slot = self.engine.arena.slot(self.slot);
        (slot.capacity - slot.len) / 2
    }

    pub fn is_almost_full(&self) -> bool {
        self.remaining() < ALMOST_FULL_PAIRS
    }

    /// Granted extent size in words (may be less than requested for a
    /// resizable allocation).
    pub fn capacity_words(&self) -> u32 {
        self.engine.arena.slot(self.slot).capacity
    }

    /// Submit the recording. Returns its sequence id.
    pub fn submit(mut self) -> Result<u64, EngineError<A::Error>> {
        self.submit_inner(false)
    }

    /// Submit and synchronously wait for completion. For commands whose
    /// source memory the caller reuses immediately after this call: the
    /// hardware must have consumed the source before it is invalidated.
    pub fn submit_sync(mut self) -> Result<u64, EngineError<A::Error>> {
        self.submit_inner(true)
    }

    fn submit_inner(&mut self, sync: bool) -> Result<u64, EngineError<A::Error>> {
        let Engine {
            dev,
            arena,
            inflight,
            gate,
        } = &mut *self.engine;

        if arena.slot(self.slot).len == 0 {
            // Nothing recorded; nothing to hand to the hardware.
            arena.abort(self.slot);
            self.submitted = true;
            return Ok(0);
        }

        let seq = dev.submit(arena.recorded(self.slot))?;
        arena.mark_in_flight(self.slot, seq);
        inflight.push(arena, self.slot);
        self.submitted = true;

        if sync {
            inflight.wait(dev, arena, seq);
            gate.power_off_if_idle(dev)?;
            return Ok(seq);
        }

        gate.power_off_if_idle(dev)?;

        // Backpressure: never let the hardware ring grow past capacity.
        if dev.is_ring_full() {
            inflight.wait(dev, arena, seq);
        }
        Ok(seq)
    }
}

impl<A: Accelerator, const WORDS: usize, const SLOTS: usize> Drop
    for Recorder<'_, A, WORDS, SLOTS>
{
    fn drop(&mut self) {
        if !self.submitted {
            self.engine.arena.abort(self.slot);
        }
    }
}

impl<A: Accelerator, const WORDS: usize, const SLOTS: usize> fmt::Debug
    for Recorder<'_, A, WORDS, SLOTS>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("slot", &self.slot)
            .field("capacity_words", &self.capacity_words())
            .field("remaining", &self.remaining())
            .finish()
    }
}
