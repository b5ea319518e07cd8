//! Render-producer side of the display pipeline.
//!
//! `FlushProducer::flush` is the entry point the UI rendering library
//! calls once per completed frame region. It runs in the producer's
//! task context and never waits on a completion: the copy it issues is
//! fenced later by the UI library's gpu-wait callback (`gpu_wait`).

use core::fmt;

use lumen_g2d_hal::{Accelerator, WakeSignal};

use crate::engine::registers;
use crate::engine::{Engine, EngineError, Recorder};
use crate::frame::channel::RefreshChannel;
use crate::frame::{FrameBuffer, FrameError, FramePair, Rect, RefreshRequest, SyncPolicy};

/// Words requested for a buffer-sync copy recording.
const COPY_CMD_WORDS: u32 = 16;

#[derive(Debug)]
pub enum FlushError<E: fmt::Debug> {
    Frame(FrameError),
    Engine(EngineError<E>),
}

impl<E: fmt::Debug> From<FrameError> for FlushError<E> {
    fn from(e: FrameError) -> Self {
        FlushError::Frame(e)
    }
}

impl<E: fmt::Debug> From<EngineError<E>> for FlushError<E> {
    fn from(e: EngineError<E>) -> Self {
        FlushError::Engine(e)
    }
}

pub struct FlushProducer<'c, A, S, const WORDS: usize, const SLOTS: usize>
where
    A: Accelerator,
    S: WakeSignal,
{
    engine: Engine<A, WORDS, SLOTS>,
    pair: FramePair,
    policy: SyncPolicy,
    chan: &'c RefreshChannel,
    signal: &'c S,
}

impl<'c, A, S, const WORDS: usize, const SLOTS: usize> FlushProducer<'c, A, S, WORDS, SLOTS>
where
    A: Accelerator,
    S: WakeSignal,
{
    pub fn new(
        engine: Engine<A, WORDS, SLOTS>,
        pair: FramePair,
        policy: SyncPolicy,
        chan: &'c RefreshChannel,
        signal: &'c S,
    ) -> Self {
        Self {
            engine,
            pair,
            policy,
            chan,
            signal,
        }
    }

    /// Flush callback: a frame region `area` is ready in the buffer at
    /// `addr`. Non-blocking by contract.
    ///
    /// In `CopyOnFlush` mode the flushed buffer is copied into its
    /// sibling through the normal submission pipeline; the copy's
    /// completion is not waited on here. The frame is posted to the
    /// display task even when the copy could not be issued
    /// (`Exhausted`): the panel still shows the frame and the caller
    /// falls back to an unaccelerated sync. A `Fault` aborts the flush.
    pub fn flush(&mut self, area: Rect, addr: u32) -> Result<(), FlushError<A::Error>> {
        let (src, dst) = self.pair.resolve(addr)?;
        let (src, dst) = (*src, *dst);

        let copied = if self.policy == SyncPolicy::CopyOnFlush {
            debug_assert_ne!(src.addr, dst.addr);
            self.sync_copy(&src, &dst)
        } else {
            Ok(())
        };
        if matches!(copied, Err(EngineError::Fault(_))) {
            return copied.map_err(FlushError::Engine);
        }

        self.chan.post(RefreshRequest {
            area,
            addr: src.addr,
            format: src.format,
        });
        self.signal.notify();
        copied.map_err(FlushError::Engine)
    }

    fn sync_copy(
        &mut self,
        src: &FrameBuffer,
        dst: &FrameBuffer,
    ) -> Result<(), EngineError<A::Error>> {
        let mut rec = self.engine.begin(COPY_CMD_WORDS, false)?;
        record_copy(&mut rec, src, dst)?;
        rec.submit()?;
        Ok(())
    }

    /// The UI library's gpu-wait callback: block until the most recent
    /// submission (frame draws and the flush copy alike) completes.
    pub fn gpu_wait(&mut self) {
        self.engine.wait_newest();
    }

    pub fn engine(&mut self) -> &mut Engine<A, WORDS, SLOTS> {
        &mut self.engine
    }

    pub fn pair(&self) -> &FramePair {
        &self.pair
    }

    /// Drain and tear down, returning the driver.
    pub fn deinit(self) -> Result<A, EngineError<A::Error>> {
        self.engine.deinit()
    }
}

/// Record a whole-buffer copy `src` -> `dst`.
fn record_copy<A: Accelerator, const WORDS: usize, const SLOTS: usize>(
    rec: &mut Recorder<'_, A, WORDS, SLOTS>,
    src: &FrameBuffer,
    dst: &FrameBuffer,
) -> Result<(), EngineError<A::Error>> {
    rec.push(registers::SRC_ADDR, src.addr)?;
    rec.push(registers::SRC_STRIDE, src.stride)?;
    rec.push(registers::DST_ADDR, dst.addr)?;
    rec.push(registers::DST_STRIDE, dst.stride)?;
    rec.push(registers::DIMS, registers::pack_dims(src.width, src.height))?;
    rec.push(registers::PIX_FMT, src.format.code())?;
    rec.push(registers::CTRL, registers::CTRL_OP_COPY)?;
    Ok(())
}
