//! Display refresh task: the blocking consumer of completed frames.
//!
//! Runs at the highest priority among drawing tasks and owns the
//! display transport exclusively. Transport failures are logged and the
//! loop continues; a stale panel is preferable to a dead one.

use lumen_g2d_hal::{DisplayTransport, TransferWait, WakeSignal};

use crate::frame::channel::RefreshChannel;
use crate::frame::{Rect, RefreshRequest};

pub struct RefreshConfig {
    /// Bounded wait for a transfer-done signal, in transport ticks.
    pub transfer_timeout_ticks: u32,
    /// Frames between stat log lines; 0 disables.
    pub stat_interval: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            transfer_timeout_ticks: 1000,
            stat_interval: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Transferred,
    /// No completion signal within the timeout; the buffer was still
    /// released to the producer.
    TimedOut,
    /// The transport rejected the transfer; the buffer was released.
    Failed,
}

pub struct RefreshTask<'c, D, S, F>
where
    D: DisplayTransport,
    S: WakeSignal,
    F: FnMut(),
{
    disp: D,
    chan: &'c RefreshChannel,
    signal: &'c S,
    /// The UI library's flush-ready callback: releases the frame
    /// buffer back to the producer.
    flush_ready: F,
    cfg: RefreshConfig,
    last_region: Option<Rect>,
    frames: u32,
    timeouts: u32,
}

impl<'c, D, S, F> RefreshTask<'c, D, S, F>
where
    D: DisplayTransport,
    S: WakeSignal,
    F: FnMut(),
{
    pub fn new(
        disp: D,
        chan: &'c RefreshChannel,
        signal: &'c S,
        cfg: RefreshConfig,
        flush_ready: F,
    ) -> Self {
        Self {
            disp,
            chan,
            signal,
            flush_ready,
            cfg,
            last_region: None,
            frames: 0,
            timeouts: 0,
        }
    }

    /// Block for one wake and service the pending frame, if any.
    /// `None` means a spurious wake (the request it announced was
    /// already serviced on an earlier wake).
    pub fn service(&mut self) -> Option<RefreshOutcome> {
        self.signal.wait();
        let req = self.chan.take()?;
        Some(self.transfer(req))
    }

    /// Task entry point. Started once at subsystem bring-up.
    pub fn run(&mut self) -> ! {
        log::info!("display refresh task started");
        loop {
            let _ = self.service();
        }
    }

    fn transfer(&mut self, req: RefreshRequest) -> RefreshOutcome {
        // Reprogram the output window only when the region changed.
        if self.disp.supports_partial() && self.last_region != Some(req.area) {
            match self.disp.set_region(req.area.x, req.area.y, req.area.w, req.area.h) {
                Ok(()) => self.last_region = Some(req.area),
                Err(e) => log::warn!("display set_region failed: {:?}", e),
            }
        }

        let len = req.area.w as u32 * req.area.h as u32 * req.format.bytes_per_px();
        let outcome = match self.disp.transfer_frame(req.addr, len) {
            Ok(()) => match self.disp.wait_transfer_done(self.cfg.transfer_timeout_ticks) {
                TransferWait::Complete => RefreshOutcome::Transferred,
                TransferWait::TimedOut => {
                    self.timeouts += 1;
                    log::warn!("display transfer timeout, panel may show a stale frame");
                    RefreshOutcome::TimedOut
                }
            },
            Err(e) => {
                log::warn!("display transfer failed: {:?}", e);
                RefreshOutcome::Failed
            }
        };

        // Release the frame buffer to the producer even on failure;
        // holding it would stall composition permanently.
        (self.flush_ready)();

        self.frames += 1;
        if self.cfg.stat_interval != 0 && self.frames % self.cfg.stat_interval == 0 {
            log::info!(
                "display task: frames={}, timeouts={}",
                self.frames,
                self.timeouts
            );
        }
        outcome
    }

    pub fn display(&self) -> &D {
        &self.disp
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn timeouts(&self) -> u32 {
        self.timeouts
    }
}
