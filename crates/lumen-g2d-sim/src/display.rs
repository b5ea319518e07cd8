//! Simulated display panel transport.
//!
//! Transfers copy pixels out of the shared device memory into a panel
//! byte image. The transfer itself is modelled as instantaneous and
//! latched at `wait_transfer_done`; a flag injects the no-completion
//! case for timeout tests.

use lumen_g2d_hal::{DisplayTransport, TransferWait};

use crate::device::SharedMem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimPanelError {
    /// Transfer range falls outside device memory.
    BadAddress,
    /// Transfer started while another is pending.
    TransferPending,
}

pub struct SimPanel {
    mem: SharedMem,
    partial: bool,
    panel: Vec<u8>,
    region: Option<(u16, u16, u16, u16)>,
    pending: Option<(u32, u32)>,
    force_timeout: bool,
    region_writes: u32,
    transfers: u32,
}

impl SimPanel {
    pub fn new(mem: SharedMem, partial: bool) -> Self {
        Self {
            mem,
            partial,
            panel: Vec::new(),
            region: None,
            pending: None,
            force_timeout: false,
            region_writes: 0,
            transfers: 0,
        }
    }

    /// Simulate a panel that stops signalling transfer completion.
    pub fn set_force_timeout(&mut self, force: bool) {
        self.force_timeout = force;
    }

    /// The last completed panel image.
    pub fn panel(&self) -> &[u8] {
        &self.panel
    }

    pub fn region(&self) -> Option<(u16, u16, u16, u16)> {
        self.region
    }

    pub fn region_writes(&self) -> u32 {
        self.region_writes
    }

    pub fn transfers(&self) -> u32 {
        self.transfers
    }
}

impl DisplayTransport for SimPanel {
    type Error = SimPanelError;

    fn supports_partial(&self) -> bool {
        self.partial
    }

    fn set_region(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<(), SimPanelError> {
        self.region = Some((x, y, w, h));
        self.region_writes += 1;
        Ok(())
    }

    fn transfer_frame(&mut self, addr: u32, len: u32) -> Result<(), SimPanelError> {
        if self.pending.is_some() {
            return Err(SimPanelError::TransferPending);
        }
        self.pending = Some((addr, len));
        Ok(())
    }

    fn wait_transfer_done(&mut self, _timeout_ticks: u32) -> TransferWait {
        if self.force_timeout {
            // The pending transfer is abandoned; the panel keeps its
            // previous image.
            self.pending = None;
            return TransferWait::TimedOut;
        }
        let Some((addr, len)) = self.pending.take() else {
            return TransferWait::Complete;
        };
        match self.mem.snapshot(addr, len) {
            Some(bytes) => {
                self.panel = bytes;
                self.transfers += 1;
                TransferWait::Complete
            }
            None => {
                log::warn!("panel transfer out of device memory bounds");
                TransferWait::TimedOut
            }
        }
    }
}
